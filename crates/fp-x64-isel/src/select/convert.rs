use fp_codegen_core::ir::{InstData, Opcode};
use fp_codegen_core::mir::{MachineOpcode, MachineType};
use fp_codegen_core::{ensure_invariant, invariant};

use super::{unary_operand, Lowered};
use crate::context::LoweringContext;
use crate::ty::scalar_type;

impl LoweringContext<'_> {
    pub(super) fn lower_trunc(&mut self, inst: &InstData) -> Lowered {
        let to = scalar_type(&inst.ty, "truncation")?;
        let source = self.value_operand(unary_operand(inst))?;
        let from = self.ty_of(source);
        ensure_invariant!(
            to.bits() < from.bits(),
            "trunc {} from {from} to {to} does not narrow",
            inst.value
        );

        let source = match self.operand(source).as_imm() {
            Some(value) => self.imm(wrap_to(value, to), to)?,
            None => source,
        };
        let dst = self.new_vreg(to)?;
        self.emit(MachineOpcode::Mov, vec![dst, source])?;
        Ok(Some(dst))
    }

    pub(super) fn lower_extend(&mut self, inst: &InstData) -> Lowered {
        let to = scalar_type(&inst.ty, "extension")?;
        let source = self.value_operand(unary_operand(inst))?;
        let from = self.ty_of(source);
        ensure_invariant!(
            to.bits() > from.bits(),
            "{:?} {} from {from} to {to} does not widen",
            inst.opcode,
            inst.value
        );
        let opcode = match inst.opcode {
            Opcode::ZExt => MachineOpcode::Movzx,
            Opcode::SExt => MachineOpcode::Movsx,
            other => invariant!("{other:?} is not an extension"),
        };

        let source = if self.operand(source).is_imm() {
            self.copy_to_vreg(source)?
        } else {
            source
        };
        let dst = self.new_vreg(to)?;
        self.emit(opcode, vec![dst, source])?;
        Ok(Some(dst))
    }

    /// `ptrtoint`, `inttoptr` and `bitcast` only change how bits are viewed.
    pub(super) fn lower_reinterpret(&mut self, inst: &InstData) -> Lowered {
        scalar_type(&inst.ty, "reinterpretation")?;
        let source = self.resolve(unary_operand(inst))?;
        Ok(Some(self.into_register(source)?))
    }
}

/// `value` reduced to the two's-complement range of `ty`.
fn wrap_to(value: i64, ty: MachineType) -> i64 {
    match ty {
        MachineType::I8 => value as i8 as i64,
        MachineType::I16 => value as i16 as i64,
        MachineType::I32 => value as i32 as i64,
        _ => value,
    }
}
