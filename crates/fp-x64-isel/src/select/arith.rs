use fp_codegen_core::ir::{CmpPredicate, InstData, Opcode};
use fp_codegen_core::mir::{CondCode, HwReg, MachineOpcode, MachineType, OperandId, OperandKind};
use fp_codegen_core::{invariant, Result};

use super::{binary_operands, Lowered};
use crate::context::LoweringContext;
use crate::ty::scalar_type;

impl LoweringContext<'_> {
    /// `mov dst, lhs` then `op dst, rhs`.
    pub(super) fn lower_binary(&mut self, inst: &InstData) -> Lowered {
        let ty = scalar_type(&inst.ty, "arithmetic")?;
        let (lhs, rhs) = binary_operands(inst);
        let lhs = self.resolve(lhs)?;
        let rhs = self.value_operand(rhs)?;

        let dst = self.new_vreg(ty)?;
        self.materialize(dst, lhs)?;

        let opcode = match inst.opcode {
            Opcode::Add => MachineOpcode::Add,
            Opcode::Sub => MachineOpcode::Sub,
            Opcode::Mul => MachineOpcode::Imul,
            Opcode::And => MachineOpcode::And,
            Opcode::Or => MachineOpcode::Or,
            Opcode::Xor => MachineOpcode::Xor,
            other => invariant!("{other:?} is not a plain binary operation"),
        };
        let rhs = if opcode == MachineOpcode::Imul {
            let op = self.operand(rhs);
            if op.is_register() || op.is_memory() {
                rhs
            } else {
                self.copy_to_vreg(rhs)?
            }
        } else {
            self.alu_source(rhs)?
        };
        self.emit(opcode, vec![dst, rhs])?;
        Ok(Some(dst))
    }

    /// Division and remainder through the fixed `rdx:rax` pair.
    ///
    /// 8-bit operands are widened to 32 bits so the quotient and remainder
    /// land in whole registers.
    pub(super) fn lower_division(&mut self, inst: &InstData) -> Lowered {
        let ty = scalar_type(&inst.ty, "division")?;
        let (lhs_value, rhs_value) = binary_operands(inst);
        let signed = self.module.value_ty(lhs_value).is_signed();
        let work_ty = if ty == MachineType::I8 {
            MachineType::I32
        } else {
            ty
        };

        let mut lhs = self.value_operand(lhs_value)?;
        let mut rhs = self.value_operand(rhs_value)?;
        if work_ty != ty {
            lhs = self.widen(lhs, work_ty, signed)?;
            rhs = self.widen(rhs, work_ty, signed)?;
        }
        // The divisor must survive the rdx/rax setup and cannot be an immediate.
        if !matches!(
            self.operand(rhs).kind,
            OperandKind::VReg(_) | OperandKind::Mem(_)
        ) {
            rhs = self.copy_to_vreg(rhs)?;
        }

        let want_remainder = inst.opcode == Opcode::Rem;
        let quotient = self.with_clobbered(&[HwReg::Rax, HwReg::Rdx], |ctx| {
            let low = ctx.hw(HwReg::Rax, work_ty)?;
            let high = ctx.hw(HwReg::Rdx, work_ty)?;
            ctx.emit(MachineOpcode::Mov, vec![low, lhs])?;
            if signed {
                ctx.emit(sign_extension(work_ty), vec![])?;
                ctx.emit(MachineOpcode::Idiv, vec![rhs])?;
            } else {
                ctx.emit(MachineOpcode::Xor, vec![high, high])?;
                ctx.emit(MachineOpcode::Div, vec![rhs])?;
            }
            let result = ctx.new_vreg(work_ty)?;
            let source = if want_remainder { high } else { low };
            ctx.emit(MachineOpcode::Mov, vec![result, source])?;
            Ok(result)
        })?;

        if work_ty == ty {
            return Ok(Some(quotient));
        }
        let narrow = self.new_vreg(ty)?;
        self.emit(MachineOpcode::Mov, vec![narrow, quotient])?;
        Ok(Some(narrow))
    }

    /// Zero- or sign-extend `operand` to `ty`.
    fn widen(&mut self, operand: OperandId, ty: MachineType, signed: bool) -> Result<OperandId> {
        let from = self.ty_of(operand);
        if let Some(value) = self.operand(operand).as_imm() {
            let value = if signed {
                value
            } else {
                value & low_mask(from)
            };
            return self.imm(value, ty);
        }
        let dst = self.new_vreg(ty)?;
        let opcode = if signed {
            MachineOpcode::Movsx
        } else {
            MachineOpcode::Movzx
        };
        self.emit(opcode, vec![dst, operand])?;
        Ok(dst)
    }

    /// Shifts; a variable amount has to sit in `cl`.
    pub(super) fn lower_shift(&mut self, inst: &InstData) -> Lowered {
        let ty = scalar_type(&inst.ty, "shift")?;
        let (lhs, amount) = binary_operands(inst);
        let signed = self.module.value_ty(lhs).is_signed();
        let opcode = match (inst.opcode, signed) {
            (Opcode::Shl, _) => MachineOpcode::Shl,
            (Opcode::Shr, true) => MachineOpcode::Sar,
            (Opcode::Shr, false) => MachineOpcode::Shr,
            (other, _) => invariant!("{other:?} is not a shift"),
        };

        let lhs = self.resolve(lhs)?;
        let dst = self.new_vreg(ty)?;
        self.materialize(dst, lhs)?;

        let amount = self.value_operand(amount)?;
        if let Some(count) = self.operand(amount).as_imm() {
            let count = self.imm(count, MachineType::I8)?;
            self.emit(opcode, vec![dst, count])?;
            return Ok(Some(dst));
        }

        let amount_ty = self.ty_of(amount);
        self.with_clobbered(&[HwReg::Rcx], |ctx| {
            let rcx = ctx.hw(HwReg::Rcx, amount_ty)?;
            ctx.emit(MachineOpcode::Mov, vec![rcx, amount])?;
            let cl = ctx.hw(HwReg::Rcx, MachineType::I8)?;
            ctx.emit(opcode, vec![dst, cl])
        })?;
        Ok(Some(dst))
    }

    /// `cmp` then `setcc` into a byte register.
    pub(super) fn lower_compare(&mut self, inst: &InstData, predicate: CmpPredicate) -> Lowered {
        let (lhs_value, rhs_value) = binary_operands(inst);
        let operand_ty = self.module.value_ty(lhs_value);
        scalar_type(operand_ty, "comparison")?;
        let mut cond = condition_code(predicate, operand_ty.is_signed());

        let mut lhs = self.value_operand(lhs_value)?;
        let mut rhs = self.value_operand(rhs_value)?;
        match (self.operand(lhs).is_imm(), self.operand(rhs).is_imm()) {
            (true, false) => {
                std::mem::swap(&mut lhs, &mut rhs);
                cond = cond.mirror();
            }
            (true, true) => lhs = self.copy_to_vreg(lhs)?,
            _ => {}
        }
        if self.operand(lhs).is_memory() && self.operand(rhs).is_memory() {
            rhs = self.copy_to_vreg(rhs)?;
        }
        let rhs = self.alu_source(rhs)?;
        self.emit(MachineOpcode::Cmp, vec![lhs, rhs])?;

        let dst = self.new_vreg(MachineType::I8)?;
        self.emit(MachineOpcode::Setcc(cond), vec![dst])?;
        Ok(Some(dst))
    }
}

pub(crate) fn condition_code(predicate: CmpPredicate, signed: bool) -> CondCode {
    match (predicate, signed) {
        (CmpPredicate::Eq, _) => CondCode::E,
        (CmpPredicate::Ne, _) => CondCode::Ne,
        (CmpPredicate::Lt, true) => CondCode::L,
        (CmpPredicate::Le, true) => CondCode::Le,
        (CmpPredicate::Gt, true) => CondCode::G,
        (CmpPredicate::Ge, true) => CondCode::Ge,
        (CmpPredicate::Lt, false) => CondCode::B,
        (CmpPredicate::Le, false) => CondCode::Be,
        (CmpPredicate::Gt, false) => CondCode::A,
        (CmpPredicate::Ge, false) => CondCode::Ae,
    }
}

fn sign_extension(ty: MachineType) -> MachineOpcode {
    match ty {
        MachineType::I16 => MachineOpcode::Cwd,
        MachineType::I32 => MachineOpcode::Cdq,
        MachineType::I64 | MachineType::Ptr => MachineOpcode::Cqo,
        other => invariant!("no sign extension into rdx for {other}"),
    }
}

fn low_mask(ty: MachineType) -> i64 {
    match ty.bits() {
        bits @ 1..=63 => (1i64 << bits) - 1,
        _ => -1,
    }
}
