use fp_codegen_core::ir::{Constant, ValueId, ValueKind};
use fp_codegen_core::mir::{MachineOpcode, MachineType, OperandId};
use fp_codegen_core::{ensure_invariant, invariant, unsupported, Result};
use tracing::trace;

use crate::context::LoweringContext;
use crate::ty::lower_type;

impl LoweringContext<'_> {
    /// Operand for an IR value, memoized per function.
    pub fn resolve(&mut self, value: ValueId) -> Result<OperandId> {
        if let Some(existing) = self.lookup_value(value) {
            return Ok(existing);
        }
        let module = self.module;
        let data = module.value(value);
        let operand = match &data.kind {
            ValueKind::Instruction(inst) => invariant!(
                "{value} ({inst}) used before it was lowered in {}",
                self.func().name
            ),
            ValueKind::Argument { func, index } => {
                ensure_invariant!(
                    Some(*func) == self.current_ir_function,
                    "argument {value} of {func} used in {}",
                    self.func().name
                );
                self.func().arg(*index as usize).unwrap_or_else(|| {
                    invariant!("{} has no argument {index}", self.func().name)
                })
            }
            ValueKind::Constant(constant) => self.lower_constant(value, constant)?,
            ValueKind::Function(func) => {
                let name = self.config.symbol_name(&module.function(*func).name)?;
                self.func_mut().symbol(name, MachineType::Ptr)?
            }
            ValueKind::Global(global) => {
                let name = module.global(*global).name.clone();
                self.func_mut().symbol(name, MachineType::Ptr)?
            }
            ValueKind::Block(block) => {
                let block = self.block_for(*block)?;
                self.func_mut().block_ref(block)?
            }
        };
        trace!(%value, %operand, "resolved operand");
        self.record_value(value, operand);
        Ok(operand)
    }

    fn lower_constant(&mut self, value: ValueId, constant: &Constant) -> Result<OperandId> {
        let ty = lower_type(self.module.value_ty(value))?;
        match constant {
            Constant::Int(v) => self.imm(*v, ty),
            Constant::Null | Constant::Zero | Constant::Undef => self.imm(0, ty),
            Constant::Float(_) => unsupported!("floating-point constant {value}"),
            Constant::Bytes(_) | Constant::Aggregate(_) => {
                unsupported!("aggregate constant {value} used as an instruction operand")
            }
        }
    }

    /// Operand carrying the value itself: frame slots and symbols are
    /// replaced by their address in a fresh virtual register.
    pub(crate) fn value_operand(&mut self, value: ValueId) -> Result<OperandId> {
        let operand = self.resolve(value)?;
        if self.operand(operand).needs_address() {
            return self.address_of(operand);
        }
        Ok(operand)
    }

    fn address_of(&mut self, operand: OperandId) -> Result<OperandId> {
        let dst = self.new_vreg(MachineType::Ptr)?;
        self.emit(MachineOpcode::Lea, vec![dst, operand])?;
        Ok(dst)
    }

    /// Copy `src` into `dst`, forming an address where `src` names memory.
    pub(crate) fn materialize(&mut self, dst: OperandId, src: OperandId) -> Result<()> {
        let opcode = if self.operand(src).needs_address() {
            MachineOpcode::Lea
        } else {
            MachineOpcode::Mov
        };
        self.emit(opcode, vec![dst, src])
    }

    /// `operand` itself when it is a register, otherwise a copy in a fresh
    /// virtual register.
    pub(crate) fn into_register(&mut self, operand: OperandId) -> Result<OperandId> {
        if self.operand(operand).is_register() {
            return Ok(operand);
        }
        self.copy_to_vreg(operand)
    }

    pub(crate) fn copy_to_vreg(&mut self, operand: OperandId) -> Result<OperandId> {
        let ty = if self.operand(operand).needs_address() {
            MachineType::Ptr
        } else {
            self.ty_of(operand)
        };
        let dst = self.new_vreg(ty)?;
        self.materialize(dst, operand)?;
        Ok(dst)
    }

    /// Source operand an ALU instruction can encode: immediates beyond the
    /// sign-extended 32-bit field go through a register.
    pub(crate) fn alu_source(&mut self, operand: OperandId) -> Result<OperandId> {
        let op = self.operand(operand);
        if op.is_imm() && !op.is_imm32() {
            return self.copy_to_vreg(operand);
        }
        Ok(operand)
    }
}
