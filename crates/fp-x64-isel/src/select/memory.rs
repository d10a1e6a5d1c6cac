use fp_codegen_core::ir::{InstData, Ty, ValueId};
use fp_codegen_core::mir::{MachineOpcode, MachineType, MemRef, OperandId};
use fp_codegen_core::{ensure_invariant, invariant, Result};

use super::{binary_operands, unary_operand, Lowered};
use crate::context::LoweringContext;
use crate::ty::by_value_type;

impl LoweringContext<'_> {
    /// A frame slot; no instruction is emitted, uses take its address.
    pub(super) fn lower_alloca(&mut self, inst: &InstData) -> Lowered {
        let module = self.module;
        let allocated = inst
            .ty
            .pointee()
            .unwrap_or_else(|| invariant!("alloca {} does not produce a pointer", inst.value));
        let count = match inst.operands.as_slice() {
            [] => 1,
            [count] => module.constant_int(*count).unwrap_or_else(|| {
                invariant!("alloca {} has a non-constant element count", inst.value)
            }),
            _ => invariant!("alloca {} takes at most one operand", inst.value),
        };
        ensure_invariant!(count >= 0, "alloca {} of {count} elements", inst.value);

        let mut element = allocated;
        let mut length = 1u64;
        while let Ty::Array(inner, len) = element {
            length = length.saturating_mul(*len);
            element = inner.as_ref();
        }
        let size = element
            .size_of()
            .saturating_mul(length)
            .saturating_mul(count as u64);
        let slot = self.func_mut().stack_object(size, element.align_of())?;
        Ok(Some(slot))
    }

    pub(super) fn lower_load(&mut self, inst: &InstData) -> Lowered {
        let ty = by_value_type(&inst.ty, "load")?;
        let address = self.address_register(unary_operand(inst))?;
        let memory = self.memory_at(address, ty)?;
        let dst = self.new_vreg(ty)?;
        self.emit(MachineOpcode::Mov, vec![dst, memory])?;
        Ok(Some(dst))
    }

    pub(super) fn lower_store(&mut self, inst: &InstData) -> Lowered {
        let (value, ptr) = binary_operands(inst);
        let ty = by_value_type(self.module.value_ty(value), "store")?;
        let value = self.value_operand(value)?;
        let value = self.alu_source(value)?;
        let address = self.address_register(ptr)?;
        let memory = self.memory_at(address, ty)?;
        self.emit(MachineOpcode::Mov, vec![memory, value])?;
        Ok(None)
    }

    /// Pointer value in a register usable as a memory base.
    pub(crate) fn address_register(&mut self, ptr: ValueId) -> Result<OperandId> {
        let address = self.value_operand(ptr)?;
        self.into_register(address)
    }

    fn memory_at(&mut self, base: OperandId, ty: MachineType) -> Result<OperandId> {
        let base = self.reg_of(base);
        self.func_mut().mem(MemRef::base(base), ty)
    }
}

