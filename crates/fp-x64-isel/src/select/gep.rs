use fp_codegen_core::ir::{InstData, Ty, ValueId};
use fp_codegen_core::mir::{MachineOpcode, MachineType, MemRef, OperandId};
use fp_codegen_core::{ensure_invariant, invariant, Result};

use super::Lowered;
use crate::context::LoweringContext;

/// Address under construction: a base register plus a folded displacement.
#[derive(Debug, Clone, Copy)]
struct Address {
    base: OperandId,
    disp: i32,
}

impl LoweringContext<'_> {
    /// Walks the index list, folding constant steps into one displacement.
    ///
    /// The first index steps over the base pointer itself (scaled by the
    /// pointee size); each later index steps into the current aggregate.
    pub(super) fn lower_gep(&mut self, inst: &InstData) -> Lowered {
        let module = self.module;
        let Some((&base, indices)) = inst.operands.split_first() else {
            invariant!("gep {} has no base pointer", inst.value);
        };

        let mut address = Address {
            base: self.address_register(base)?,
            disp: 0,
        };
        let mut current = module.value_ty(base);
        for &index in indices {
            current = match current {
                Ty::Struct(s) => {
                    let field = module.constant_int(index).unwrap_or_else(|| {
                        invariant!("gep {} indexes a struct with a non-constant", inst.value)
                    });
                    let field = usize::try_from(field)
                        .ok()
                        .filter(|field| *field < s.fields.len())
                        .unwrap_or_else(|| {
                            invariant!("gep {} field {field} out of range", inst.value)
                        });
                    let offset = s.member_offsets()[field];
                    address = self.add_offset(address, offset as i64)?;
                    &s.fields[field]
                }
                Ty::Ptr(element) | Ty::Array(element, _) => {
                    let size = element.size_of();
                    address = match module.constant_int(index) {
                        Some(step) => {
                            let offset = step.checked_mul(size as i64).unwrap_or_else(|| {
                                invariant!("gep {} offset overflows", inst.value)
                            });
                            self.add_offset(address, offset)?
                        }
                        None => self.add_scaled_index(address, index, size)?,
                    };
                    element.as_ref()
                }
                other => invariant!("gep {} steps into non-aggregate {other:?}", inst.value),
            };
        }

        let dst = self.new_vreg(MachineType::Ptr)?;
        let memory = self.memory_operand(address, None)?;
        self.emit(MachineOpcode::Lea, vec![dst, memory])?;
        Ok(Some(dst))
    }

    /// Fold `offset` into the displacement, materializing the address when
    /// the sum leaves the signed 32-bit range.
    fn add_offset(&mut self, address: Address, offset: i64) -> Result<Address> {
        let total = i64::from(address.disp) + offset;
        if let Ok(disp) = i32::try_from(total) {
            return Ok(Address { disp, ..address });
        }
        let flushed = self.flush(address)?;
        if let Ok(disp) = i32::try_from(offset) {
            return Ok(Address { base: flushed, disp });
        }
        let amount = self.imm(offset, MachineType::I64)?;
        let amount = self.copy_to_vreg(amount)?;
        let dst = self.new_vreg(MachineType::Ptr)?;
        let memory = self.memory_operand(
            Address {
                base: flushed,
                disp: 0,
            },
            Some((amount, 1)),
        )?;
        self.emit(MachineOpcode::Lea, vec![dst, memory])?;
        Ok(Address { base: dst, disp: 0 })
    }

    fn add_scaled_index(&mut self, address: Address, index: ValueId, size: u64) -> Result<Address> {
        let index = self.index_register(index)?;
        if let Ok(scale @ (1 | 2 | 4 | 8)) = u8::try_from(size) {
            let dst = self.new_vreg(MachineType::Ptr)?;
            let memory = self.memory_operand(address, Some((index, scale)))?;
            self.emit(MachineOpcode::Lea, vec![dst, memory])?;
            return Ok(Address { base: dst, disp: 0 });
        }

        let scaled = self.new_vreg(MachineType::I64)?;
        self.emit(MachineOpcode::Mov, vec![scaled, index])?;
        let factor = self.imm(size as i64, MachineType::I64)?;
        let factor = self.copy_to_vreg(factor)?;
        self.emit(MachineOpcode::Imul, vec![scaled, factor])?;
        let sum = self.new_vreg(MachineType::Ptr)?;
        self.emit(MachineOpcode::Mov, vec![sum, address.base])?;
        self.emit(MachineOpcode::Add, vec![sum, scaled])?;
        Ok(Address {
            base: sum,
            disp: address.disp,
        })
    }

    /// Index value as a 64-bit register.
    ///
    /// Narrow signed indices are sign-extended. Unsigned ones are
    /// zero-extended instead, so a `u32` index of `0x8000_0000` stays
    /// positive rather than stepping backwards.
    fn index_register(&mut self, index: ValueId) -> Result<OperandId> {
        let signed = self.module.value_ty(index).is_signed();
        let operand = self.value_operand(index)?;
        let operand = self.into_register(operand)?;
        if self.ty_of(operand).bits() == 64 {
            return Ok(operand);
        }
        let wide = self.new_vreg(MachineType::I64)?;
        let opcode = if signed {
            MachineOpcode::Movsx
        } else {
            MachineOpcode::Movzx
        };
        self.emit(opcode, vec![wide, operand])?;
        Ok(wide)
    }

    fn flush(&mut self, address: Address) -> Result<OperandId> {
        if address.disp == 0 {
            return Ok(address.base);
        }
        let dst = self.new_vreg(MachineType::Ptr)?;
        let memory = self.memory_operand(address, None)?;
        self.emit(MachineOpcode::Lea, vec![dst, memory])?;
        Ok(dst)
    }

    fn memory_operand(
        &mut self,
        address: Address,
        index: Option<(OperandId, u8)>,
    ) -> Result<OperandId> {
        let mut mem = MemRef::base(self.reg_of(address.base)).with_disp(address.disp);
        if let Some((index, scale)) = index {
            ensure_invariant!(
                self.ty_of(index).bits() == 64,
                "memory index {index} is narrower than 64 bits"
            );
            mem = mem.with_index(self.reg_of(index), scale);
        }
        self.func_mut().mem(mem, MachineType::Ptr)
    }
}
