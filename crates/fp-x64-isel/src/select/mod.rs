//! Per-opcode selection. Each routine lowers one IR instruction into the
//! current block and returns the operand that now holds its result, if any.

use fp_codegen_core::ir::{InstData, InstId, Opcode, ValueId};
use fp_codegen_core::mir::OperandId;
use fp_codegen_core::{ensure_invariant, unsupported, Result};
use tracing::trace;

use crate::context::LoweringContext;

mod arith;
mod call;
mod control;
mod convert;
mod gep;
mod memory;

impl LoweringContext<'_> {
    pub(crate) fn lower_instruction(&mut self, id: InstId) -> Result<()> {
        let module = self.module;
        let inst = module.inst(id);
        trace!(inst = %id, opcode = ?inst.opcode, "selecting");

        let result = match inst.opcode {
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor => self.lower_binary(inst)?,
            Opcode::Div | Opcode::Rem => self.lower_division(inst)?,
            Opcode::Shl | Opcode::Shr => self.lower_shift(inst)?,
            Opcode::Cmp(predicate) => self.lower_compare(inst, predicate)?,
            Opcode::Alloca => self.lower_alloca(inst)?,
            Opcode::Load => self.lower_load(inst)?,
            Opcode::Store => self.lower_store(inst)?,
            Opcode::Gep => self.lower_gep(inst)?,
            Opcode::Phi => self.lower_phi(id, inst)?,
            Opcode::Call => self.lower_call(inst)?,
            Opcode::Trunc => self.lower_trunc(inst)?,
            Opcode::ZExt | Opcode::SExt => self.lower_extend(inst)?,
            Opcode::PtrToInt | Opcode::IntToPtr | Opcode::Bitcast => self.lower_reinterpret(inst)?,
            Opcode::Br => self.lower_br(inst)?,
            Opcode::CondBr => self.lower_cond_br(inst)?,
            Opcode::Ret => self.lower_ret(inst)?,
            Opcode::FAdd
            | Opcode::FSub
            | Opcode::FMul
            | Opcode::FDiv
            | Opcode::FpToSi
            | Opcode::SiToFp
            | Opcode::FpExt
            | Opcode::FpTrunc => {
                unsupported!("floating-point instruction {:?} ({})", inst.opcode, inst.value)
            }
        };

        if let Some(operand) = result {
            self.record_value(inst.value, operand);
        }
        Ok(())
    }
}

/// The two operands of a binary instruction.
pub(crate) fn binary_operands(inst: &InstData) -> (ValueId, ValueId) {
    ensure_invariant!(
        inst.operands.len() == 2,
        "{:?} {} takes two operands",
        inst.opcode,
        inst.value
    );
    (inst.operands[0], inst.operands[1])
}

/// The single operand of a cast, load or similar instruction.
pub(crate) fn unary_operand(inst: &InstData) -> ValueId {
    ensure_invariant!(
        inst.operands.len() == 1,
        "{:?} {} takes one operand",
        inst.opcode,
        inst.value
    );
    inst.operands[0]
}

type Lowered = Result<Option<OperandId>>;
