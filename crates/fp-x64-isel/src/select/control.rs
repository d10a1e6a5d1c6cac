use fp_codegen_core::ir::{InstData, InstId};
use fp_codegen_core::mir::{CondCode, MachineOpcode, MachineType};
use fp_codegen_core::{ensure_invariant, invariant};

use super::{unary_operand, Lowered};
use crate::context::LoweringContext;
use crate::ty::scalar_type;

impl LoweringContext<'_> {
    /// Allocate the phi's register now; its copies are placed once every
    /// block of the function exists.
    pub(super) fn lower_phi(&mut self, id: InstId, inst: &InstData) -> Lowered {
        let ty = scalar_type(&inst.ty, "phi")?;
        let dst = self.new_vreg(ty)?;
        self.record_value(inst.value, dst);
        self.pending_phis.push(id);
        Ok(None)
    }

    pub(super) fn lower_br(&mut self, inst: &InstData) -> Lowered {
        let target = self.resolve(unary_operand(inst))?;
        self.emit(MachineOpcode::Jmp, vec![target])?;
        Ok(None)
    }

    /// `test c, c`; `je false`; `jmp true`.
    pub(super) fn lower_cond_br(&mut self, inst: &InstData) -> Lowered {
        let [cond, if_true, if_false] = inst.operands[..] else {
            invariant!("condbr {} takes three operands", inst.value);
        };
        let cond = self.value_operand(cond)?;
        let cond = self.into_register(cond)?;
        let if_true = self.resolve(if_true)?;
        let if_false = self.resolve(if_false)?;

        self.emit(MachineOpcode::Test, vec![cond, cond])?;
        self.emit(MachineOpcode::Jcc(CondCode::E), vec![if_false])?;
        self.emit(MachineOpcode::Jmp, vec![if_true])?;
        Ok(None)
    }

    pub(super) fn lower_ret(&mut self, inst: &InstData) -> Lowered {
        let ret_ty = self.func().ret_ty;
        match inst.operands[..] {
            [] => {}
            [value] => {
                ensure_invariant!(
                    ret_ty != MachineType::Void,
                    "ret {} returns a value from void {}",
                    inst.value,
                    self.func().name
                );
                let source = self.resolve(value)?;
                let ret = self.hw(self.config.return_register, ret_ty)?;
                self.materialize(ret, source)?;
            }
            _ => invariant!("ret {} takes at most one operand", inst.value),
        }
        self.emit(MachineOpcode::Ret, vec![])?;
        Ok(None)
    }
}
