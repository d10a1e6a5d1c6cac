use fp_codegen_core::ir::InstData;
use fp_codegen_core::mir::{MachineOpcode, MachineType, OperandKind};
use fp_codegen_core::{invariant, unsupported, Result};
use tracing::debug;

use super::Lowered;
use crate::context::LoweringContext;
use crate::ty::by_value_type;

impl LoweringContext<'_> {
    /// Register-only Win64 call.
    ///
    /// The caller's own register arguments are saved to their shadow slots
    /// first; an argument that is one of them is read back from its slot,
    /// since binding earlier arguments may already have overwritten it.
    pub(super) fn lower_call(&mut self, inst: &InstData) -> Lowered {
        let module = self.module;
        let Some((&callee, args)) = inst.operands.split_first() else {
            invariant!("call {} has no callee", inst.value);
        };
        let max_args = self.config.max_register_args();
        if args.len() > max_args {
            unsupported!(
                "call {} passes {} arguments; only {max_args} register arguments are supported",
                inst.value,
                args.len()
            );
        }
        let arg_types = args
            .iter()
            .map(|arg| by_value_type(module.value_ty(*arg), "call argument"))
            .collect::<Result<Vec<_>>>()?;
        let ret_ty = by_value_type(&inst.ty, "call result")?;

        let mut target = self.resolve(callee)?;
        match self.operand(target).kind {
            OperandKind::Symbol(_) | OperandKind::VReg(_) | OperandKind::Mem(_) => {}
            // Argument registers are about to be rebound.
            _ => target = self.copy_to_vreg(target)?,
        }
        debug!(call = %inst.value, args = args.len(), "lowering call");

        let reserve = self.config.call_stack_size(args.len());
        self.func_mut().reserve_call_stack(reserve);

        let arg_regs = self.config.arg_registers.clone();
        let return_reg = self.config.return_register;
        self.with_clobbered(&arg_regs, |ctx| {
            for (position, (&arg, ty)) in args.iter().zip(arg_types).enumerate() {
                let mut source = ctx.resolve(arg)?;
                if let Some(home) = ctx.caller_arg_index(source) {
                    source = ctx.shadow_slot(home, ty)?;
                }
                let dst = ctx.hw(arg_regs[position], ty)?;
                ctx.materialize(dst, source)?;
            }
            ctx.emit(MachineOpcode::Call, vec![target])?;

            if ret_ty == MachineType::Void {
                return Ok(None);
            }
            let ret = ctx.hw(return_reg, ret_ty)?;
            let dst = ctx.new_vreg(ret_ty)?;
            ctx.emit(MachineOpcode::Mov, vec![dst, ret])?;
            Ok(Some(dst))
        })
    }
}
