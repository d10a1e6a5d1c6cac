use fp_codegen_core::ir::FuncId;
use fp_codegen_core::mir::{FunctionFlags, MFuncId, MachineFunction};
use fp_codegen_core::{unsupported, Result};
use tracing::debug;

use crate::context::LoweringContext;
use crate::ty::{lower_type, scalar_type};

impl LoweringContext<'_> {
    /// Lower one function into the output module.
    ///
    /// Returns `None` for intrinsic declarations, which resolve to runtime
    /// symbols at their call sites instead.
    pub fn lower_function(&mut self, func: FuncId) -> Result<Option<MFuncId>> {
        let module = self.module;
        let data = module.function(func);
        if self.config.is_intrinsic(&data.name) {
            debug!(function = %data.name, "skipping intrinsic declaration");
            return Ok(None);
        }
        debug!(
            function = %data.name,
            blocks = data.blocks.len(),
            external = data.is_external,
            "lowering function"
        );

        self.begin_function(func)?;
        for &block in &data.blocks {
            let machine_block = self.block_for(block)?;
            self.set_current_block(machine_block);
            for &inst in &module.block(block).insts {
                self.lower_instruction(inst)?;
            }
            self.func_mut().append_block(machine_block)?;
        }
        self.resolve_pending_phis()?;

        let mut machine = self.take_function();
        machine.seal();
        let id = self.output.push_function(machine)?;
        self.record_function(func, id);
        Ok(Some(id))
    }

    /// Reset per-function state and open the machine function shell.
    ///
    /// Incoming arguments of a defined function are bound to the argument
    /// registers in order; declarations carry only their types.
    pub fn begin_function(&mut self, func: FuncId) -> Result<()> {
        self.reset_for_new_function();
        let data = self.module.function(func);
        let ret_ty = lower_type(&data.sig.ret)?;
        let arg_types = data
            .sig
            .params
            .iter()
            .map(lower_type)
            .collect::<Result<Vec<_>>>()?;
        let flags = FunctionFlags {
            is_vararg: data.sig.is_variadic,
            is_external: data.is_external,
        };
        let mut machine = MachineFunction::new(data.name.clone(), ret_ty, arg_types, flags);

        if !data.is_external {
            scalar_type(&data.sig.ret, "return value")?;
            let regs = &self.config.arg_registers;
            if data.sig.params.len() > regs.len() {
                unsupported!(
                    "{} takes {} parameters; only {} register parameters are supported",
                    data.name,
                    data.sig.params.len(),
                    regs.len()
                );
            }
            let mut args = Vec::with_capacity(data.sig.params.len());
            for (param, reg) in data.sig.params.iter().zip(regs) {
                let ty = scalar_type(param, "parameter")?;
                args.push(machine.hw_reg(*reg, ty)?);
            }
            machine.set_args(args);
        }

        self.start_function(func, machine);
        Ok(())
    }
}
