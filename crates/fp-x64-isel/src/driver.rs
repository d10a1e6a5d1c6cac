use fp_codegen_core::ir::Module;
use fp_codegen_core::mir::MachineModule;
use fp_codegen_core::Result;
use tracing::{debug, info};

use crate::config::LoweringConfig;
use crate::context::LoweringContext;

/// Lowers whole modules: every global first, then every function, each in
/// declaration order.
#[derive(Debug, Clone, Default)]
pub struct X64Lowering {
    config: LoweringConfig,
}

impl X64Lowering {
    pub fn new(config: LoweringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoweringConfig {
        &self.config
    }

    /// Any error aborts the module; no partial output is returned.
    pub fn lower(&self, module: &Module) -> Result<MachineModule> {
        let mut ctx = LoweringContext::new(module, self.config.clone());
        debug!(module = %module.name, "lowering module");
        for (id, _) in module.globals() {
            ctx.lower_global(id)?;
        }
        for (id, _) in module.functions() {
            ctx.lower_function(id)?;
        }
        let output = ctx.into_output();
        info!(
            module = %output.name,
            globals = output.globals().len(),
            functions = output.functions().len(),
            "lowered module"
        );
        Ok(output)
    }
}

pub fn lower_module(module: &Module, config: &LoweringConfig) -> Result<MachineModule> {
    X64Lowering::new(config.clone()).lower(module)
}
