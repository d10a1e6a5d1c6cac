use fp_codegen_core::mir::pretty::format_inst;
use fp_codegen_core::mir::{MachineFunction, MachineModule, MachineOpcode};
use fp_codegen_core::{ir::Module, Error};
use fp_x64_isel::{lower_module, LoweringConfig};

pub fn lower(module: &Module) -> MachineModule {
    lower_module(module, &LoweringConfig::default()).expect("module lowers")
}

pub fn lower_err(module: &Module) -> Error {
    lower_module(module, &LoweringConfig::default()).expect_err("module is rejected")
}

pub fn function<'a>(module: &'a MachineModule, name: &str) -> &'a MachineFunction {
    module
        .function_by_name(name)
        .unwrap_or_else(|| panic!("no machine function {name}"))
}

/// Every instruction of `func` in layout order, rendered without types.
pub fn listing(func: &MachineFunction) -> Vec<String> {
    func.blocks()
        .flat_map(|(_, block)| block.insts.iter())
        .map(|inst| format_inst(func, inst, false))
        .collect()
}

pub fn block_listing(func: &MachineFunction, name: &str) -> Vec<String> {
    let (_, block) = func
        .blocks()
        .find(|(_, block)| block.name == name)
        .unwrap_or_else(|| panic!("no block {name} in {}", func.name));
    block
        .insts
        .iter()
        .map(|inst| format_inst(func, inst, false))
        .collect()
}

pub fn opcodes(func: &MachineFunction) -> Vec<MachineOpcode> {
    func.blocks()
        .flat_map(|(_, block)| block.insts.iter())
        .map(|inst| inst.opcode)
        .collect()
}
