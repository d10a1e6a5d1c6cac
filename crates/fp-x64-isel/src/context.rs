use std::collections::HashMap;

use fp_codegen_core::ir::{self, BlockId, FuncId, InstId, ValueId};
use fp_codegen_core::mir::{
    HwReg, MBlockId, MFuncId, MachineFunction, MachineModule, MachineOpcode, MachineOperand,
    MachineType, MemRef, OperandId, Reg,
};
use fp_codegen_core::{ensure_invariant, invariant, Result};

use crate::config::LoweringConfig;

/// State of one module lowering.
///
/// The value and block maps belong to the function being lowered: operands
/// are owned by that function's arena, so they are cleared whenever a new
/// function begins.
pub struct LoweringContext<'m> {
    pub(crate) module: &'m ir::Module,
    pub(crate) config: LoweringConfig,
    pub(crate) output: MachineModule,
    function_map: HashMap<FuncId, MFuncId>,
    pub(crate) block_map: HashMap<BlockId, MBlockId>,
    value_map: HashMap<ValueId, OperandId>,
    pub(crate) pending_phis: Vec<InstId>,
    current_function: Option<MachineFunction>,
    pub(crate) current_ir_function: Option<FuncId>,
    current_block: Option<MBlockId>,
}

impl<'m> LoweringContext<'m> {
    pub fn new(module: &'m ir::Module, config: LoweringConfig) -> Self {
        Self {
            module,
            config,
            output: MachineModule::new(module.name.clone()),
            function_map: HashMap::new(),
            block_map: HashMap::new(),
            value_map: HashMap::new(),
            pending_phis: Vec::new(),
            current_function: None,
            current_ir_function: None,
            current_block: None,
        }
    }

    pub fn config(&self) -> &LoweringConfig {
        &self.config
    }

    pub fn output(&self) -> &MachineModule {
        &self.output
    }

    pub fn into_output(self) -> MachineModule {
        self.output
    }

    /// Machine function produced for an IR function, once lowered.
    pub fn lowered_function(&self, func: FuncId) -> Option<MFuncId> {
        self.function_map.get(&func).copied()
    }

    pub(crate) fn record_function(&mut self, func: FuncId, id: MFuncId) {
        self.function_map.insert(func, id);
    }

    pub(crate) fn reset_for_new_function(&mut self) {
        self.block_map.clear();
        self.value_map.clear();
        self.pending_phis.clear();
        self.current_function = None;
        self.current_ir_function = None;
        self.current_block = None;
    }

    pub(crate) fn start_function(&mut self, func: FuncId, machine: MachineFunction) {
        self.current_function = Some(machine);
        self.current_ir_function = Some(func);
    }

    pub(crate) fn take_function(&mut self) -> MachineFunction {
        self.current_block = None;
        self.current_ir_function = None;
        self.current_function
            .take()
            .unwrap_or_else(|| invariant!("no function is being lowered"))
    }

    pub fn func(&self) -> &MachineFunction {
        self.current_function
            .as_ref()
            .unwrap_or_else(|| invariant!("no function is being lowered"))
    }

    pub(crate) fn func_mut(&mut self) -> &mut MachineFunction {
        self.current_function
            .as_mut()
            .unwrap_or_else(|| invariant!("no function is being lowered"))
    }

    pub(crate) fn set_current_block(&mut self, block: MBlockId) {
        self.current_block = Some(block);
    }

    fn current_block(&self) -> MBlockId {
        self.current_block
            .unwrap_or_else(|| invariant!("no insertion block in {}", self.func().name))
    }

    /// Operand already bound to an IR value of the current function.
    pub fn lookup_value(&self, value: ValueId) -> Option<OperandId> {
        self.value_map.get(&value).copied()
    }

    pub(crate) fn record_value(&mut self, value: ValueId, operand: OperandId) {
        let previous = self.value_map.insert(value, operand);
        ensure_invariant!(
            previous.is_none(),
            "{value} lowered twice in {}",
            self.func().name
        );
    }

    /// Machine block for an IR block, created on first reference.
    pub(crate) fn block_for(&mut self, block: BlockId) -> Result<MBlockId> {
        if let Some(existing) = self.block_map.get(&block) {
            return Ok(*existing);
        }
        let module = self.module;
        let data = module.block(block);
        ensure_invariant!(
            Some(data.func) == self.current_ir_function,
            "{block} does not belong to {}",
            self.func().name
        );
        let name = data
            .name
            .clone()
            .unwrap_or_else(|| block.to_string());
        let id = self.func_mut().create_block(name)?;
        self.block_map.insert(block, id);
        Ok(id)
    }

    pub(crate) fn emit(&mut self, opcode: MachineOpcode, operands: Vec<OperandId>) -> Result<()> {
        let block = self.current_block();
        self.func_mut().append_inst(block, opcode, operands)
    }

    pub(crate) fn operand(&self, id: OperandId) -> &MachineOperand {
        self.func().operand(id)
    }

    pub(crate) fn ty_of(&self, id: OperandId) -> MachineType {
        self.operand(id).ty
    }

    pub(crate) fn new_vreg(&mut self, ty: MachineType) -> Result<OperandId> {
        self.func_mut().new_vreg(ty)
    }

    pub(crate) fn hw(&mut self, reg: HwReg, ty: MachineType) -> Result<OperandId> {
        self.func_mut().hw_reg(reg, ty)
    }

    pub(crate) fn imm(&mut self, value: i64, ty: MachineType) -> Result<OperandId> {
        self.func_mut().imm(value, ty)
    }

    pub(crate) fn reg_of(&self, id: OperandId) -> Reg {
        self.func().reg_of(id)
    }

    /// `ty [frame_base + disp]`, the home of incoming argument `index`.
    pub(crate) fn shadow_slot(&mut self, index: usize, ty: MachineType) -> Result<OperandId> {
        let disp = self.config.shadow_slot_disp(index);
        let base = Reg::Hw(self.config.frame_base);
        self.func_mut().mem(MemRef::base(base).with_disp(disp), ty)
    }

    /// Index of the incoming argument whose register operand is `id`.
    pub(crate) fn caller_arg_index(&self, id: OperandId) -> Option<usize> {
        self.func().args().iter().position(|arg| *arg == id)
    }

    /// Run `body` with every incoming argument that lives in one of `regs`
    /// saved to its shadow slot before and reloaded after.
    pub(crate) fn with_clobbered<T>(
        &mut self,
        regs: &[HwReg],
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let live: Vec<(usize, OperandId)> = self
            .func()
            .args()
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, arg)| {
                self.operand(*arg)
                    .as_hw_reg()
                    .is_some_and(|reg| regs.contains(&reg))
            })
            .collect();

        let mut saved = Vec::with_capacity(live.len());
        for (index, arg) in live {
            let slot = self.shadow_slot(index, self.ty_of(arg))?;
            self.emit(MachineOpcode::Mov, vec![slot, arg])?;
            saved.push((arg, slot));
        }

        let result = body(self)?;

        for (arg, slot) in saved {
            self.emit(MachineOpcode::Mov, vec![arg, slot])?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_codegen_core::ir::{FnSig, Module, Ty};
    use fp_codegen_core::mir::OperandKind;

    fn two_arg_module() -> (Module, FuncId) {
        let mut module = Module::new("ctx");
        let func = module.define_function("f", FnSig::new(vec![Ty::i32(), Ty::i64()], Ty::i32()));
        module.append_block(func, Some("entry"));
        (module, func)
    }

    #[test]
    fn resolving_twice_yields_the_same_operand() {
        let (mut module, func) = two_arg_module();
        let seven = module.const_int(Ty::i32(), 7);
        let a = module.arg(func, 0);

        let mut ctx = LoweringContext::new(&module, LoweringConfig::default());
        ctx.begin_function(func).unwrap();

        assert_eq!(ctx.resolve(a).unwrap(), ctx.resolve(a).unwrap());
        let first = ctx.resolve(seven).unwrap();
        assert_eq!(first, ctx.resolve(seven).unwrap());
        assert_eq!(ctx.operand(first).kind, OperandKind::Imm(7));
        assert_eq!(ctx.operand(first).ty, MachineType::I32);
    }

    #[test]
    fn clobber_guard_spills_only_matching_arguments() {
        let (module, func) = two_arg_module();
        let mut ctx = LoweringContext::new(&module, LoweringConfig::default());
        ctx.begin_function(func).unwrap();
        let entry = ctx.block_for(module.function(func).blocks[0]).unwrap();
        ctx.set_current_block(entry);

        ctx.with_clobbered(&[HwReg::Rdx], |_| Ok(())).unwrap();

        let insts = &ctx.func().block(entry).insts;
        assert_eq!(insts.len(), 2);
        let spill_dst = ctx.operand(insts[0].operands[0]);
        assert_eq!(
            spill_dst.kind,
            OperandKind::Mem(MemRef::base(Reg::Hw(HwReg::Rbp)).with_disp(24))
        );
        assert_eq!(spill_dst.ty, MachineType::I64);
        assert_eq!(insts[1].operands[0], ctx.func().args()[1]);
    }

    #[test]
    #[should_panic(expected = "invariant violation")]
    fn recording_a_value_twice_panics() {
        let (mut module, func) = two_arg_module();
        let one = module.const_int(Ty::i32(), 1);
        let mut ctx = LoweringContext::new(&module, LoweringConfig::default());
        ctx.begin_function(func).unwrap();
        let op = ctx.resolve(one).unwrap();
        ctx.record_value(one, op);
    }
}
