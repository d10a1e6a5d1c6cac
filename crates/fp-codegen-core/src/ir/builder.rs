use super::{
    BlockData, BlockId, CmpPredicate, Constant, FnSig, FuncId, FunctionData, GlobalData, GlobalId,
    InstData, InstId, Module, Opcode, Ty, ValueId, ValueKind,
};

impl Module {
    /// Declare a body-less function.
    pub fn declare_function(&mut self, name: impl Into<String>, sig: FnSig) -> FuncId {
        self.add_function(name.into(), sig, true)
    }

    /// Add a function whose blocks will be appended with [`Module::append_block`].
    pub fn define_function(&mut self, name: impl Into<String>, sig: FnSig) -> FuncId {
        self.add_function(name.into(), sig, false)
    }

    fn add_function(&mut self, name: String, sig: FnSig, is_external: bool) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        let value = self.push_value(Ty::ptr(Ty::function(sig.clone())), ValueKind::Function(id));
        let params = sig
            .params
            .iter()
            .enumerate()
            .map(|(index, ty)| {
                self.push_value(
                    ty.clone(),
                    ValueKind::Argument {
                        func: id,
                        index: index as u32,
                    },
                )
            })
            .collect();
        self.functions.push(FunctionData {
            name,
            sig,
            params,
            blocks: Vec::new(),
            is_external,
            value,
        });
        id
    }

    pub fn add_global(
        &mut self,
        name: impl Into<String>,
        ty: Ty,
        initializer: Option<ValueId>,
    ) -> GlobalId {
        let id = GlobalId(self.globals.len() as u32);
        let value = self.push_value(Ty::ptr(ty.clone()), ValueKind::Global(id));
        self.globals.push(GlobalData {
            name: name.into(),
            ty,
            initializer,
            alignment: None,
            value,
        });
        id
    }

    pub fn set_global_alignment(&mut self, global: GlobalId, alignment: u32) {
        ensure_invariant!(
            (global.0 as usize) < self.globals.len(),
            "dangling global id {global}"
        );
        self.globals[global.0 as usize].alignment = Some(alignment);
    }

    pub fn append_block(&mut self, func: FuncId, name: Option<&str>) -> BlockId {
        ensure_invariant!(
            !self.function(func).is_external,
            "cannot add blocks to external function {}",
            self.function(func).name
        );
        let id = BlockId(self.blocks.len() as u32);
        let value = self.push_value(Ty::Void, ValueKind::Block(id));
        self.blocks.push(BlockData {
            func,
            name: name.map(str::to_string),
            insts: Vec::new(),
            value,
        });
        self.functions[func.0 as usize].blocks.push(id);
        id
    }

    pub fn append_inst(
        &mut self,
        block: BlockId,
        opcode: Opcode,
        operands: Vec<ValueId>,
        ty: Ty,
    ) -> ValueId {
        let id = InstId(self.insts.len() as u32);
        let value = self.push_value(ty.clone(), ValueKind::Instruction(id));
        self.insts.push(InstData {
            opcode,
            operands,
            ty,
            block,
            value,
        });
        ensure_invariant!(
            (block.0 as usize) < self.blocks.len(),
            "dangling block id {block}"
        );
        self.blocks[block.0 as usize].insts.push(id);
        value
    }

    /// Extend `phi` with another `(value, predecessor)` pair, for incoming
    /// values defined after the phi itself.
    pub fn add_phi_incoming(&mut self, phi: ValueId, value: ValueId, pred: BlockId) {
        let inst = match self.value(phi).kind {
            ValueKind::Instruction(inst) if self.inst(inst).opcode == Opcode::Phi => inst,
            _ => invariant!("{phi} is not a phi"),
        };
        let pred = self.block_value(pred);
        let operands = &mut self.insts[inst.0 as usize].operands;
        operands.push(value);
        operands.push(pred);
    }

    pub fn arg(&self, func: FuncId, index: usize) -> ValueId {
        *self
            .function(func)
            .params
            .get(index)
            .unwrap_or_else(|| invariant!("{func} has no parameter {index}"))
    }

    pub fn func_value(&self, func: FuncId) -> ValueId {
        self.function(func).value
    }

    pub fn global_value(&self, global: GlobalId) -> ValueId {
        self.global(global).value
    }

    pub fn block_value(&self, block: BlockId) -> ValueId {
        self.block(block).value
    }

    pub fn const_int(&mut self, ty: Ty, value: i64) -> ValueId {
        self.push_value(ty, ValueKind::Constant(Constant::Int(value)))
    }

    pub fn const_bool(&mut self, value: bool) -> ValueId {
        self.const_int(Ty::Bool, value as i64)
    }

    pub fn const_float(&mut self, ty: Ty, value: f64) -> ValueId {
        self.push_value(ty, ValueKind::Constant(Constant::Float(value)))
    }

    pub fn const_null(&mut self, ty: Ty) -> ValueId {
        self.push_value(ty, ValueKind::Constant(Constant::Null))
    }

    pub fn const_zero(&mut self, ty: Ty) -> ValueId {
        self.push_value(ty, ValueKind::Constant(Constant::Zero))
    }

    pub fn const_undef(&mut self, ty: Ty) -> ValueId {
        self.push_value(ty, ValueKind::Constant(Constant::Undef))
    }

    pub fn const_bytes(&mut self, bytes: impl Into<Vec<u8>>) -> ValueId {
        let bytes = bytes.into();
        let ty = Ty::array(Ty::u8(), bytes.len() as u64);
        self.push_value(ty, ValueKind::Constant(Constant::Bytes(bytes)))
    }

    pub fn const_aggregate(&mut self, ty: Ty, elements: Vec<ValueId>) -> ValueId {
        self.push_value(ty, ValueKind::Constant(Constant::Aggregate(elements)))
    }
}

/// Cursor for appending instructions to a block, in the spirit of an
/// LLVM `IRBuilder`.
pub struct Builder<'m> {
    module: &'m mut Module,
    block: Option<BlockId>,
}

impl<'m> Builder<'m> {
    pub fn new(module: &'m mut Module) -> Self {
        Self {
            module,
            block: None,
        }
    }

    pub fn module(&mut self) -> &mut Module {
        &mut *self.module
    }

    pub fn position_at_end(&mut self, block: BlockId) {
        self.block = Some(block);
    }

    fn push(&mut self, opcode: Opcode, operands: Vec<ValueId>, ty: Ty) -> ValueId {
        let block = self
            .block
            .unwrap_or_else(|| invariant!("builder is not positioned in a block"));
        self.module.append_inst(block, opcode, operands, ty)
    }

    /// Arithmetic, bitwise and shift instructions; the result takes the
    /// left operand's type.
    pub fn binary(&mut self, opcode: Opcode, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.module.value_ty(lhs).clone();
        self.push(opcode, vec![lhs, rhs], ty)
    }

    pub fn cmp(&mut self, predicate: CmpPredicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.push(Opcode::Cmp(predicate), vec![lhs, rhs], Ty::Bool)
    }

    pub fn alloca(&mut self, ty: Ty) -> ValueId {
        self.push(Opcode::Alloca, Vec::new(), Ty::ptr(ty))
    }

    pub fn alloca_array(&mut self, ty: Ty, count: ValueId) -> ValueId {
        self.push(Opcode::Alloca, vec![count], Ty::ptr(ty))
    }

    pub fn load(&mut self, ty: Ty, ptr: ValueId) -> ValueId {
        self.push(Opcode::Load, vec![ptr], ty)
    }

    pub fn store(&mut self, value: ValueId, ptr: ValueId) -> ValueId {
        self.push(Opcode::Store, vec![value, ptr], Ty::Void)
    }

    pub fn gep(&mut self, result_ty: Ty, base: ValueId, indices: &[ValueId]) -> ValueId {
        let mut operands = Vec::with_capacity(indices.len() + 1);
        operands.push(base);
        operands.extend_from_slice(indices);
        self.push(Opcode::Gep, operands, result_ty)
    }

    pub fn phi(&mut self, ty: Ty, incoming: &[(ValueId, BlockId)]) -> ValueId {
        let mut operands = Vec::with_capacity(incoming.len() * 2);
        for (value, block) in incoming {
            operands.push(*value);
            operands.push(self.module.block_value(*block));
        }
        self.push(Opcode::Phi, operands, ty)
    }

    pub fn call(&mut self, callee: ValueId, args: &[ValueId]) -> ValueId {
        let ret = match self.module.value_ty(callee).fn_sig() {
            Some(sig) => sig.ret.clone(),
            None => invariant!("call through non-function value {callee}"),
        };
        let mut operands = Vec::with_capacity(args.len() + 1);
        operands.push(callee);
        operands.extend_from_slice(args);
        self.push(Opcode::Call, operands, ret)
    }

    pub fn cast(&mut self, opcode: Opcode, value: ValueId, ty: Ty) -> ValueId {
        self.push(opcode, vec![value], ty)
    }

    pub fn br(&mut self, target: BlockId) -> ValueId {
        let target = self.module.block_value(target);
        self.push(Opcode::Br, vec![target], Ty::Void)
    }

    pub fn cond_br(&mut self, cond: ValueId, if_true: BlockId, if_false: BlockId) -> ValueId {
        let if_true = self.module.block_value(if_true);
        let if_false = self.module.block_value(if_false);
        self.push(Opcode::CondBr, vec![cond, if_true, if_false], Ty::Void)
    }

    pub fn ret(&mut self, value: Option<ValueId>) -> ValueId {
        self.push(Opcode::Ret, value.into_iter().collect(), Ty::Void)
    }
}
