use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use super::inst::check_operand_classes;
use super::{
    HwReg, MachineInst, MachineOpcode, MachineOperand, MachineType, MemRef, OperandId,
    OperandKind, Reg, StackObjectId, VRegId,
};
use crate::error::{try_push, Result};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("mbb{_0}")]
pub struct MBlockId(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionFlags {
    pub is_vararg: bool,
    pub is_external: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineBlock {
    pub name: String,
    pub insts: Vec<MachineInst>,
}

impl MachineBlock {
    /// Index of the first `jcc`/`jmp`/`ret`, if any.
    pub fn first_terminator(&self) -> Option<usize> {
        self.insts
            .iter()
            .position(|inst| inst.opcode.is_terminator())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineFunction {
    pub name: String,
    pub ret_ty: MachineType,
    pub arg_types: Vec<MachineType>,
    pub flags: FunctionFlags,
    args: Vec<OperandId>,
    operands: Vec<MachineOperand>,
    blocks: Vec<MachineBlock>,
    layout: Vec<MBlockId>,
    next_vreg: u32,
    next_stack_object: u32,
    max_call_stack: u32,
    sealed: bool,
}

impl MachineFunction {
    pub fn new(
        name: impl Into<String>,
        ret_ty: MachineType,
        arg_types: Vec<MachineType>,
        flags: FunctionFlags,
    ) -> Self {
        Self {
            name: name.into(),
            ret_ty,
            arg_types,
            flags,
            args: Vec::new(),
            operands: Vec::new(),
            blocks: Vec::new(),
            layout: Vec::new(),
            next_vreg: 0,
            next_stack_object: 0,
            max_call_stack: 0,
            sealed: false,
        }
    }

    fn check_open(&self) {
        ensure_invariant!(!self.sealed, "machine function {} is sealed", self.name);
    }

    pub fn operand(&self, id: OperandId) -> &MachineOperand {
        self.operands
            .get(id.0 as usize)
            .unwrap_or_else(|| invariant!("dangling operand {id} in {}", self.name))
    }

    fn push_operand(&mut self, kind: OperandKind, ty: MachineType) -> Result<OperandId> {
        self.check_open();
        let index = try_push(&mut self.operands, MachineOperand { kind, ty })?;
        Ok(OperandId(index as u32))
    }

    pub fn new_vreg(&mut self, ty: MachineType) -> Result<OperandId> {
        let vreg = VRegId(self.next_vreg);
        self.next_vreg += 1;
        self.push_operand(OperandKind::VReg(vreg), ty)
    }

    pub fn hw_reg(&mut self, reg: HwReg, ty: MachineType) -> Result<OperandId> {
        self.push_operand(OperandKind::HwReg(reg), ty)
    }

    pub fn stack_object(&mut self, size: u64, align: u32) -> Result<OperandId> {
        let id = StackObjectId(self.next_stack_object);
        self.next_stack_object += 1;
        self.push_operand(OperandKind::StackObject { id, size, align }, MachineType::Ptr)
    }

    pub fn symbol(&mut self, name: impl Into<String>, ty: MachineType) -> Result<OperandId> {
        self.push_operand(OperandKind::Symbol(name.into()), ty)
    }

    pub fn imm(&mut self, value: i64, ty: MachineType) -> Result<OperandId> {
        self.push_operand(OperandKind::Imm(value), ty)
    }

    pub fn mem(&mut self, mem: MemRef, ty: MachineType) -> Result<OperandId> {
        self.push_operand(OperandKind::Mem(mem), ty)
    }

    pub fn block_ref(&mut self, block: MBlockId) -> Result<OperandId> {
        self.block(block);
        self.push_operand(OperandKind::Block(block), MachineType::Void)
    }

    /// Register view of an operand, for use as a memory base or index.
    pub fn reg_of(&self, id: OperandId) -> Reg {
        self.operand(id)
            .as_reg()
            .unwrap_or_else(|| invariant!("{id} ({:?}) is not a register", self.operand(id)))
    }

    pub fn set_args(&mut self, args: Vec<OperandId>) {
        self.check_open();
        self.args = args;
    }

    pub fn arg(&self, index: usize) -> Option<OperandId> {
        self.args.get(index).copied()
    }

    pub fn args(&self) -> &[OperandId] {
        &self.args
    }

    /// Allocate a block; it joins the layout only once appended.
    pub fn create_block(&mut self, name: impl Into<String>) -> Result<MBlockId> {
        self.check_open();
        let index = try_push(
            &mut self.blocks,
            MachineBlock {
                name: name.into(),
                insts: Vec::new(),
            },
        )?;
        Ok(MBlockId(index as u32))
    }

    pub fn append_block(&mut self, block: MBlockId) -> Result<()> {
        self.check_open();
        self.block(block);
        ensure_invariant!(
            !self.layout.contains(&block),
            "{block} appended twice to {}",
            self.name
        );
        try_push(&mut self.layout, block)?;
        Ok(())
    }

    pub fn block(&self, id: MBlockId) -> &MachineBlock {
        self.blocks
            .get(id.0 as usize)
            .unwrap_or_else(|| invariant!("dangling block {id} in {}", self.name))
    }

    fn block_mut(&mut self, id: MBlockId) -> &mut MachineBlock {
        let name = &self.name;
        self.blocks
            .get_mut(id.0 as usize)
            .unwrap_or_else(|| invariant!("dangling block {id} in {name}"))
    }

    /// Appended blocks in layout order.
    pub fn blocks(&self) -> impl Iterator<Item = (MBlockId, &MachineBlock)> {
        self.layout.iter().map(move |id| (*id, self.block(*id)))
    }

    pub fn layout(&self) -> &[MBlockId] {
        &self.layout
    }

    fn checked(&self, opcode: MachineOpcode, operands: Vec<OperandId>) -> MachineInst {
        let resolved: Vec<&MachineOperand> = operands.iter().map(|id| self.operand(*id)).collect();
        check_operand_classes(opcode, &resolved);
        MachineInst::new(opcode, operands)
    }

    pub fn append_inst(
        &mut self,
        block: MBlockId,
        opcode: MachineOpcode,
        operands: Vec<OperandId>,
    ) -> Result<()> {
        self.check_open();
        let inst = self.checked(opcode, operands);
        try_push(&mut self.block_mut(block).insts, inst)?;
        Ok(())
    }

    /// Insert before the first terminator of `block`, or at its end when it
    /// has none yet.
    pub fn insert_before_terminator(
        &mut self,
        block: MBlockId,
        opcode: MachineOpcode,
        operands: Vec<OperandId>,
    ) -> Result<()> {
        self.check_open();
        let inst = self.checked(opcode, operands);
        let block = self.block_mut(block);
        block.insts.try_reserve(1)?;
        match block.first_terminator() {
            Some(at) => block.insts.insert(at, inst),
            None => block.insts.push(inst),
        }
        Ok(())
    }

    /// Record that a call site needs `bytes` of outgoing argument space.
    pub fn reserve_call_stack(&mut self, bytes: u32) {
        self.max_call_stack = self.max_call_stack.max(bytes);
    }

    pub fn max_call_stack(&self) -> u32 {
        self.max_call_stack
    }

    pub fn vreg_count(&self) -> u32 {
        self.next_vreg
    }

    pub fn seal(&mut self) {
        self.check_open();
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}
