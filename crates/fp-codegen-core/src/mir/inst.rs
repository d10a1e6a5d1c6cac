use serde::{Deserialize, Serialize};

use super::{CondCode, HwReg, MachineOperand, OperandId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineOpcode {
    Mov,
    Movzx,
    Movsx,
    Lea,
    Add,
    Sub,
    Imul,
    Div,
    Idiv,
    /// Sign-extend AX into DX:AX.
    Cwd,
    /// Sign-extend EAX into EDX:EAX.
    Cdq,
    /// Sign-extend RAX into RDX:RAX.
    Cqo,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Sar,
    Cmp,
    Test,
    Setcc(CondCode),
    Jcc(CondCode),
    Jmp,
    Call,
    Ret,
}

impl MachineOpcode {
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            MachineOpcode::Jcc(_) | MachineOpcode::Jmp | MachineOpcode::Ret
        )
    }

    pub fn mnemonic(self) -> String {
        match self {
            MachineOpcode::Mov => "mov".into(),
            MachineOpcode::Movzx => "movzx".into(),
            MachineOpcode::Movsx => "movsx".into(),
            MachineOpcode::Lea => "lea".into(),
            MachineOpcode::Add => "add".into(),
            MachineOpcode::Sub => "sub".into(),
            MachineOpcode::Imul => "imul".into(),
            MachineOpcode::Div => "div".into(),
            MachineOpcode::Idiv => "idiv".into(),
            MachineOpcode::Cwd => "cwd".into(),
            MachineOpcode::Cdq => "cdq".into(),
            MachineOpcode::Cqo => "cqo".into(),
            MachineOpcode::And => "and".into(),
            MachineOpcode::Or => "or".into(),
            MachineOpcode::Xor => "xor".into(),
            MachineOpcode::Shl => "shl".into(),
            MachineOpcode::Shr => "shr".into(),
            MachineOpcode::Sar => "sar".into(),
            MachineOpcode::Cmp => "cmp".into(),
            MachineOpcode::Test => "test".into(),
            MachineOpcode::Setcc(cc) => format!("set{cc}"),
            MachineOpcode::Jcc(cc) => format!("j{cc}"),
            MachineOpcode::Jmp => "jmp".into(),
            MachineOpcode::Call => "call".into(),
            MachineOpcode::Ret => "ret".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineInst {
    pub opcode: MachineOpcode,
    pub operands: Vec<OperandId>,
}

impl MachineInst {
    pub fn new(opcode: MachineOpcode, operands: Vec<OperandId>) -> Self {
        Self { opcode, operands }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Reg,
    Imm,
    Mem,
    Label,
}

fn class_of(op: &MachineOperand) -> Class {
    if op.is_register() {
        Class::Reg
    } else if op.is_imm() {
        Class::Imm
    } else if op.is_label() {
        Class::Label
    } else {
        Class::Mem
    }
}

/// Panic unless `operands` fit the operand classes `opcode` accepts.
pub(crate) fn check_operand_classes(opcode: MachineOpcode, operands: &[&MachineOperand]) {
    use Class::*;
    use MachineOpcode::*;

    let classes: Vec<Class> = operands.iter().map(|op| class_of(op)).collect();
    let ok = match (opcode, classes.as_slice()) {
        (Cwd | Cdq | Cqo | Ret, []) => true,
        (Jcc(_) | Jmp, [Label]) => true,
        (Call, [Reg | Mem]) => true,
        (Div | Idiv, [Reg | Mem]) => true,
        (Setcc(_), [Reg | Mem]) => operands[0].ty.bits() == 8,
        (Lea, [Reg, Mem]) => true,
        (Movzx | Movsx, [Reg, Reg | Mem]) => operands[0].ty.bits() > operands[1].ty.bits(),
        (Imul, [Reg, Reg | Mem]) => true,
        (Shl | Shr | Sar, [Reg | Mem, Imm]) => true,
        (Shl | Shr | Sar, [Reg | Mem, Reg]) => operands[1].as_hw_reg() == Some(HwReg::Rcx),
        (Test, [Reg | Mem, Reg | Imm]) => true,
        (Mov | Add | Sub | And | Or | Xor | Cmp, [Mem, Mem]) => false,
        (Mov | Add | Sub | And | Or | Xor | Cmp, [Reg | Mem, Reg | Imm | Mem]) => true,
        _ => false,
    };
    ensure_invariant!(
        ok,
        "operands {:?} do not fit {}",
        operands,
        opcode.mnemonic()
    );
}
