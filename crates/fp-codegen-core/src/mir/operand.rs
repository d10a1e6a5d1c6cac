use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use super::{HwReg, MBlockId, MachineType};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("op{_0}")]
pub struct OperandId(pub u32);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("%v{_0}")]
pub struct VRegId(pub u32);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("stack{_0}")]
pub struct StackObjectId(pub u32);

/// Register usable as a memory base or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reg {
    Hw(HwReg),
    Virtual(VRegId),
}

/// `[base + index * scale + disp]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemRef {
    pub base: Reg,
    pub index: Option<Reg>,
    pub scale: u8,
    pub disp: i32,
}

impl MemRef {
    pub fn base(base: Reg) -> Self {
        Self {
            base,
            index: None,
            scale: 1,
            disp: 0,
        }
    }

    pub fn with_disp(mut self, disp: i32) -> Self {
        self.disp = disp;
        self
    }

    pub fn with_index(mut self, index: Reg, scale: u8) -> Self {
        ensure_invariant!(
            matches!(scale, 1 | 2 | 4 | 8),
            "memory operand scale {scale} is not 1, 2, 4 or 8"
        );
        self.index = Some(index);
        self.scale = scale;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandKind {
    HwReg(HwReg),
    VReg(VRegId),
    /// Frame slot whose final offset is chosen by frame layout.
    StackObject {
        id: StackObjectId,
        size: u64,
        align: u32,
    },
    Symbol(String),
    Imm(i64),
    Mem(MemRef),
    Block(MBlockId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineOperand {
    pub kind: OperandKind,
    pub ty: MachineType,
}

impl MachineOperand {
    pub fn is_register(&self) -> bool {
        matches!(self.kind, OperandKind::HwReg(_) | OperandKind::VReg(_))
    }

    pub fn is_imm(&self) -> bool {
        matches!(self.kind, OperandKind::Imm(_))
    }

    /// Operands that name memory: explicit references, frame slots and symbols.
    pub fn is_memory(&self) -> bool {
        matches!(
            self.kind,
            OperandKind::Mem(_) | OperandKind::StackObject { .. } | OperandKind::Symbol(_)
        )
    }

    pub fn is_label(&self) -> bool {
        matches!(self.kind, OperandKind::Block(_))
    }

    /// Operands whose value is an address that has to be formed with `lea`.
    pub fn needs_address(&self) -> bool {
        matches!(
            self.kind,
            OperandKind::StackObject { .. } | OperandKind::Symbol(_)
        )
    }

    pub fn as_reg(&self) -> Option<Reg> {
        match self.kind {
            OperandKind::HwReg(reg) => Some(Reg::Hw(reg)),
            OperandKind::VReg(vreg) => Some(Reg::Virtual(vreg)),
            _ => None,
        }
    }

    pub fn as_hw_reg(&self) -> Option<HwReg> {
        match self.kind {
            OperandKind::HwReg(reg) => Some(reg),
            _ => None,
        }
    }

    pub fn as_imm(&self) -> Option<i64> {
        match self.kind {
            OperandKind::Imm(value) => Some(value),
            _ => None,
        }
    }

    /// Immediates that a 32-bit sign-extended instruction field can encode.
    pub fn is_imm32(&self) -> bool {
        self.as_imm()
            .is_some_and(|value| i32::try_from(value).is_ok())
    }
}
