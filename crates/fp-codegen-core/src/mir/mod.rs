//! Machine IR for x86-64: target opcodes over still-virtual registers.
//!
//! Operands live in a per-function arena ([`MachineFunction`]) and are
//! referenced by [`OperandId`], so two uses of the same lowered value share
//! one operand.

use derive_more::Display;
use serde::{Deserialize, Serialize};

pub mod function;
pub mod inst;
pub mod module;
pub mod operand;
pub mod pretty;

pub use function::{FunctionFlags, MBlockId, MachineBlock, MachineFunction};
pub use inst::{MachineInst, MachineOpcode};
pub use module::{GlobalBuilder, MFuncId, MachineGlobal, MachineModule, Relocation};
pub use operand::{MachineOperand, MemRef, OperandId, OperandKind, Reg, StackObjectId, VRegId};

/// Storage class of a machine value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum MachineType {
    #[display("void")]
    Void,
    #[display("i8")]
    I8,
    #[display("i16")]
    I16,
    #[display("i32")]
    I32,
    #[display("i64")]
    I64,
    #[display("ptr")]
    Ptr,
    #[display("f32")]
    F32,
    #[display("f64")]
    F64,
}

impl MachineType {
    pub fn size_in_bytes(self) -> u32 {
        match self {
            MachineType::Void => 0,
            MachineType::I8 => 1,
            MachineType::I16 => 2,
            MachineType::I32 | MachineType::F32 => 4,
            MachineType::I64 | MachineType::Ptr | MachineType::F64 => 8,
        }
    }

    pub fn bits(self) -> u32 {
        self.size_in_bytes() * 8
    }

    pub fn is_float(self) -> bool {
        matches!(self, MachineType::F32 | MachineType::F64)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            MachineType::I8
                | MachineType::I16
                | MachineType::I32
                | MachineType::I64
                | MachineType::Ptr
        )
    }

    /// Integer class of exactly `bytes` bytes.
    pub fn integer_of_size(bytes: u64) -> Option<Self> {
        match bytes {
            1 => Some(MachineType::I8),
            2 => Some(MachineType::I16),
            4 => Some(MachineType::I32),
            8 => Some(MachineType::I64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HwReg {
    Rax,
    Rcx,
    Rdx,
    Rbx,
    Rsp,
    Rbp,
    Rsi,
    Rdi,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl HwReg {
    /// Assembly name of the register viewed at the width of `ty`.
    pub fn name(self, ty: MachineType) -> &'static str {
        const NAMES: [[&str; 4]; 16] = [
            ["rax", "eax", "ax", "al"],
            ["rcx", "ecx", "cx", "cl"],
            ["rdx", "edx", "dx", "dl"],
            ["rbx", "ebx", "bx", "bl"],
            ["rsp", "esp", "sp", "spl"],
            ["rbp", "ebp", "bp", "bpl"],
            ["rsi", "esi", "si", "sil"],
            ["rdi", "edi", "di", "dil"],
            ["r8", "r8d", "r8w", "r8b"],
            ["r9", "r9d", "r9w", "r9b"],
            ["r10", "r10d", "r10w", "r10b"],
            ["r11", "r11d", "r11w", "r11b"],
            ["r12", "r12d", "r12w", "r12b"],
            ["r13", "r13d", "r13w", "r13b"],
            ["r14", "r14d", "r14w", "r14b"],
            ["r15", "r15d", "r15w", "r15b"],
        ];
        let width = match ty {
            MachineType::I32 | MachineType::F32 => 1,
            MachineType::I16 => 2,
            MachineType::I8 => 3,
            _ => 0,
        };
        NAMES[self as usize][width]
    }
}

/// x86 condition codes as used by `setcc` and `jcc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum CondCode {
    #[display("e")]
    E,
    #[display("ne")]
    Ne,
    #[display("l")]
    L,
    #[display("le")]
    Le,
    #[display("g")]
    G,
    #[display("ge")]
    Ge,
    #[display("b")]
    B,
    #[display("be")]
    Be,
    #[display("a")]
    A,
    #[display("ae")]
    Ae,
}

impl CondCode {
    /// Condition that holds for `cmp b, a` exactly when `self` holds for `cmp a, b`.
    pub fn mirror(self) -> Self {
        match self {
            CondCode::E => CondCode::E,
            CondCode::Ne => CondCode::Ne,
            CondCode::L => CondCode::G,
            CondCode::Le => CondCode::Ge,
            CondCode::G => CondCode::L,
            CondCode::Ge => CondCode::Le,
            CondCode::B => CondCode::A,
            CondCode::Be => CondCode::Ae,
            CondCode::A => CondCode::B,
            CondCode::Ae => CondCode::Be,
        }
    }
}
