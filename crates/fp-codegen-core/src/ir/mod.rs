//! Target-independent SSA IR consumed by instruction selection.
//!
//! Every node lives in an arena owned by [`Module`] and is addressed by a
//! stable integer id, so identity maps in later stages key on ids rather than
//! on addresses.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

pub mod builder;
pub mod layout;
pub mod ty;

pub use builder::Builder;
pub use layout::StructLayout;
pub use ty::{FnSig, IntTy, StructTy, Ty, UintTy};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("%{_0}")]
pub struct ValueId(pub u32);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("inst{_0}")]
pub struct InstId(pub u32);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("bb{_0}")]
pub struct BlockId(pub u32);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("fn{_0}")]
pub struct FuncId(pub u32);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[display("global{_0}")]
pub struct GlobalId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Null,
    Undef,
    /// All-zero value of the constant's type.
    Zero,
    /// Raw bytes, e.g. a string literal.
    Bytes(Vec<u8>),
    /// Struct members or array elements, in order.
    Aggregate(Vec<ValueId>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueKind {
    Instruction(InstId),
    Argument { func: FuncId, index: u32 },
    Constant(Constant),
    Function(FuncId),
    Global(GlobalId),
    Block(BlockId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueData {
    pub ty: Ty,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpPredicate {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Operand conventions:
/// - binary ops, `Cmp`: `[lhs, rhs]`
/// - `Alloca`: `[]` or `[count]`, result type is a pointer to the allocated type
/// - `Load`: `[ptr]`; `Store`: `[value, ptr]`
/// - `Gep`: `[base, index...]`
/// - `Phi`: `[value0, block0, value1, block1, ...]`
/// - `Call`: `[callee, args...]`
/// - casts: `[value]`, target type is the result type
/// - `Br`: `[target]`; `CondBr`: `[cond, if_true, if_false]`; `Ret`: `[]` or `[value]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Cmp(CmpPredicate),
    Alloca,
    Load,
    Store,
    Gep,
    Phi,
    Call,
    Trunc,
    ZExt,
    SExt,
    PtrToInt,
    IntToPtr,
    Bitcast,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FpToSi,
    SiToFp,
    FpExt,
    FpTrunc,
    Br,
    CondBr,
    Ret,
}

impl Opcode {
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Br | Opcode::CondBr | Opcode::Ret)
    }

    pub fn is_float_op(self) -> bool {
        matches!(
            self,
            Opcode::FAdd
                | Opcode::FSub
                | Opcode::FMul
                | Opcode::FDiv
                | Opcode::FpToSi
                | Opcode::SiToFp
                | Opcode::FpExt
                | Opcode::FpTrunc
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstData {
    pub opcode: Opcode,
    pub operands: Vec<ValueId>,
    pub ty: Ty,
    pub block: BlockId,
    pub value: ValueId,
}

impl InstData {
    /// `(value, predecessor)` pairs of a phi.
    pub fn phi_incoming(&self) -> impl Iterator<Item = (ValueId, ValueId)> + '_ {
        ensure_invariant!(
            self.opcode == Opcode::Phi && self.operands.len() % 2 == 0,
            "{} is not a well-formed phi",
            self.value
        );
        self.operands.chunks(2).map(|pair| (pair[0], pair[1]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    pub func: FuncId,
    pub name: Option<String>,
    pub insts: Vec<InstId>,
    pub value: ValueId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionData {
    pub name: String,
    pub sig: FnSig,
    pub params: Vec<ValueId>,
    pub blocks: Vec<BlockId>,
    /// Declared without a body.
    pub is_external: bool,
    pub value: ValueId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalData {
    pub name: String,
    /// Type of the stored object, not of the symbol (which is a pointer).
    pub ty: Ty,
    pub initializer: Option<ValueId>,
    pub alignment: Option<u32>,
    pub value: ValueId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    values: Vec<ValueData>,
    insts: Vec<InstData>,
    blocks: Vec<BlockData>,
    functions: Vec<FunctionData>,
    globals: Vec<GlobalData>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn value(&self, id: ValueId) -> &ValueData {
        self.values
            .get(id.0 as usize)
            .unwrap_or_else(|| invariant!("dangling value id {id}"))
    }

    pub fn value_ty(&self, id: ValueId) -> &Ty {
        &self.value(id).ty
    }

    pub fn inst(&self, id: InstId) -> &InstData {
        self.insts
            .get(id.0 as usize)
            .unwrap_or_else(|| invariant!("dangling instruction id {id}"))
    }

    pub fn block(&self, id: BlockId) -> &BlockData {
        self.blocks
            .get(id.0 as usize)
            .unwrap_or_else(|| invariant!("dangling block id {id}"))
    }

    pub fn function(&self, id: FuncId) -> &FunctionData {
        self.functions
            .get(id.0 as usize)
            .unwrap_or_else(|| invariant!("dangling function id {id}"))
    }

    pub fn global(&self, id: GlobalId) -> &GlobalData {
        self.globals
            .get(id.0 as usize)
            .unwrap_or_else(|| invariant!("dangling global id {id}"))
    }

    /// Functions in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &FunctionData)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(idx, func)| (FuncId(idx as u32), func))
    }

    /// Global variables in declaration order.
    pub fn globals(&self) -> impl Iterator<Item = (GlobalId, &GlobalData)> {
        self.globals
            .iter()
            .enumerate()
            .map(|(idx, global)| (GlobalId(idx as u32), global))
    }

    /// Block referenced by a block-valued operand.
    pub fn block_of(&self, value: ValueId) -> BlockId {
        match self.value(value).kind {
            ValueKind::Block(block) => block,
            ref other => invariant!("{value} is not a block reference: {other:?}"),
        }
    }

    pub fn constant_int(&self, value: ValueId) -> Option<i64> {
        match self.value(value).kind {
            ValueKind::Constant(Constant::Int(v)) => Some(v),
            ValueKind::Constant(Constant::Null | Constant::Zero) => Some(0),
            _ => None,
        }
    }

    fn push_value(&mut self, ty: Ty, kind: ValueKind) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(ValueData { ty, kind });
        id
    }
}
