use serde::{Deserialize, Serialize};

use super::layout::{self, StructLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntTy {
    I8,
    I16,
    I32,
    I64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UintTy {
    U8,
    U16,
    U32,
    U64,
}

impl IntTy {
    pub fn bits(self) -> u32 {
        match self {
            IntTy::I8 => 8,
            IntTy::I16 => 16,
            IntTy::I32 => 32,
            IntTy::I64 => 64,
        }
    }
}

impl UintTy {
    pub fn bits(self) -> u32 {
        match self {
            UintTy::U8 => 8,
            UintTy::U16 => 16,
            UintTy::U32 => 32,
            UintTy::U64 => 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructTy {
    pub name: Option<String>,
    pub fields: Vec<Ty>,
    pub packed: bool,
}

impl StructTy {
    pub fn new(fields: Vec<Ty>) -> Self {
        Self {
            name: None,
            fields,
            packed: false,
        }
    }

    pub fn named(name: impl Into<String>, fields: Vec<Ty>) -> Self {
        Self {
            name: Some(name.into()),
            fields,
            packed: false,
        }
    }

    pub fn layout(&self) -> StructLayout {
        layout::struct_layout(self)
    }

    /// Byte offset of every member, in declaration order.
    pub fn member_offsets(&self) -> Vec<u64> {
        self.layout().field_offsets
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FnSig {
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub is_variadic: bool,
}

impl FnSig {
    pub fn new(params: Vec<Ty>, ret: Ty) -> Self {
        Self {
            params,
            ret,
            is_variadic: false,
        }
    }

    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self
    }
}

/// Static type of a source IR value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ty {
    Void,
    Bool,
    Int(IntTy),
    Uint(UintTy),
    F32,
    F64,
    Ptr(Box<Ty>),
    Array(Box<Ty>, u64),
    Struct(StructTy),
    Function(Box<FnSig>),
    /// The type of a type; only meaningful to the frontend.
    Type,
}

impl Ty {
    pub fn i8() -> Self {
        Ty::Int(IntTy::I8)
    }
    pub fn i16() -> Self {
        Ty::Int(IntTy::I16)
    }
    pub fn i32() -> Self {
        Ty::Int(IntTy::I32)
    }
    pub fn i64() -> Self {
        Ty::Int(IntTy::I64)
    }
    pub fn u8() -> Self {
        Ty::Uint(UintTy::U8)
    }
    pub fn u16() -> Self {
        Ty::Uint(UintTy::U16)
    }
    pub fn u32() -> Self {
        Ty::Uint(UintTy::U32)
    }
    pub fn u64() -> Self {
        Ty::Uint(UintTy::U64)
    }

    pub fn ptr(pointee: Ty) -> Self {
        Ty::Ptr(Box::new(pointee))
    }

    pub fn array(element: Ty, len: u64) -> Self {
        Ty::Array(Box::new(element), len)
    }

    pub fn function(sig: FnSig) -> Self {
        Ty::Function(Box::new(sig))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Ty::Void)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Ty::Bool | Ty::Int(_) | Ty::Uint(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Ty::F32 | Ty::F64)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Ty::Ptr(_))
    }

    /// Signed integers compare, divide and shift as signed; everything else
    /// (unsigned, bool, pointers) is unsigned.
    pub fn is_signed(&self) -> bool {
        matches!(self, Ty::Int(_))
    }

    pub fn pointee(&self) -> Option<&Ty> {
        match self {
            Ty::Ptr(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructTy> {
        match self {
            Ty::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Signature of a function type or of a pointer to one.
    pub fn fn_sig(&self) -> Option<&FnSig> {
        match self {
            Ty::Function(sig) => Some(sig),
            Ty::Ptr(inner) => match inner.as_ref() {
                Ty::Function(sig) => Some(sig),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn size_in_bits(&self) -> Option<u32> {
        match self {
            Ty::Bool => Some(8),
            Ty::Int(int) => Some(int.bits()),
            Ty::Uint(uint) => Some(uint.bits()),
            Ty::F32 => Some(32),
            Ty::F64 | Ty::Ptr(_) => Some(64),
            _ => None,
        }
    }

    pub fn size_of(&self) -> u64 {
        layout::size_of(self)
    }

    pub fn align_of(&self) -> u32 {
        layout::align_of(self)
    }
}
