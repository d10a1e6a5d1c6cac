use serde::{Deserialize, Serialize};

use super::ty::{StructTy, Ty};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructLayout {
    pub size: u64,
    pub align: u32,
    pub field_offsets: Vec<u64>,
}

pub fn size_of(ty: &Ty) -> u64 {
    match ty {
        Ty::Bool => 1,
        Ty::Int(int) => int.bits() as u64 / 8,
        Ty::Uint(uint) => uint.bits() as u64 / 8,
        Ty::F32 => 4,
        Ty::F64 => 8,
        Ty::Ptr(_) | Ty::Function(_) => 8,
        Ty::Array(elem, len) => size_of(elem).saturating_mul(*len),
        Ty::Struct(s) => struct_layout(s).size,
        Ty::Void | Ty::Type => 0,
    }
}

pub fn align_of(ty: &Ty) -> u32 {
    match ty {
        Ty::Bool => 1,
        Ty::Int(int) => int.bits() / 8,
        Ty::Uint(uint) => uint.bits() / 8,
        Ty::F32 => 4,
        Ty::F64 => 8,
        Ty::Ptr(_) | Ty::Function(_) => 8,
        Ty::Array(elem, _) => align_of(elem),
        Ty::Struct(s) => struct_layout(s).align,
        Ty::Void | Ty::Type => 1,
    }
}

/// C-style layout: members in order, each aligned to its natural alignment
/// unless the struct is packed, total size rounded up to the struct alignment.
pub fn struct_layout(ty: &StructTy) -> StructLayout {
    if ty.fields.is_empty() {
        return StructLayout {
            size: 0,
            align: 1,
            field_offsets: Vec::new(),
        };
    }

    let mut offsets = Vec::with_capacity(ty.fields.len());
    let mut offset = 0u64;
    let mut max_align = 1u32;

    for field in &ty.fields {
        let field_align = if ty.packed { 1 } else { align_of(field) };
        max_align = max_align.max(field_align);
        offset = align_to(offset, field_align as u64);
        offsets.push(offset);
        offset = offset.saturating_add(size_of(field));
    }

    let align = if ty.packed { 1 } else { max_align };
    StructLayout {
        size: align_to(offset, align as u64),
        align,
        field_offsets: offsets,
    }
}

pub fn align_to(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    let rem = value % alignment;
    if rem == 0 {
        value
    } else {
        value + (alignment - rem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_members_to_natural_alignment() {
        let ty = StructTy::new(vec![Ty::i8(), Ty::i32(), Ty::i16()]);
        let layout = struct_layout(&ty);
        assert_eq!(layout.field_offsets, vec![0, 4, 8]);
        assert_eq!(layout.size, 12);
        assert_eq!(layout.align, 4);
    }

    #[test]
    fn packed_struct_has_no_padding() {
        let mut ty = StructTy::new(vec![Ty::i8(), Ty::i64()]);
        ty.packed = true;
        let layout = struct_layout(&ty);
        assert_eq!(layout.field_offsets, vec![0, 1]);
        assert_eq!(layout.size, 9);
        assert_eq!(layout.align, 1);
    }

    #[test]
    fn nested_arrays_multiply_out() {
        let ty = Ty::array(Ty::array(Ty::i32(), 3), 4);
        assert_eq!(size_of(&ty), 48);
        assert_eq!(align_of(&ty), 4);
    }
}
