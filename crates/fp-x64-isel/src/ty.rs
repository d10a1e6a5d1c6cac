//! IR type to machine storage class.

use fp_codegen_core::ir::Ty;
use fp_codegen_core::mir::MachineType;
use fp_codegen_core::{unsupported, Result};

/// Storage class of `ty`.
///
/// Structs that fit a register exactly travel as the integer of their size;
/// any other struct is handled through a pointer.
pub fn lower_type(ty: &Ty) -> Result<MachineType> {
    let lowered = match ty {
        Ty::Void => MachineType::Void,
        Ty::Bool => MachineType::I8,
        Ty::Int(_) | Ty::Uint(_) => {
            let bits = ty.size_in_bits().unwrap_or_default();
            match MachineType::integer_of_size(u64::from(bits / 8)) {
                Some(class) => class,
                None => unsupported!("integer width {bits}"),
            }
        }
        Ty::F32 => MachineType::F32,
        Ty::F64 => MachineType::F64,
        Ty::Ptr(_) => MachineType::Ptr,
        Ty::Struct(_) => MachineType::integer_of_size(ty.size_of()).unwrap_or(MachineType::Ptr),
        Ty::Array(..) => unsupported!("array values have no machine type"),
        Ty::Function(_) => unsupported!("function values have no machine type"),
        Ty::Type => unsupported!("type values have no machine type"),
    };
    Ok(lowered)
}

/// Storage class of a value the integer pipeline handles.
pub fn scalar_type(ty: &Ty, what: &str) -> Result<MachineType> {
    let lowered = lower_type(ty)?;
    if lowered.is_float() {
        unsupported!("floating-point {what}");
    }
    Ok(lowered)
}

/// Like [`scalar_type`], for values that are copied whole through a register.
pub fn by_value_type(ty: &Ty, what: &str) -> Result<MachineType> {
    let lowered = scalar_type(ty, what)?;
    if let Ty::Struct(s) = ty {
        if MachineType::integer_of_size(ty.size_of()).is_none() {
            let name = s.name.as_deref().unwrap_or("<anonymous>");
            unsupported!("struct {name} of {} bytes as {what} by value", ty.size_of());
        }
    }
    Ok(lowered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_codegen_core::ir::{FnSig, StructTy};

    #[test]
    fn integers_map_by_width() {
        assert_eq!(lower_type(&Ty::Bool).unwrap(), MachineType::I8);
        assert_eq!(lower_type(&Ty::u16()).unwrap(), MachineType::I16);
        assert_eq!(lower_type(&Ty::i32()).unwrap(), MachineType::I32);
        assert_eq!(lower_type(&Ty::u64()).unwrap(), MachineType::I64);
        assert_eq!(lower_type(&Ty::ptr(Ty::i8())).unwrap(), MachineType::Ptr);
        assert_eq!(lower_type(&Ty::Void).unwrap(), MachineType::Void);
    }

    #[test]
    fn small_structs_become_integers() {
        let pair = Ty::Struct(StructTy::new(vec![Ty::i32(), Ty::i32()]));
        assert_eq!(lower_type(&pair).unwrap(), MachineType::I64);

        let odd = Ty::Struct(StructTy::new(vec![Ty::i8(), Ty::i8(), Ty::i8()]));
        assert_eq!(lower_type(&odd).unwrap(), MachineType::Ptr);

        let big = Ty::Struct(StructTy::new(vec![Ty::i64(), Ty::i64()]));
        assert_eq!(lower_type(&big).unwrap(), MachineType::Ptr);
        assert!(by_value_type(&big, "argument").unwrap_err().is_unsupported());
    }

    #[test]
    fn rejects_types_without_a_class() {
        assert!(lower_type(&Ty::array(Ty::i8(), 4)).unwrap_err().is_unsupported());
        let func = Ty::function(FnSig::new(vec![], Ty::Void));
        assert!(lower_type(&func).unwrap_err().is_unsupported());
        assert!(scalar_type(&Ty::F64, "operand").unwrap_err().is_unsupported());
        assert_eq!(lower_type(&Ty::F32).unwrap(), MachineType::F32);
    }
}
