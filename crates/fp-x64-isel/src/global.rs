use fp_codegen_core::ir::{Constant, GlobalId, Module, Ty, ValueId, ValueKind};
use fp_codegen_core::mir::GlobalBuilder;
use fp_codegen_core::{ensure_invariant, invariant, Result};
use tracing::debug;

use crate::config::LoweringConfig;
use crate::context::LoweringContext;

const POINTER_SIZE: u64 = 8;

impl LoweringContext<'_> {
    /// Emit a global's initial bytes and relocations.
    pub fn lower_global(&mut self, global: GlobalId) -> Result<()> {
        let module = self.module;
        let data = module.global(global);
        let align = data.alignment.unwrap_or_else(|| data.ty.align_of());
        debug!(global = %data.name, align, "lowering global");

        let mut builder = self.output.begin_global(data.name.clone(), align);
        match data.initializer {
            Some(init) => append_constant(module, &self.config, &mut builder, init, &data.ty)?,
            None => {
                builder.append_zeros(data.ty.size_of())?;
            }
        }
        builder.finish()
    }
}

/// Append the bytes of `value` viewed as `ty`, padded to `ty`'s size.
fn append_constant(
    module: &Module,
    config: &LoweringConfig,
    builder: &mut GlobalBuilder<'_>,
    value: ValueId,
    ty: &Ty,
) -> Result<()> {
    let start = builder.len();
    let size = ty.size_of();
    match &module.value(value).kind {
        ValueKind::Constant(constant) => match constant {
            Constant::Null | Constant::Zero | Constant::Undef => {
                builder.append_zeros(size)?;
            }
            Constant::Int(v) => {
                let bytes = v.to_le_bytes();
                let width = usize::try_from(size).unwrap_or(usize::MAX).min(bytes.len());
                builder.append_data(&bytes[..width])?;
            }
            Constant::Float(v) => match ty {
                Ty::F32 => {
                    builder.append_data(&(*v as f32).to_le_bytes())?;
                }
                _ => {
                    builder.append_data(&v.to_le_bytes())?;
                }
            },
            Constant::Bytes(bytes) => {
                ensure_invariant!(
                    bytes.len() as u64 <= size,
                    "{} bytes do not fit a {size}-byte {value}",
                    bytes.len()
                );
                builder.append_data(bytes)?;
            }
            Constant::Aggregate(elements) => {
                append_aggregate(module, config, builder, value, elements, ty)?;
            }
        },
        ValueKind::Function(func) => {
            let symbol = config.symbol_name(&module.function(*func).name)?;
            append_pointer(builder, symbol)?;
        }
        ValueKind::Global(global) => {
            append_pointer(builder, module.global(*global).name.clone())?;
        }
        other => invariant!("{value} is not a constant initializer: {other:?}"),
    }
    pad_to(builder, start + size)
}

fn append_aggregate(
    module: &Module,
    config: &LoweringConfig,
    builder: &mut GlobalBuilder<'_>,
    value: ValueId,
    elements: &[ValueId],
    ty: &Ty,
) -> Result<()> {
    let start = builder.len();
    match ty {
        Ty::Struct(s) => {
            ensure_invariant!(
                elements.len() == s.fields.len(),
                "{value} has {} members for {} fields",
                elements.len(),
                s.fields.len()
            );
            let offsets = s.member_offsets();
            for ((element, field), offset) in elements.iter().zip(&s.fields).zip(offsets) {
                pad_to(builder, start + offset)?;
                append_constant(module, config, builder, *element, field)?;
            }
        }
        Ty::Array(element_ty, len) => {
            ensure_invariant!(
                elements.len() as u64 == *len,
                "{value} has {} elements for length {len}",
                elements.len()
            );
            let stride = element_ty.size_of();
            for (index, element) in elements.iter().enumerate() {
                pad_to(builder, start + stride * index as u64)?;
                append_constant(module, config, builder, *element, element_ty)?;
            }
        }
        other => invariant!("aggregate {value} has non-aggregate type {other:?}"),
    }
    Ok(())
}

/// Zero placeholder word, patched with `symbol`'s address at link time.
fn append_pointer(builder: &mut GlobalBuilder<'_>, symbol: String) -> Result<()> {
    let offset = builder.append_zeros(POINTER_SIZE)?;
    builder.add_relocation(offset, symbol)
}

fn pad_to(builder: &mut GlobalBuilder<'_>, end: u64) -> Result<()> {
    let len = builder.len();
    ensure_invariant!(len <= end, "initializer overruns its slot ({len} > {end})");
    if len < end {
        builder.append_zeros(end - len)?;
    }
    Ok(())
}
