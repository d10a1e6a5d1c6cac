use fp_codegen_core::mir::HwReg;
use fp_codegen_core::{unsupported, Result};
use serde::{Deserialize, Serialize};

/// Runtime routines that intrinsic calls are redirected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeSymbol {
    MemSet,
    MemCpy,
    MemMove,
}

impl RuntimeSymbol {
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeSymbol::MemSet => "memset",
            RuntimeSymbol::MemCpy => "memcpy",
            RuntimeSymbol::MemMove => "memmove",
        }
    }

    /// Runtime routine behind an intrinsic, keyed by the name after the marker.
    pub fn from_intrinsic(stem: &str) -> Option<Self> {
        match stem {
            "memset" => Some(RuntimeSymbol::MemSet),
            "memcpy" => Some(RuntimeSymbol::MemCpy),
            "memmove" => Some(RuntimeSymbol::MemMove),
            _ => None,
        }
    }
}

/// ABI facts and naming rules of the Windows x64 target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoweringConfig {
    /// Integer/pointer argument registers, in parameter order.
    pub arg_registers: Vec<HwReg>,
    pub return_register: HwReg,
    pub frame_base: HwReg,
    /// Displacement of the first shadow slot from the frame base: saved
    /// frame pointer plus return address.
    pub shadow_space_offset: i32,
    pub shadow_slot_size: i32,
    /// Outgoing space every call site reserves, even with fewer arguments.
    pub min_call_stack: u32,
    pub intrinsic_prefix: String,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        Self::win64()
    }
}

impl LoweringConfig {
    pub fn win64() -> Self {
        Self {
            arg_registers: vec![HwReg::Rcx, HwReg::Rdx, HwReg::R8, HwReg::R9],
            return_register: HwReg::Rax,
            frame_base: HwReg::Rbp,
            shadow_space_offset: 16,
            shadow_slot_size: 8,
            min_call_stack: 32,
            intrinsic_prefix: "__builtin_".to_string(),
        }
    }

    pub fn with_intrinsic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.intrinsic_prefix = prefix.into();
        self
    }

    pub fn with_shadow_space_offset(mut self, offset: i32) -> Self {
        self.shadow_space_offset = offset;
        self
    }

    pub fn max_register_args(&self) -> usize {
        self.arg_registers.len()
    }

    /// Frame-base displacement of the shadow slot mirroring argument `index`.
    pub fn shadow_slot_disp(&self, index: usize) -> i32 {
        self.shadow_space_offset + self.shadow_slot_size * index as i32
    }

    /// Bytes of outgoing stack a call with `arg_count` arguments reserves.
    pub fn call_stack_size(&self, arg_count: usize) -> u32 {
        let needed = arg_count as u32 * self.shadow_slot_size as u32;
        needed.max(self.min_call_stack)
    }

    pub fn is_intrinsic(&self, name: &str) -> bool {
        !self.intrinsic_prefix.is_empty() && name.starts_with(&self.intrinsic_prefix)
    }

    /// Linker-visible name for a function or global, redirecting intrinsics
    /// to their runtime routine.
    pub fn symbol_name(&self, name: &str) -> Result<String> {
        if !self.is_intrinsic(name) {
            return Ok(name.to_string());
        }
        let stem = &name[self.intrinsic_prefix.len()..];
        match RuntimeSymbol::from_intrinsic(stem) {
            Some(symbol) => Ok(symbol.as_str().to_string()),
            None => unsupported!("intrinsic `{name}` has no runtime routine"),
        }
    }
}
