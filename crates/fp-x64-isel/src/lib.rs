//! Instruction selection from the SSA IR to x86-64 machine IR under the
//! Windows x64 calling convention.
//!
//! [`lower_module`] lowers every global variable and then every function of
//! a module, in declaration order. Functions are lowered in two passes:
//! instructions first, then phi copies into predecessor blocks.

pub mod config;
pub mod context;
pub mod driver;
pub mod ty;

mod function;
mod global;
mod operand;
mod phi;
mod select;

pub use config::{LoweringConfig, RuntimeSymbol};
pub use context::LoweringContext;
pub use driver::{lower_module, X64Lowering};
pub use fp_codegen_core::{Error, Result};
