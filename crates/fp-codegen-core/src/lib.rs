#[macro_use]
pub mod macros;

pub mod error;
pub mod ir;
pub mod mir;
pub mod pretty;

// Re-export commonly used items for convenience
pub use tracing;

pub type Error = crate::error::Error;
pub type Result<T> = crate::error::Result<T>;
