use std::collections::TryReserveError;
use std::result;
use thiserror::Error;

/// Failures that abort lowering of a whole module.
///
/// Broken IR invariants are not represented here: they panic through
/// [`invariant!`](crate::invariant) because continuing would produce wrong
/// machine code.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported feature: {0}")]
    Unsupported(String),
    #[error("allocation failure: {0}")]
    Allocation(String),
    #[error("Generic error: {0}")]
    Generic(String),
}

impl Error {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }
}

pub type Result<T> = result::Result<T, Error>;

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Self {
        Error::Allocation(err.to_string())
    }
}

// Convert from eyre::Report to our Error type
impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Generic(e.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Generic(e.to_string())
    }
}

/// Push onto an arena, surfacing allocator exhaustion as [`Error::Allocation`]
/// instead of aborting.
pub fn try_push<T>(items: &mut Vec<T>, item: T) -> Result<usize> {
    items.try_reserve(1)?;
    let index = items.len();
    items.push(item);
    Ok(index)
}
