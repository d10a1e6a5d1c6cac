/// Return early with an [`Error::Unsupported`](crate::error::Error::Unsupported).
#[macro_export]
macro_rules! unsupported {
    ($($arg:tt)*) => {
        return Err($crate::error::Error::Unsupported(format!($($arg)*)))
    };
}

/// Abort on a broken IR or lowering invariant.
#[macro_export]
macro_rules! invariant {
    ($($arg:tt)*) => {
        panic!("invariant violation: {}", format_args!($($arg)*))
    };
}

/// Assert an IR or lowering invariant, with formatted message
#[macro_export]
macro_rules! ensure_invariant {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::invariant!($($arg)*);
        }
    };
}
