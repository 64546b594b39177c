//! Macros for building and returning [`crate::error::RestoreError`]s.

/// Creates a [`crate::error::RestoreError`] from an error kind, a static
/// description and an optional detail.
#[macro_export]
macro_rules! restore_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::RestoreError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::RestoreError::from(($kind, $desc, $detail.to_string()))
    };
}

/// Returns early with a [`crate::error::RestoreError`] built by [`restore_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return Err($crate::restore_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return Err($crate::restore_error!($kind, $desc, $detail))
    };
}
