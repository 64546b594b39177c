//! Tracing set-up shared by log restore binaries and tests.

mod tracing;

pub use crate::tracing::*;
