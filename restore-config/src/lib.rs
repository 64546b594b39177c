//! Configuration management for log restore services.
//!
//! Provides environment detection, configuration loading from YAML files and
//! shared configuration types for the replication driver.

mod environment;
mod load;
pub mod shared;

pub use environment::*;
pub use load::*;
