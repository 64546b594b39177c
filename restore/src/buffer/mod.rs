//! Low-level byte helpers used by the wire types.

pub mod hex;
pub mod length_prefixed;
