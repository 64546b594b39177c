//! Value types exchanged between the replication driver and its collaborators.

mod position;
mod replication;

pub use position::*;
pub use replication::*;
