mod base;
mod replicator;

pub use base::*;
pub use replicator::*;
