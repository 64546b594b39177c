pub mod completion;
pub mod executor;
