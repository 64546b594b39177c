pub mod replicator;
