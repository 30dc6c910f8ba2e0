//! Item Transform Pipeline
//!
//! The algorithmic heart of the tool. Connects fetched source items to
//! created destination items:
//!
//! 1. **Dedupe**: drop later records that repeat a selector field value
//! 2. **Filter**: keep only records matching every configured predicate
//! 3. **Clone**: remap source fields onto the destination schema by type
//! 4. **Task**: derive a follow-up task from each created record

pub mod migrate;
pub mod tasks;
pub mod transform;
pub mod types;

// Re-export the batch entry point for convenient access
pub use migrate::Migrator;
