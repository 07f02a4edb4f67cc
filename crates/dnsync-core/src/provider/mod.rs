// # Provider Implementations
//
// Network-backed providers live in their own crates. This module holds the
// in-memory provider used by tests and local runs.

pub mod memory;

pub use memory::{Fault, MemoryProvider, ProviderCall};
