//! In-memory renditions of the external collaborators (ledger, topics,
//! relational store) for local use and tests.

pub mod memory;

pub use memory::{MemoryLedger, MemoryStore, MemoryTopics};
