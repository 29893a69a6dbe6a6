//! Personal memory store for Tooloop.
//!
//! A small key-value store of facts about the user. One instance is built at
//! startup, wrapped in an `Arc`, and shared by every agent run.

pub mod store;

pub use store::{MemoryItem, MemoryStore};
