//! # Tooloop Core
//!
//! Domain types, traits, and error definitions for the Tooloop agent runtime.
//! This crate has **zero framework dependencies**. It defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is defined as a trait here (`Tool`, `Provider`, `EventSink`).
//! Implementations live in their respective crates, so the agent loop can be
//! tested against scripted providers and isolated tool registries.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, RegistryError, Result, RunError, ToolError};
pub use event::{EventBus, EventSink, MultiSink, RunEvent, TerminationReason, TracingSink};
pub use message::{ConversationTurn, ToolCallRequest, ToolCallResult};
pub use provider::{ModelReply, Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use tool::{FieldKind, FieldSpec, InputSchema, Tool, ToolOutput, ToolRegistry, ToolSpec};
