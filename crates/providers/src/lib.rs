//! LLM Provider implementations for Tooloop.
//!
//! All providers implement the `tooloop_core::Provider` trait.
//! [`build_from_config`] picks the endpoint from configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_from_config, default_base_url};
