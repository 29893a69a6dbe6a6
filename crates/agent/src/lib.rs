//! The agent loop: the heart of Tooloop.
//!
//! The agent follows a **Think → Act → Observe** cycle:
//!
//! 1. **Seed** the run with the tool-usage instruction and the user's message
//! 2. **Send to the model** via the [`ModelGateway`], advertising every tool
//! 3. **If tool calls**: run them through the registry, append the results,
//!    loop back to step 2
//! 4. **If text**: that is the final answer
//!
//! The loop stops at the first text-only reply, or aborts at the iteration
//! cap or on a failed model call. Models that cannot call tools skip the loop
//! and go through the [`FallbackDispatcher`]. The [`ResponseAssembler`] turns
//! either outcome into the string returned to the caller.

pub mod assembler;
pub mod fallback;
pub mod loop_runner;
pub mod model;
pub mod prompt;
pub mod service;
pub mod state;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assembler::{APOLOGY, COULD_NOT_PROCESS, ResponseAssembler};
pub use fallback::FallbackDispatcher;
pub use loop_runner::AgentLoop;
pub use model::ModelGateway;
pub use service::{AgentService, ServiceError};
pub use state::{AgentRunState, RunStatus};
pub use stream::{RunStep, TurnStream};
