//! Response Assembler: turns a run into the caller's string and reports
//! lifecycle events on the way.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tooloop_core::error::RunError;
use tooloop_core::event::{EventSink, TerminationReason};
use tooloop_core::message::ConversationTurn;

use crate::state::{AgentRunState, RunStatus};
use crate::stream::{RunStep, TurnStream};

/// Returned when the run finished but produced no text.
pub const COULD_NOT_PROCESS: &str = "I couldn't process that request.";

/// Returned for every run-fatal failure.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

pub struct ResponseAssembler {
    sink: Arc<dyn EventSink>,
}

impl ResponseAssembler {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Consume the stream to its end, emitting one event per transition.
    ///
    /// A stream that ends without [`RunStep::Finished`] yields a cancelled
    /// state. A capability abort is not reported as terminated: the request
    /// continues on the direct path, which reports the termination itself.
    pub async fn collect(&self, mut stream: TurnStream) -> AgentRunState {
        let run_id = stream.run_id().to_string();
        let mut conversation = Vec::new();
        let mut iterations = 0;

        while let Some(step) = stream.next().await {
            match step {
                RunStep::ModelCalled { iteration } => {
                    iterations = iteration;
                    self.sink.model_called(&run_id, iteration);
                }
                RunStep::Turn(turn) => {
                    self.observe_turn(&run_id, &turn);
                    conversation.push(turn);
                }
                RunStep::Finished(state) => {
                    if !matches!(state.status, RunStatus::Aborted(RunError::ModelCapability(_))) {
                        self.sink.run_terminated(
                            &run_id,
                            state.termination_reason(),
                            state.iterations,
                        );
                    }
                    return state;
                }
            }
        }

        let mut state = AgentRunState::new(run_id, conversation);
        state.iterations = iterations;
        state.status = RunStatus::Aborted(RunError::Cancelled);
        self.sink
            .run_terminated(&state.run_id, TerminationReason::Cancelled, iterations);
        state
    }

    fn observe_turn(&self, run_id: &str, turn: &ConversationTurn) {
        match turn {
            ConversationTurn::Assistant { tool_calls, .. } => {
                for call in tool_calls {
                    self.sink.tool_invoked(run_id, &call.id, &call.name);
                }
            }
            ConversationTurn::Tool(result) => {
                self.sink
                    .tool_completed(run_id, &result.call_id, &result.tool_name, result.success);
            }
            ConversationTurn::System { .. } | ConversationTurn::User { .. } => {}
        }
    }

    /// The caller-facing string for a terminal state.
    pub fn render(&self, state: &AgentRunState) -> String {
        match &state.status {
            RunStatus::Done { answer } => non_empty_or_default(answer),
            RunStatus::Running | RunStatus::Aborted(_) => APOLOGY.to_string(),
        }
    }

    /// Run the direct path under `run_id`, reporting its single model call
    /// and its termination.
    pub async fn assemble_fallback<F>(&self, run_id: &str, direct: F) -> String
    where
        F: Future<Output = Result<String, RunError>>,
    {
        self.sink.model_called(run_id, 0);
        match direct.await {
            Ok(text) => {
                self.sink.run_terminated(run_id, TerminationReason::Fallback, 0);
                non_empty_or_default(&text)
            }
            Err(e) => {
                let reason = match e {
                    RunError::ModelTimeout { .. } => TerminationReason::ModelTimeout,
                    RunError::ModelCapability(_) => TerminationReason::ModelCapability,
                    RunError::Cancelled => TerminationReason::Cancelled,
                    _ => TerminationReason::ModelUnavailable,
                };
                self.sink.run_terminated(run_id, reason, 0);
                APOLOGY.to_string()
            }
        }
    }
}

fn non_empty_or_default(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        COULD_NOT_PROCESS.to_string()
    } else {
        text.to_string()
    }
}
