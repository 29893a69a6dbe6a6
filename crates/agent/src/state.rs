//! Per-run state owned by one agent loop run.

use tooloop_core::error::RunError;
use tooloop_core::event::TerminationReason;
use tooloop_core::message::ConversationTurn;

/// Where a run currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Still waiting on the model or on tools.
    Running,

    /// The model answered without requesting tools.
    Done { answer: String },

    /// The run failed and will not produce an answer.
    Aborted(RunError),
}

/// The conversation so far, the round counter and the terminal outcome.
///
/// The loop only ever appends to `conversation`.
#[derive(Debug, Clone)]
pub struct AgentRunState {
    pub run_id: String,
    pub conversation: Vec<ConversationTurn>,
    /// Completed tool rounds.
    pub iterations: u32,
    pub status: RunStatus,
}

impl AgentRunState {
    pub fn new(run_id: impl Into<String>, conversation: Vec<ConversationTurn>) -> Self {
        Self {
            run_id: run_id.into(),
            conversation,
            iterations: 0,
            status: RunStatus::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, RunStatus::Running)
    }

    pub fn final_answer(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Done { answer } => Some(answer),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RunError> {
        match &self.status {
            RunStatus::Aborted(e) => Some(e),
            _ => None,
        }
    }

    /// The reason reported in `run_terminated`. A run that never reached a
    /// terminal state counts as cancelled.
    pub fn termination_reason(&self) -> TerminationReason {
        match &self.status {
            RunStatus::Done { .. } => TerminationReason::Completed,
            RunStatus::Running | RunStatus::Aborted(RunError::Cancelled) => {
                TerminationReason::Cancelled
            }
            RunStatus::Aborted(RunError::ModelCapability(_)) => TerminationReason::ModelCapability,
            RunStatus::Aborted(RunError::ModelUnavailable(_)) => TerminationReason::ModelUnavailable,
            RunStatus::Aborted(RunError::ModelTimeout { .. }) => TerminationReason::ModelTimeout,
            RunStatus::Aborted(RunError::IterationCapExceeded { .. }) => {
                TerminationReason::IterationCap
            }
        }
    }

    pub(crate) fn push(&mut self, turn: ConversationTurn) {
        self.conversation.push(turn);
    }
}
