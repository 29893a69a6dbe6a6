//! The step-by-step view of a run.
//!
//! [`TurnStream`] is lazy: the run task is spawned on first poll. It is
//! finite and cannot be restarted. Dropping it aborts the task, which drops
//! any in-flight model call.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tooloop_core::message::ConversationTurn;

use crate::loop_runner::AgentLoop;
use crate::state::AgentRunState;

/// One observable step of a run, in order.
#[derive(Debug, Clone)]
pub enum RunStep {
    /// The model is about to be called. `iteration` is the number of tool
    /// rounds completed so far.
    ModelCalled { iteration: u32 },

    /// A turn was appended to the conversation.
    Turn(ConversationTurn),

    /// The run reached a terminal state. Always the last item.
    Finished(AgentRunState),
}

pub struct TurnStream {
    run_id: String,
    pending: Option<(Arc<AgentLoop>, AgentRunState)>,
    rx: Option<mpsc::UnboundedReceiver<RunStep>>,
    task: Option<JoinHandle<()>>,
}

impl TurnStream {
    pub(crate) fn new(agent: Arc<AgentLoop>, state: AgentRunState) -> Self {
        Self {
            run_id: state.run_id.clone(),
            pending: Some((agent, state)),
            rx: None,
            task: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn spawn(&mut self) {
        let Some((agent, state)) = self.pending.take() else {
            return;
        };
        let (tx, rx) = mpsc::unbounded_channel();
        self.task = Some(tokio::spawn(async move {
            agent
                .drive(state, move |step| {
                    // The receiver only goes away when the stream is dropped.
                    let _ = tx.send(step);
                })
                .await;
        }));
        self.rx = Some(rx);
    }
}

impl Stream for TurnStream {
    type Item = RunStep;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<RunStep>> {
        let this = self.get_mut();
        this.spawn();
        match this.rx.as_mut() {
            Some(rx) => rx.poll_recv(cx),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for TurnStream {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for TurnStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnStream")
            .field("run_id", &self.run_id)
            .field("started", &self.pending.is_none())
            .finish()
    }
}
