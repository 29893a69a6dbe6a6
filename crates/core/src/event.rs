//! Run lifecycle events.
//!
//! One event is emitted per transition of an agent run. Sinks decide what
//! to do with them: log through `tracing`, fan out to SSE subscribers, or both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Completed,
    Fallback,
    IterationCap,
    ModelUnavailable,
    ModelTimeout,
    ModelCapability,
    Cancelled,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Fallback => "fallback",
            Self::IterationCap => "iteration_cap",
            Self::ModelUnavailable => "model_unavailable",
            Self::ModelTimeout => "model_timeout",
            Self::ModelCapability => "model_capability",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All lifecycle events of an agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// The model is about to be called
    ModelCalled {
        run_id: String,
        iteration: u32,
        timestamp: DateTime<Utc>,
    },

    /// A tool request is about to be dispatched
    ToolInvoked {
        run_id: String,
        call_id: String,
        tool_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool request produced its result
    ToolCompleted {
        run_id: String,
        call_id: String,
        tool_name: String,
        success: bool,
        timestamp: DateTime<Utc>,
    },

    /// The run reached a terminal state
    RunTerminated {
        run_id: String,
        reason: TerminationReason,
        iterations: u32,
        timestamp: DateTime<Utc>,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> &str {
        match self {
            Self::ModelCalled { run_id, .. }
            | Self::ToolInvoked { run_id, .. }
            | Self::ToolCompleted { run_id, .. }
            | Self::RunTerminated { run_id, .. } => run_id,
        }
    }

    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ModelCalled { .. } => "model_called",
            Self::ToolInvoked { .. } => "tool_invoked",
            Self::ToolCompleted { .. } => "tool_completed",
            Self::RunTerminated { .. } => "run_terminated",
        }
    }
}

/// Receives run lifecycle events. One method per transition.
pub trait EventSink: Send + Sync {
    fn model_called(&self, run_id: &str, iteration: u32);
    fn tool_invoked(&self, run_id: &str, call_id: &str, tool_name: &str);
    fn tool_completed(&self, run_id: &str, call_id: &str, tool_name: &str, success: bool);
    fn run_terminated(&self, run_id: &str, reason: TerminationReason, iterations: u32);
}

/// Writes lifecycle events to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn model_called(&self, run_id: &str, iteration: u32) {
        info!(run_id, iteration, "Calling model");
    }

    fn tool_invoked(&self, run_id: &str, call_id: &str, tool_name: &str) {
        info!(run_id, call_id, tool = tool_name, "Invoking tool");
    }

    fn tool_completed(&self, run_id: &str, call_id: &str, tool_name: &str, success: bool) {
        if success {
            info!(run_id, call_id, tool = tool_name, "Tool completed");
        } else {
            warn!(run_id, call_id, tool = tool_name, "Tool returned a failure");
        }
    }

    fn run_terminated(&self, run_id: &str, reason: TerminationReason, iterations: u32) {
        match reason {
            TerminationReason::Completed | TerminationReason::Fallback => {
                info!(run_id, %reason, iterations, "Run finished");
            }
            _ => warn!(run_id, %reason, iterations, "Run aborted"),
        }
    }
}

/// A broadcast-based event bus for run events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// The gateway's SSE endpoint subscribes here.
pub struct EventBus {
    sender: broadcast::Sender<Arc<RunEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: RunEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RunEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for EventBus {
    fn model_called(&self, run_id: &str, iteration: u32) {
        self.publish(RunEvent::ModelCalled {
            run_id: run_id.into(),
            iteration,
            timestamp: Utc::now(),
        });
    }

    fn tool_invoked(&self, run_id: &str, call_id: &str, tool_name: &str) {
        self.publish(RunEvent::ToolInvoked {
            run_id: run_id.into(),
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            timestamp: Utc::now(),
        });
    }

    fn tool_completed(&self, run_id: &str, call_id: &str, tool_name: &str, success: bool) {
        self.publish(RunEvent::ToolCompleted {
            run_id: run_id.into(),
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            success,
            timestamp: Utc::now(),
        });
    }

    fn run_terminated(&self, run_id: &str, reason: TerminationReason, iterations: u32) {
        self.publish(RunEvent::RunTerminated {
            run_id: run_id.into(),
            reason,
            iterations,
            timestamp: Utc::now(),
        });
    }
}

/// Forwards every event to each inner sink, in order.
#[derive(Clone, Default)]
pub struct MultiSink(pub Vec<Arc<dyn EventSink>>);

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.0.push(sink);
        self
    }
}

impl EventSink for MultiSink {
    fn model_called(&self, run_id: &str, iteration: u32) {
        for sink in &self.0 {
            sink.model_called(run_id, iteration);
        }
    }

    fn tool_invoked(&self, run_id: &str, call_id: &str, tool_name: &str) {
        for sink in &self.0 {
            sink.tool_invoked(run_id, call_id, tool_name);
        }
    }

    fn tool_completed(&self, run_id: &str, call_id: &str, tool_name: &str, success: bool) {
        for sink in &self.0 {
            sink.tool_completed(run_id, call_id, tool_name, success);
        }
    }

    fn run_terminated(&self, run_id: &str, reason: TerminationReason, iterations: u32) {
        for sink in &self.0 {
            sink.run_terminated(run_id, reason, iterations);
        }
    }
}
