//! The inbound operation: one user message in, one user-safe string out.

use std::sync::Arc;

use tooloop_config::AppConfig;
use tooloop_core::error::{ProviderError, RunError};
use tooloop_core::event::{EventBus, EventSink, MultiSink, TracingSink};
use tooloop_core::tool::ToolRegistry;
use tooloop_memory::MemoryStore;
use tooloop_tools::SetupError;
use tracing::{info, warn};

use crate::assembler::{COULD_NOT_PROCESS, ResponseAssembler};
use crate::fallback::FallbackDispatcher;
use crate::loop_runner::AgentLoop;
use crate::model::ModelGateway;
use crate::state::RunStatus;

/// Errors wiring the service from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Tools(#[from] SetupError),
}

/// Picks the loop or the direct path per request and renders the outcome.
pub struct AgentService {
    agent: Arc<AgentLoop>,
    fallback: FallbackDispatcher,
    assembler: ResponseAssembler,
    events: Arc<EventBus>,
    memory: Arc<MemoryStore>,
}

impl AgentService {
    pub fn new(
        agent: AgentLoop,
        events: Arc<EventBus>,
        sink: Arc<dyn EventSink>,
        memory: Arc<MemoryStore>,
    ) -> Self {
        let fallback = FallbackDispatcher::new(agent.gateway().clone());
        Self {
            agent: Arc::new(agent),
            fallback,
            assembler: ResponseAssembler::new(sink),
            events,
            memory,
        }
    }

    /// Wire provider, memory store, tool registry and event sinks.
    ///
    /// Lifecycle events go to the log and to an [`EventBus`] that
    /// subscribers (the gateway's SSE feed) can listen on.
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let provider = tooloop_providers::build_from_config(&config.model)?;
        let memory = Arc::new(if config.memory.seed_defaults {
            MemoryStore::seeded()
        } else {
            MemoryStore::new()
        });
        let registry = tooloop_tools::default_registry(memory.clone(), &config.tools)?;

        let gateway = ModelGateway::from_config(provider, &config.model);
        let agent = AgentLoop::from_config(gateway, Arc::new(registry), &config.agent);

        let events = Arc::new(EventBus::default());
        let sink = MultiSink::new()
            .with(Arc::new(TracingSink))
            .with(events.clone());

        info!(
            provider = %config.model.provider,
            model = %config.model.model,
            supports_tool_calls = config.model.supports_tool_calls,
            tools = agent.tools().len(),
            "Agent service ready"
        );
        Ok(Self::new(agent, events, Arc::new(sink), memory))
    }

    /// Answer one message. Never fails; failures become the apology string.
    pub async fn submit(&self, message: &str) -> String {
        let message = message.trim();
        if message.is_empty() {
            return COULD_NOT_PROCESS.to_string();
        }

        if !self.agent.gateway().supports_tool_calls() {
            let run_id = uuid::Uuid::new_v4().to_string();
            return self
                .assembler
                .assemble_fallback(&run_id, self.fallback.dispatch(message))
                .await;
        }

        let state = self
            .assembler
            .collect(self.agent.clone().stream(message))
            .await;

        if let RunStatus::Aborted(RunError::ModelCapability(reason)) = &state.status {
            warn!(run_id = %state.run_id, %reason, "Model rejected tools; retrying without them");
            return self
                .assembler
                .assemble_fallback(&state.run_id, self.fallback.dispatch(message))
                .await;
        }

        self.assembler.render(&state)
    }

    pub fn tools(&self) -> &ToolRegistry {
        self.agent.tools()
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    pub fn memory(&self) -> Arc<MemoryStore> {
        self.memory.clone()
    }

    pub fn gateway(&self) -> &ModelGateway {
        self.agent.gateway()
    }
}
