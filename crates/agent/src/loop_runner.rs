//! The agent reasoning loop implementation.

use std::sync::Arc;
use std::time::Duration;

use tooloop_config::AgentConfig;
use tooloop_core::error::RunError;
use tooloop_core::message::{ConversationTurn, ToolCallRequest, ToolCallResult};
use tooloop_core::provider::{ModelReply, ToolDefinition};
use tooloop_core::tool::ToolRegistry;
use tracing::{debug, info, warn};

use crate::model::ModelGateway;
use crate::prompt;
use crate::state::{AgentRunState, RunStatus};
use crate::stream::{RunStep, TurnStream};

/// The core agent loop that alternates model calls and tool rounds.
pub struct AgentLoop {
    /// Model access, with its timeout
    gateway: ModelGateway,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Tool definitions advertised on every model call, in registration order
    definitions: Vec<ToolDefinition>,

    /// Maximum completed tool rounds per run
    max_iterations: u32,

    /// Per-call bound on a single tool invocation
    tool_timeout: Duration,

    /// Run the tools of one round concurrently
    parallel_tools: bool,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(gateway: ModelGateway, tools: Arc<ToolRegistry>) -> Self {
        let definitions = tools.definitions();
        Self {
            gateway,
            tools,
            definitions,
            max_iterations: 15,
            tool_timeout: Duration::from_secs(30),
            parallel_tools: false,
        }
    }

    pub fn from_config(gateway: ModelGateway, tools: Arc<ToolRegistry>, config: &AgentConfig) -> Self {
        Self::new(gateway, tools)
            .with_max_iterations(config.max_iterations)
            .with_tool_timeout(Duration::from_secs(config.tool_timeout_secs))
            .with_parallel_tools(config.parallel_tool_calls)
    }

    /// Set the maximum number of tool rounds.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the timeout applied to each tool invocation.
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// Dispatch the tools of one round concurrently. Results are still
    /// appended in request order.
    pub fn with_parallel_tools(mut self, parallel: bool) -> Self {
        self.parallel_tools = parallel;
        self
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Seed a new run with the system instruction and the user's message.
    pub fn start(&self, message: &str) -> AgentRunState {
        let run_id = uuid::Uuid::new_v4().to_string();
        AgentRunState::new(
            run_id,
            vec![
                ConversationTurn::system(prompt::system_prompt(prompt::today())),
                ConversationTurn::user(message),
            ],
        )
    }

    /// Run to a terminal state.
    pub async fn run(&self, message: &str) -> AgentRunState {
        self.drive(self.start(message), |_| {}).await
    }

    /// Run on a spawned task, observing it step by step.
    pub fn stream(self: Arc<Self>, message: &str) -> TurnStream {
        let state = self.start(message);
        TurnStream::new(self, state)
    }

    /// Drive `state` until it is terminal, reporting every step.
    ///
    /// Turns already in the conversation are reported first, then every
    /// model call and appended turn, then [`RunStep::Finished`].
    pub async fn drive<F>(&self, mut state: AgentRunState, mut observer: F) -> AgentRunState
    where
        F: FnMut(RunStep) + Send,
    {
        info!(
            run_id = %state.run_id,
            model = self.gateway.model(),
            tools = self.definitions.len(),
            max_iterations = self.max_iterations,
            "Agent run started"
        );

        for turn in &state.conversation {
            observer(RunStep::Turn(turn.clone()));
        }

        while !state.is_terminal() {
            self.step(&mut state, &mut observer).await;
        }

        match &state.status {
            RunStatus::Aborted(e) => warn!(
                run_id = %state.run_id,
                iterations = state.iterations,
                error = %e,
                "Agent run aborted"
            ),
            _ => info!(
                run_id = %state.run_id,
                iterations = state.iterations,
                "Agent run completed"
            ),
        }

        observer(RunStep::Finished(state.clone()));
        state
    }

    /// One model call and, if requested, one tool round.
    async fn step<F>(&self, state: &mut AgentRunState, observer: &mut F)
    where
        F: FnMut(RunStep) + Send,
    {
        observer(RunStep::ModelCalled {
            iteration: state.iterations,
        });

        let reply = match self.gateway.generate(&state.conversation, &self.definitions).await {
            Ok(reply) => reply,
            Err(e) => {
                state.status = RunStatus::Aborted(e);
                return;
            }
        };

        match reply {
            ModelReply::Text(answer) => {
                let turn = ConversationTurn::assistant(answer.clone());
                observer(RunStep::Turn(turn.clone()));
                state.push(turn);
                state.status = RunStatus::Done { answer };
            }
            ModelReply::ToolCalls { content, calls } => {
                if state.iterations >= self.max_iterations {
                    warn!(
                        run_id = %state.run_id,
                        cap = self.max_iterations,
                        requested = calls.len(),
                        "Tool round refused at iteration cap"
                    );
                    state.status = RunStatus::Aborted(RunError::IterationCapExceeded {
                        cap: self.max_iterations,
                    });
                    return;
                }

                let turn = ConversationTurn::tool_request(content, calls.clone());
                observer(RunStep::Turn(turn.clone()));
                state.push(turn);

                for result in self.execute_tools(&state.run_id, &calls).await {
                    let turn = ConversationTurn::tool(result);
                    observer(RunStep::Turn(turn.clone()));
                    state.push(turn);
                }

                state.iterations += 1;
            }
        }
    }

    /// Resolve every request to exactly one result, in request order.
    async fn execute_tools(&self, run_id: &str, calls: &[ToolCallRequest]) -> Vec<ToolCallResult> {
        debug!(run_id, count = calls.len(), parallel = self.parallel_tools, "Executing tool round");

        let results = if self.parallel_tools {
            futures::future::join_all(
                calls
                    .iter()
                    .map(|call| self.tools.dispatch(call, self.tool_timeout)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.tools.dispatch(call, self.tool_timeout).await);
            }
            results
        };

        for result in &results {
            debug!(
                run_id,
                call_id = %result.call_id,
                tool = %result.tool_name,
                success = result.success,
                "Tool call resolved"
            );
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        ScriptedProvider, make_tool_call, text_response, tool_call_response,
    };
    use futures::StreamExt;
    use serde_json::json;
    use tooloop_tools::{CalculatorTool, CurrentTimeTool};

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register_tool(CalculatorTool).unwrap();
        registry.register_tool(CurrentTimeTool::ist()).unwrap();
        Arc::new(registry)
    }

    fn agent(provider: Arc<ScriptedProvider>) -> AgentLoop {
        AgentLoop::new(ModelGateway::new(provider, "mock"), registry())
    }

    #[tokio::test]
    async fn start_seeds_instruction_and_message() {
        let agent = agent(Arc::new(ScriptedProvider::new(vec![])));
        let state = agent.start("hello");
        assert_eq!(state.conversation.len(), 2);
        assert!(matches!(&state.conversation[0], ConversationTurn::System { content }
            if content.contains("tool-using AI agent") && content.contains("\nToday: ")));
        assert_eq!(state.conversation[1], ConversationTurn::user("hello"));
        assert_eq!(state.iterations, 0);
        assert!(!state.is_terminal());
    }

    #[tokio::test]
    async fn direct_answer_finishes_in_one_round() {
        let provider = Arc::new(ScriptedProvider::single_text("Why did the crab cross the road?"));
        let state = agent(provider.clone()).run("Tell me a joke").await;

        assert_eq!(state.final_answer(), Some("Why did the crab cross the road?"));
        assert_eq!(state.iterations, 0);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(state.conversation.len(), 3);

        let request = &provider.requests()[0];
        let names: Vec<_> = request.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["calculator", "current_time"]);
    }

    #[tokio::test]
    async fn calculator_round_trip() {
        let provider = Arc::new(ScriptedProvider::tool_then_answer(
            vec![make_tool_call("calculator", json!({"expression": "56 + 4"}))],
            "56 + 4 = 60",
        ));
        let state = agent(provider.clone()).run("What's 56 + 4?").await;

        assert_eq!(state.final_answer(), Some("56 + 4 = 60"));
        assert_eq!(state.iterations, 1);

        let tool_turn = &state.conversation[3];
        match tool_turn {
            ConversationTurn::Tool(result) => {
                assert_eq!(result.call_id, "call_calculator");
                assert_eq!(result.output, "60");
                assert!(result.success);
            }
            other => panic!("expected tool turn, got {other:?}"),
        }

        // The second model call sees the tool result.
        let second = &provider.requests()[1];
        assert_eq!(second.turns.len(), 4);
        assert_eq!(&second.turns[3], tool_turn);
    }

    #[tokio::test]
    async fn unknown_tool_is_fed_back() {
        let provider = Arc::new(ScriptedProvider::tool_then_answer(
            vec![make_tool_call("teleport", json!({"to": "Mars"}))],
            "I can't do that, but here's what I know.",
        ));
        let state = agent(provider).run("Take me to Mars").await;

        assert!(state.final_answer().is_some());
        let ConversationTurn::Tool(result) = &state.conversation[3] else {
            panic!("expected tool turn");
        };
        assert!(!result.success);
        assert!(result.output.contains("Unknown tool: teleport"));
        assert!(result.output.contains("calculator"));
    }

    #[tokio::test]
    async fn tool_execution_error_is_fed_back() {
        let provider = Arc::new(ScriptedProvider::tool_then_answer(
            vec![make_tool_call("calculator", json!({"expression": "1/0"}))],
            "Dividing by zero is undefined.",
        ));
        let state = agent(provider.clone()).run("What's 1/0?").await;

        assert_eq!(state.final_answer(), Some("Dividing by zero is undefined."));
        assert_eq!(state.iterations, 1);
        let ConversationTurn::Tool(result) = &state.conversation[3] else {
            panic!("expected tool turn");
        };
        assert!(!result.success);
        assert_eq!(result.call_id, "call_calculator");
        assert!(result.output.starts_with("Error: Tool execution failed"));
        assert!(result.output.contains("Division by zero"));

        let second = &provider.requests()[1];
        assert_eq!(second.turns.last(), Some(&state.conversation[3]));
    }

    #[tokio::test]
    async fn invalid_arguments_do_not_invoke_tool() {
        let provider = Arc::new(ScriptedProvider::tool_then_answer(
            vec![make_tool_call("calculator", json!({"expr": "1+1"}))],
            "2",
        ));
        let state = agent(provider).run("1+1?").await;

        let ConversationTurn::Tool(result) = &state.conversation[3] else {
            panic!("expected tool turn");
        };
        assert!(!result.success);
        assert!(result.output.contains("missing required field 'expression'"));
        assert_eq!(state.final_answer(), Some("2"));
    }

    #[tokio::test]
    async fn iteration_cap_aborts_without_running_tools() {
        let call = || vec![make_tool_call("calculator", json!({"expression": "1+1"}))];
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(tool_call_response(call())),
            Ok(tool_call_response(call())),
            Ok(tool_call_response(call())),
        ]));
        let state = agent(provider.clone()).with_max_iterations(2).run("loop").await;

        assert_eq!(
            state.status,
            RunStatus::Aborted(RunError::IterationCapExceeded { cap: 2 })
        );
        assert_eq!(state.iterations, 2);
        assert_eq!(provider.call_count(), 3);
        // Every appended request has its result; the refused one is not recorded.
        let requests = state
            .conversation
            .iter()
            .filter(|t| !t.tool_calls().is_empty())
            .count();
        let results = state
            .conversation
            .iter()
            .filter(|t| matches!(t, ConversationTurn::Tool(_)))
            .count();
        assert_eq!(requests, 2);
        assert_eq!(results, 2);
    }

    #[tokio::test]
    async fn answer_after_last_allowed_round_completes() {
        let provider = Arc::new(ScriptedProvider::tool_then_answer(
            vec![make_tool_call("calculator", json!({"expression": "2*3"}))],
            "6",
        ));
        let state = agent(provider).with_max_iterations(1).run("2*3?").await;
        assert_eq!(state.final_answer(), Some("6"));
        assert_eq!(state.iterations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn model_timeout_aborts_run() {
        let provider = Arc::new(ScriptedProvider::hanging());
        let gateway = ModelGateway::new(provider, "slow").with_timeout(Duration::from_secs(10));
        let state = AgentLoop::new(gateway, registry()).run("hi").await;
        assert_eq!(
            state.status,
            RunStatus::Aborted(RunError::ModelTimeout { timeout_secs: 10 })
        );
    }

    #[tokio::test]
    async fn results_keep_request_order_when_parallel() {
        let calls = vec![
            ToolCallRequest::new("a", "calculator", json!({"expression": "1+1"})),
            ToolCallRequest::new("b", "current_time", json!({})),
            ToolCallRequest::new("c", "calculator", json!({"expression": "3*3"})),
        ];
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(tool_call_response(calls)),
            Ok(text_response("done")),
        ]));
        let state = agent(provider).with_parallel_tools(true).run("many").await;

        let ids: Vec<_> = state
            .conversation
            .iter()
            .filter_map(|t| match t {
                ConversationTurn::Tool(r) => Some(r.call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(state.iterations, 1);
    }

    #[tokio::test]
    async fn stream_is_lazy_and_ends_with_finished() {
        let provider = Arc::new(ScriptedProvider::single_text("hi there"));
        let agent = Arc::new(agent(provider.clone()));
        let stream = agent.stream("hello");

        tokio::task::yield_now().await;
        assert_eq!(provider.call_count(), 0);

        let steps: Vec<RunStep> = stream.collect().await;
        assert_eq!(provider.call_count(), 1);
        assert!(matches!(steps[0], RunStep::Turn(ConversationTurn::System { .. })));
        assert!(matches!(steps[1], RunStep::Turn(ConversationTurn::User { .. })));
        assert!(matches!(steps[2], RunStep::ModelCalled { iteration: 0 }));
        assert!(matches!(steps[3], RunStep::Turn(ConversationTurn::Assistant { .. })));
        match steps.last() {
            Some(RunStep::Finished(state)) => assert_eq!(state.final_answer(), Some("hi there")),
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropping_stream_cancels_model_call() {
        let provider = Arc::new(ScriptedProvider::hanging());
        let agent = Arc::new(agent(provider.clone()));
        let mut stream = agent.clone().stream("hello");

        while let Some(step) = stream.next().await {
            if matches!(step, RunStep::ModelCalled { .. }) {
                break;
            }
        }
        tokio::task::yield_now().await;
        assert_eq!(provider.call_count(), 1);
        assert_eq!(Arc::strong_count(&agent), 2);

        drop(stream);
        for _ in 0..10 {
            if Arc::strong_count(&agent) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(Arc::strong_count(&agent), 1);
    }
}
