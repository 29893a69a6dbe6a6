//! Shared test helpers for agent tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tooloop_core::error::ProviderError;
use tooloop_core::message::ToolCallRequest;
use tooloop_core::provider::{ModelReply, Provider, ProviderRequest, ProviderResponse, Usage};

/// A mock provider that plays back a script of responses or errors.
///
/// Each call to `complete` takes the next entry and records the request.
/// Panics if more calls are made than entries provided.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Answer with text straight away.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(text_response(text))])
    }

    /// Request tools once, then answer.
    pub fn tool_then_answer(calls: Vec<ToolCallRequest>, answer: &str) -> Self {
        Self::new(vec![Ok(tool_call_response(calls)), Ok(text_response(answer))])
    }

    /// A provider whose first call never returns in practice.
    pub fn hanging() -> Self {
        let mut provider = Self::new(vec![Ok(text_response("too late"))]);
        provider.delay = Some(Duration::from_secs(3600));
        provider
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider: no response left for call #{call}"))
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        reply: ModelReply::Text(text.to_string()),
        usage: usage(),
        model: "mock".into(),
    }
}

pub fn tool_call_response(calls: Vec<ToolCallRequest>) -> ProviderResponse {
    ProviderResponse {
        reply: ModelReply::ToolCalls {
            content: String::new(),
            calls,
        },
        usage: usage(),
        model: "mock".into(),
    }
}

/// A tool call whose id is `call_{name}`.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest::new(format!("call_{name}"), name, args)
}
