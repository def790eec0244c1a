//! Shared fixtures for the integration tests: a scripted LLM, a summarizer
//! that records which namespaces it was asked to update, and assistant
//! builders backed by in-memory libSQL.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use triage_assist::agent::{EmailAssistant, PreferenceSummarizer, UserPreferences, WorkflowSettings};
use triage_assist::error::{Error, LlmError};
use triage_assist::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, ToolCall,
    ToolCompletionRequest, ToolCompletionResponse,
};
use triage_assist::pipeline::Email;
use triage_assist::store::{Database, LibSqlBackend, Namespace};

/// One scripted answer to a tool-selection request.
pub enum Turn {
    Calls(Vec<ToolCall>),
    Text(String),
}

/// LLM stub that answers from queues. Plain completions serve the
/// classifier; tool completions serve the response loop.
#[derive(Default)]
pub struct ScriptedLlm {
    completions: Mutex<VecDeque<String>>,
    turns: Mutex<VecDeque<Turn>>,
    tool_requests: Mutex<Vec<ToolCompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify_as(self, classification: &str) -> Self {
        self.completions.lock().unwrap().push_back(
            json!({
                "reasoning": format!("Looks like {classification}"),
                "classification": classification,
            })
            .to_string(),
        );
        self
    }

    pub fn completion(self, raw: &str) -> Self {
        self.completions.lock().unwrap().push_back(raw.to_string());
        self
    }

    pub fn then_calls(self, calls: Vec<ToolCall>) -> Self {
        self.turns.lock().unwrap().push_back(Turn::Calls(calls));
        self
    }

    pub fn then_text(self, text: &str) -> Self {
        self.turns.lock().unwrap().push_back(Turn::Text(text.to_string()));
        self
    }

    /// Number of tool-selection requests served so far.
    pub fn tool_rounds(&self) -> usize {
        self.tool_requests.lock().unwrap().len()
    }

    /// Tool names offered in the most recent tool-selection request.
    pub fn last_tool_names(&self) -> Vec<String> {
        self.tool_requests
            .lock()
            .unwrap()
            .last()
            .map(|r| r.tools.iter().map(|t| t.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Messages sent in the most recent tool-selection request.
    pub fn last_tool_messages(&self) -> Vec<ChatMessage> {
        self.tool_requests
            .lock()
            .unwrap()
            .last()
            .map(|r| r.messages.clone())
            .unwrap_or_default()
    }

    fn exhausted(what: &str) -> LlmError {
        LlmError::RequestFailed {
            provider: "scripted".to_string(),
            reason: format!("no scripted {what} left"),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        (Decimal::ZERO, Decimal::ZERO)
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let content = self
            .completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Self::exhausted("completion"))?;
        Ok(CompletionResponse {
            content,
            input_tokens: 10,
            output_tokens: 5,
            finish_reason: FinishReason::Stop,
            response_id: None,
        })
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        self.tool_requests.lock().unwrap().push(request);
        let turn = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Self::exhausted("tool turn"))?;
        let (content, tool_calls, finish_reason) = match turn {
            Turn::Calls(calls) => (None, calls, FinishReason::ToolUse),
            Turn::Text(text) => (Some(text), Vec::new(), FinishReason::Stop),
        };
        Ok(ToolCompletionResponse {
            content,
            tool_calls,
            input_tokens: 20,
            output_tokens: 8,
            finish_reason,
            response_id: None,
        })
    }
}

/// Summarizer that records every update and appends a marker to the profile.
#[derive(Default)]
pub struct CountingSummarizer {
    calls: Mutex<Vec<Namespace>>,
}

impl CountingSummarizer {
    pub fn calls(&self) -> Vec<Namespace> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, namespace: Namespace) -> usize {
        self.calls().iter().filter(|n| **n == namespace).count()
    }
}

#[async_trait]
impl PreferenceSummarizer for CountingSummarizer {
    async fn summarize(
        &self,
        namespace: Namespace,
        current_profile: &str,
        _feedback: &[ChatMessage],
    ) -> Result<UserPreferences, Error> {
        self.calls.lock().unwrap().push(namespace);
        Ok(UserPreferences {
            chain_of_thought: "noted".to_string(),
            user_preferences: format!("{current_profile}\n- learned from review"),
        })
    }
}

pub struct Harness {
    pub assistant: Arc<EmailAssistant>,
    pub llm: Arc<ScriptedLlm>,
    pub summarizer: Arc<CountingSummarizer>,
    pub db: Arc<dyn Database>,
}

pub async fn harness(llm: ScriptedLlm) -> Harness {
    harness_with(llm, WorkflowSettings::default()).await
}

pub async fn harness_with(llm: ScriptedLlm, settings: WorkflowSettings) -> Harness {
    let llm = Arc::new(llm);
    let summarizer = Arc::new(CountingSummarizer::default());
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let assistant = Arc::new(EmailAssistant::with_summarizer(
        llm.clone(),
        Arc::clone(&db),
        settings,
        summarizer.clone(),
    ));
    Harness {
        assistant,
        llm,
        summarizer,
        db,
    }
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

pub fn write_email_call(id: &str) -> ToolCall {
    call(
        id,
        "write_email",
        json!({
            "to": "alice@example.com",
            "subject": "Re: API docs",
            "content": "Thanks Alice, I'll take a look today."
        }),
    )
}

pub fn done_call(id: &str) -> ToolCall {
    call(id, "Done", json!({"done": true}))
}

pub fn sample_email() -> Email {
    Email {
        author: "Alice Smith <alice@example.com>".to_string(),
        to: "Lance Martin <lance@company.com>".to_string(),
        subject: "Quick question about API documentation".to_string(),
        email_thread: "Hi Lance, I noticed a few endpoints are missing from the docs. Could you check?"
            .to_string(),
    }
}
