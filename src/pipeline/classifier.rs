//! Email classifier: one LLM call with a JSON output contract.
//!
//! The model must answer `{"reasoning": ..., "classification": ...}` where
//! classification is exactly one of `ignore`, `notify`, `respond`. Any other
//! value fails the run; there is no retry and no fallback classification.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::llm::structured::parse_structured;
use crate::pipeline::prompts::{triage_system_prompt, triage_user_prompt};
use crate::pipeline::types::{Classification, Email, RouterDecision};

/// Max tokens for the triage call.
const TRIAGE_MAX_TOKENS: u32 = 1024;

/// Temperature for triage.
const TRIAGE_TEMPERATURE: f32 = 0.0;

/// Raw model output before the classification string is validated.
#[derive(Debug, Deserialize)]
struct RawRouterDecision {
    #[serde(default)]
    reasoning: String,
    classification: String,
}

/// Stateless triage classifier.
pub struct Classifier {
    llm: Arc<dyn LlmProvider>,
    background: String,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmProvider>, background: impl Into<String>) -> Self {
        Self {
            llm,
            background: background.into(),
        }
    }

    /// Classify an email against the current triage instructions.
    pub async fn classify(
        &self,
        email: &Email,
        triage_instructions: &str,
    ) -> Result<RouterDecision, Error> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(triage_system_prompt(&self.background, triage_instructions)),
            ChatMessage::user(triage_user_prompt(email)),
        ])
        .with_temperature(TRIAGE_TEMPERATURE)
        .with_max_tokens(TRIAGE_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Triage completion received"
        );

        let raw: RawRouterDecision = parse_structured(&response.content, self.llm.model_name())
            .inspect_err(|e| {
                warn!(raw_response = %response.content, error = %e, "Unparseable triage response");
            })?;

        let classification: Classification = raw.classification.parse().map_err(|e| {
            warn!(value = %raw.classification, "Classifier returned an unknown classification");
            Error::Workflow(e)
        })?;

        info!(
            subject = %email.subject,
            classification = %classification,
            "Email classified"
        );

        Ok(RouterDecision {
            reasoning: raw.reasoning,
            classification,
        })
    }
}

/// Seed user message that starts the response loop.
pub fn respond_seed(email: &Email) -> String {
    format!("Respond to the email: {}", email.to_markdown())
}

/// Seed for a notify email the human chose to respond to.
pub fn notify_response_seed(email: &Email, feedback: &str) -> String {
    format!(
        "Email to notify user about: {}\n\nUser wants to reply to the email. Use this feedback to respond: {}",
        email.to_markdown(),
        feedback
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::error::{LlmError, WorkflowError};
    use crate::llm::provider::{
        CompletionResponse, FinishReason, ToolCompletionRequest, ToolCompletionResponse,
    };

    /// Returns a canned completion and records the prompt it was sent.
    struct CannedLlm {
        reply: String,
        seen: Mutex<Vec<ChatMessage>>,
    }

    impl CannedLlm {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for CannedLlm {
        fn model_name(&self) -> &str {
            "canned"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            *self.seen.lock().unwrap() = request.messages;
            Ok(CompletionResponse {
                content: self.reply.clone(),
                input_tokens: 10,
                output_tokens: 10,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }

        async fn complete_with_tools(
            &self,
            _request: ToolCompletionRequest,
        ) -> Result<ToolCompletionResponse, LlmError> {
            Err(LlmError::RequestFailed {
                provider: "canned".into(),
                reason: "not scripted".into(),
            })
        }
    }

    fn email() -> Email {
        Email {
            author: "Alice Smith <alice@company.com>".into(),
            to: "John Doe <john@company.com>".into(),
            subject: "Question about API".into(),
            email_thread: "Could we schedule a call this week?".into(),
        }
    }

    #[tokio::test]
    async fn parses_fenced_json_decision() {
        let llm = CannedLlm::new(
            "```json\n{\"reasoning\": \"direct question\", \"classification\": \"respond\"}\n```",
        );
        let classifier = Classifier::new(llm.clone(), "BG");
        let decision = classifier.classify(&email(), "RULES").await.unwrap();
        assert_eq!(decision.classification, Classification::Respond);
        assert_eq!(decision.reasoning, "direct question");

        let seen = llm.seen.lock().unwrap();
        assert!(seen[0].content.contains("RULES"));
        assert!(seen[1].content.contains("Question about API"));
    }

    #[tokio::test]
    async fn unknown_classification_is_fatal() {
        let llm = CannedLlm::new(r#"{"reasoning": "hmm", "classification": "escalate"}"#);
        let classifier = Classifier::new(llm, "BG");
        let err = classifier.classify(&email(), "RULES").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Workflow(WorkflowError::InvalidClassification(ref v)) if v == "escalate"
        ));
    }

    #[tokio::test]
    async fn malformed_output_surfaces_llm_error() {
        let llm = CannedLlm::new("I think you should respond.");
        let classifier = Classifier::new(llm, "BG");
        let err = classifier.classify(&email(), "RULES").await.unwrap_err();
        assert!(matches!(err, Error::Llm(LlmError::InvalidResponse { .. })));
    }

    #[test]
    fn seeds_embed_email_markdown() {
        assert!(respond_seed(&email()).starts_with("Respond to the email: **Subject**"));
        let seed = notify_response_seed(&email(), "say yes");
        assert!(seed.contains("Email to notify user about"));
        assert!(seed.ends_with("say yes"));
    }
}
