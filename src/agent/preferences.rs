//! Preference updater: re-summarizes a stored profile from human feedback.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Error;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::llm::structured::parse_structured;
use crate::pipeline::prompts::{NO_EXISTING_PREFERENCES, memory_update_prompt};
use crate::store::memory::{MemoryStore, Namespace, PREFERENCES_KEY};

/// Structured output of a profile re-summarization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub chain_of_thought: String,
    pub user_preferences: String,
}

/// Rewrites a profile given new feedback messages.
#[async_trait]
pub trait PreferenceSummarizer: Send + Sync {
    async fn summarize(
        &self,
        namespace: Namespace,
        current_profile: &str,
        feedback: &[ChatMessage],
    ) -> Result<UserPreferences, Error>;
}

/// Summarizer backed by an LLM call with a JSON output contract.
pub struct LlmPreferenceSummarizer {
    llm: Arc<dyn LlmProvider>,
}

impl LlmPreferenceSummarizer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl PreferenceSummarizer for LlmPreferenceSummarizer {
    async fn summarize(
        &self,
        namespace: Namespace,
        current_profile: &str,
        feedback: &[ChatMessage],
    ) -> Result<UserPreferences, Error> {
        let mut messages = vec![ChatMessage::system(memory_update_prompt(
            namespace.path(),
            current_profile,
        ))];
        messages.extend(feedback.iter().cloned());

        let response = self
            .llm
            .complete(CompletionRequest::new(messages).with_temperature(0.0))
            .await?;
        Ok(parse_structured(&response.content, self.llm.model_name())?)
    }
}

/// Applies feedback to the memory store through a summarizer.
#[derive(Clone)]
pub struct PreferenceUpdater {
    memory: MemoryStore,
    summarizer: Arc<dyn PreferenceSummarizer>,
}

impl PreferenceUpdater {
    pub fn new(memory: MemoryStore, summarizer: Arc<dyn PreferenceSummarizer>) -> Self {
        Self { memory, summarizer }
    }

    /// Overwrite the namespace's profile with a summary that folds in
    /// `feedback`. Returns `false` without calling the summarizer when there
    /// is no feedback.
    pub async fn update(&self, namespace: Namespace, feedback: &[ChatMessage]) -> Result<bool, Error> {
        if feedback.iter().all(|m| m.content.trim().is_empty()) {
            debug!(namespace = %namespace, "No feedback, skipping preference update");
            return Ok(false);
        }

        let current = self
            .memory
            .get(namespace, PREFERENCES_KEY)
            .await?
            .unwrap_or_else(|| NO_EXISTING_PREFERENCES.to_string());

        let updated = self
            .summarizer
            .summarize(namespace, &current, feedback)
            .await?;
        debug!(namespace = %namespace, rationale = %updated.chain_of_thought, "Preferences re-summarized");

        self.memory
            .put(namespace, PREFERENCES_KEY, &updated.user_preferences)
            .await?;
        info!(namespace = %namespace, "Preference profile updated");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rust_decimal::Decimal;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::provider::{
        CompletionResponse, FinishReason, ToolCompletionRequest, ToolCompletionResponse,
    };
    use crate::store::LibSqlBackend;

    /// Records the profile it was given and appends a marker.
    struct EchoSummarizer {
        seen: Mutex<Vec<(Namespace, String)>>,
    }

    #[async_trait]
    impl PreferenceSummarizer for EchoSummarizer {
        async fn summarize(
            &self,
            namespace: Namespace,
            current_profile: &str,
            _feedback: &[ChatMessage],
        ) -> Result<UserPreferences, Error> {
            self.seen
                .lock()
                .unwrap()
                .push((namespace, current_profile.to_string()));
            Ok(UserPreferences {
                chain_of_thought: "noted".into(),
                user_preferences: format!("{current_profile} +updated"),
            })
        }
    }

    async fn updater() -> (PreferenceUpdater, MemoryStore, Arc<EchoSummarizer>) {
        let memory = MemoryStore::new(Arc::new(LibSqlBackend::new_memory().await.unwrap()));
        let summarizer = Arc::new(EchoSummarizer {
            seen: Mutex::new(Vec::new()),
        });
        (
            PreferenceUpdater::new(memory.clone(), summarizer.clone()),
            memory,
            summarizer,
        )
    }

    #[tokio::test]
    async fn empty_feedback_is_a_no_op() {
        let (updater, memory, summarizer) = updater().await;
        let ns = Namespace::TriagePreferences;
        assert!(!updater.update(ns, &[]).await.unwrap());
        assert!(!updater.update(ns, &[ChatMessage::user("  ")]).await.unwrap());
        assert!(summarizer.seen.lock().unwrap().is_empty());
        assert_eq!(memory.get(ns, PREFERENCES_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn absent_profile_uses_sentinel_and_overwrites() {
        let (updater, memory, summarizer) = updater().await;
        let ns = Namespace::ResponsePreferences;
        assert!(updater.update(ns, &[ChatMessage::user("be brief")]).await.unwrap());

        assert_eq!(
            summarizer.seen.lock().unwrap()[0],
            (ns, NO_EXISTING_PREFERENCES.to_string())
        );
        assert_eq!(
            memory.get(ns, PREFERENCES_KEY).await.unwrap().as_deref(),
            Some("No existing preferences +updated")
        );
    }

    struct JsonLlm;

    #[async_trait]
    impl LlmProvider for JsonLlm {
        fn model_name(&self) -> &str {
            "json"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            assert!(request.messages[0].content.contains("email_assistant/cal_preferences"));
            Ok(CompletionResponse {
                content: r#"{"chain_of_thought": "prefers mornings", "user_preferences": "Mornings only."}"#
                    .into(),
                input_tokens: 5,
                output_tokens: 5,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }

        async fn complete_with_tools(
            &self,
            _request: ToolCompletionRequest,
        ) -> Result<ToolCompletionResponse, LlmError> {
            unreachable!("summarizer never uses tools")
        }
    }

    #[tokio::test]
    async fn llm_summarizer_parses_structured_output() {
        let summarizer = LlmPreferenceSummarizer::new(Arc::new(JsonLlm));
        let out = summarizer
            .summarize(
                Namespace::CalendarPreferences,
                "30 minutes",
                &[ChatMessage::user("only mornings")],
            )
            .await
            .unwrap();
        assert_eq!(out.user_preferences, "Mornings only.");
    }
}
