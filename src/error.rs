//! Error types for the email assistant.

use uuid::Uuid;

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

impl Error {
    /// Whether this error was caused by the caller (bad thread id, nothing to
    /// resume) rather than by a failed run.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Workflow(
                WorkflowError::ThreadNotFound { .. }
                    | WorkflowError::ThreadFinished { .. }
                    | WorkflowError::NotAwaitingReview { .. }
                    | WorkflowError::ThreadBusy { .. }
            )
        )
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Tool execution errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool {name} not found")]
    NotFound { name: String },

    #[error("Invalid parameters for tool {name}: {reason}")]
    InvalidParameters { name: String, reason: String },

    #[error("Tool {name} cannot be executed directly: {reason}")]
    NotExecutable { name: String, reason: String },
}

/// Workflow contract and thread-lifecycle errors.
///
/// Everything except the thread-lifecycle variants is fatal for the run that
/// raised it.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid classification: {0}")]
    InvalidClassification(String),

    #[error("Unknown tool proposed: {name}")]
    UnknownTool { name: String },

    #[error("Invalid human response type: {kind}")]
    UnknownVerdict { kind: String },

    #[error("Verdict '{verdict}' is not allowed for {action}")]
    VerdictNotAllowed { verdict: String, action: String },

    #[error("Invalid payload for verdict '{verdict}': {reason}")]
    InvalidVerdictPayload { verdict: String, reason: String },

    #[error("Tool result {tool_call_id} has no matching call in the preceding assistant message")]
    OrphanToolResult { tool_call_id: String },

    #[error("Tool call {tool_call_id} not found in the most recent assistant message")]
    ToolCallNotFound { tool_call_id: String },

    #[error("Tool selection exceeded {limit} rounds without finishing")]
    RoundLimitExceeded { limit: u32 },

    #[error("Thread {id} cannot transition from {from} to {to}")]
    InvalidTransition { id: Uuid, from: String, to: String },

    #[error("Thread {id} not found or has no saved state")]
    ThreadNotFound { id: Uuid },

    #[error("Thread {id} workflow already finished. Cannot resume.")]
    ThreadFinished { id: Uuid },

    #[error("Thread {id} has no pending review to resume")]
    NotAwaitingReview { id: Uuid },

    #[error("Thread {id} is already being resumed")]
    ThreadBusy { id: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_thread_lifecycle_errors_are_client_errors() {
        let id = Uuid::new_v4();
        assert!(Error::from(WorkflowError::ThreadBusy { id }).is_client_error());
        assert!(Error::from(WorkflowError::ThreadFinished { id }).is_client_error());

        let fatal = [
            Error::from(LlmError::RequestFailed {
                provider: "openai".into(),
                reason: "timeout".into(),
            }),
            Error::from(LlmError::InvalidResponse {
                provider: "openai".into(),
                reason: "empty".into(),
            }),
            Error::from(WorkflowError::ToolCallNotFound {
                tool_call_id: "c1".into(),
            }),
            Error::from(DatabaseError::Query("locked".into())),
        ];
        for err in &fatal {
            assert!(!err.is_client_error(), "{err} should be fatal");
        }
    }
}
