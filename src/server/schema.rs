//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::agent::review::{AllowedVerdicts, HumanResponse, ReviewRequest};
use crate::agent::state::{ThreadSnapshot, TriageResult};
use crate::pipeline::types::{Classification, Email};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessEmailRequest {
    pub email: Email,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEmailResponse {
    pub classification: Classification,
    pub response: String,
    pub reasoning: String,
}

impl From<TriageResult> for ProcessEmailResponse {
    fn from(result: TriageResult) -> Self {
        Self {
            classification: result.classification,
            response: result.response,
            reasoning: result.reasoning,
        }
    }
}

/// Either a new email or a verdict for an existing thread.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessEmailHitlRequest {
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub human_response: Option<HumanResponse>,
}

/// Projection of the pending review for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptInfo {
    pub action: String,
    pub args: serde_json::Value,
    pub description: String,
    pub allowed_actions: AllowedVerdicts,
}

impl From<ReviewRequest> for InterruptInfo {
    fn from(review: ReviewRequest) -> Self {
        Self {
            action: review.action,
            args: review.args,
            description: review.description,
            allowed_actions: review.allowed_actions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitlStatus {
    Interrupted,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessEmailHitlResponse {
    pub status: HitlStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupt: Option<InterruptInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ProcessEmailResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessEmailHitlResponse {
    pub fn error(thread_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            status: HitlStatus::Error,
            thread_id,
            interrupt: None,
            result: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadStatusResponse {
    pub thread_id: String,
    pub status: String,
    pub classification: Option<Classification>,
    pub pending: Option<InterruptInfo>,
    pub state: ThreadSnapshot,
}

impl From<ThreadSnapshot> for ThreadStatusResponse {
    fn from(snapshot: ThreadSnapshot) -> Self {
        Self {
            thread_id: snapshot.thread_id.to_string(),
            status: snapshot.state.to_string(),
            classification: snapshot.classification,
            pending: snapshot.pending.clone().map(InterruptInfo::from),
            state: snapshot,
        }
    }
}
