//! Shared types for the triage pipeline.

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

// ── Inbound email ───────────────────────────────────────────────────

/// An incoming email. Immutable for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// Sender.
    pub author: String,
    /// Recipient.
    pub to: String,
    pub subject: String,
    /// Body / thread text.
    pub email_thread: String,
}

impl Email {
    /// Markdown rendering used in prompts and review descriptions.
    pub fn to_markdown(&self) -> String {
        format!(
            "**Subject**: {}\n**From**: {}\n**To**: {}\n\n{}\n\n---\n",
            self.subject, self.author, self.to, self.email_thread
        )
    }
}

// ── Classification ──────────────────────────────────────────────────

/// Triage decision for an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Irrelevant; end the run.
    Ignore,
    /// Needs a reply; enter the response loop.
    Respond,
    /// Important but no reply needed; surface to the human.
    Notify,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Respond => "respond",
            Self::Notify => "notify",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Classification {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ignore" => Ok(Self::Ignore),
            "respond" => Ok(Self::Respond),
            "notify" => Ok(Self::Notify),
            other => Err(WorkflowError::InvalidClassification(other.to_string())),
        }
    }
}

/// Structured output of the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterDecision {
    /// Step-by-step reasoning behind the classification.
    pub reasoning: String,
    pub classification: Classification,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Email {
        Email {
            author: "Alice Smith <alice@company.com>".into(),
            to: "Lance Martin <lance@company.com>".into(),
            subject: "Question about API".into(),
            email_thread: "Could we schedule a call this week?".into(),
        }
    }

    #[test]
    fn markdown_contains_all_fields() {
        let md = sample().to_markdown();
        assert!(md.starts_with("**Subject**: Question about API\n"));
        assert!(md.contains("**From**: Alice Smith"));
        assert!(md.contains("**To**: Lance Martin"));
        assert!(md.contains("Could we schedule a call this week?"));
        assert!(md.ends_with("---\n"));
    }

    #[test]
    fn classification_parses_only_known_values() {
        assert_eq!("respond".parse::<Classification>().unwrap(), Classification::Respond);
        assert_eq!(" notify ".parse::<Classification>().unwrap(), Classification::Notify);
        let err = "escalate".parse::<Classification>().unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidClassification(ref v) if v == "escalate"));
    }

    #[test]
    fn email_uses_original_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("email_thread").is_some());
        assert!(json.get("to").is_some());
    }
}
