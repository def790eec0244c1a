//! Review requests sent to the human and the verdicts that come back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WorkflowError;
use crate::pipeline::types::Email;
use crate::tools::tool::{QuestionArgs, ScheduleMeetingArgs, ToolKind, WriteEmailArgs, parse_args};

/// Action name of the triage review raised for `notify` emails.
pub const NOTIFY_ACTION: &str = "Email Assistant: notify";

/// The four ways a human can dispose of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictKind {
    Accept,
    Edit,
    Ignore,
    Response,
}

impl VerdictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Edit => "edit",
            Self::Ignore => "ignore",
            Self::Response => "response",
        }
    }
}

impl std::fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability set of verdicts a review accepts.
///
/// Serialized as the `allow_*` flags review clients expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AllowedVerdicts {
    pub allow_ignore: bool,
    pub allow_respond: bool,
    pub allow_edit: bool,
    pub allow_accept: bool,
}

impl AllowedVerdicts {
    pub fn all() -> Self {
        Self {
            allow_ignore: true,
            allow_respond: true,
            allow_edit: true,
            allow_accept: true,
        }
    }

    pub fn of(kinds: &[VerdictKind]) -> Self {
        let mut allowed = Self::default();
        for kind in kinds {
            match kind {
                VerdictKind::Accept => allowed.allow_accept = true,
                VerdictKind::Edit => allowed.allow_edit = true,
                VerdictKind::Ignore => allowed.allow_ignore = true,
                VerdictKind::Response => allowed.allow_respond = true,
            }
        }
        allowed
    }

    pub fn contains(&self, kind: VerdictKind) -> bool {
        match kind {
            VerdictKind::Accept => self.allow_accept,
            VerdictKind::Edit => self.allow_edit,
            VerdictKind::Ignore => self.allow_ignore,
            VerdictKind::Response => self.allow_respond,
        }
    }

    /// Reject a verdict outside this set.
    pub fn check(&self, kind: VerdictKind, action: &str) -> Result<(), WorkflowError> {
        if self.contains(kind) {
            Ok(())
        } else {
            Err(WorkflowError::VerdictNotAllowed {
                verdict: kind.to_string(),
                action: action.to_string(),
            })
        }
    }
}

/// The single pending question put to the human.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// Tool name, or [`NOTIFY_ACTION`] for triage review.
    pub action: String,
    pub args: Value,
    /// Markdown shown to the reviewer.
    pub description: String,
    pub allowed_actions: AllowedVerdicts,
    /// Call under review; absent for triage review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ReviewRequest {
    pub fn for_tool_call(
        kind: ToolKind,
        tool_call_id: &str,
        args: &Value,
        email: &Email,
        allowed: AllowedVerdicts,
    ) -> Self {
        Self {
            action: kind.name().to_string(),
            args: args.clone(),
            description: format!("{}{}", email.to_markdown(), format_for_display(kind, args)),
            allowed_actions: allowed,
            tool_call_id: Some(tool_call_id.to_string()),
        }
    }

    pub fn for_notify(email: &Email) -> Self {
        Self {
            action: NOTIFY_ACTION.to_string(),
            args: Value::Object(Default::default()),
            description: email.to_markdown(),
            allowed_actions: AllowedVerdicts::of(&[VerdictKind::Ignore, VerdictKind::Response]),
            tool_call_id: None,
        }
    }
}

/// Reviewer-facing rendering of a proposed call.
fn format_for_display(kind: ToolKind, args: &Value) -> String {
    let rendered = match kind {
        ToolKind::WriteEmail => parse_args::<WriteEmailArgs>(&kind, args).ok().map(|a| {
            format!(
                "# Email Draft\n\n**To**: {}\n**Subject**: {}\n\n{}",
                a.to, a.subject, a.content
            )
        }),
        ToolKind::ScheduleMeeting => parse_args::<ScheduleMeetingArgs>(&kind, args).ok().map(|a| {
            format!(
                "# Calendar Invite\n\n**Meeting**: {}\n**Attendees**: {}\n**Duration**: {} minutes\n**Day**: {}\n**Start**: {}:00\n",
                a.subject,
                a.attendees.join(", "),
                a.duration_minutes,
                a.preferred_day,
                a.start_time
            )
        }),
        ToolKind::Question => parse_args::<QuestionArgs>(&kind, args)
            .ok()
            .map(|a| format!("# Question for User\n\n{}", a.content)),
        ToolKind::CheckCalendarAvailability | ToolKind::Done => None,
    };

    rendered.unwrap_or_else(|| {
        let pretty = serde_json::to_string_pretty(args).unwrap_or_else(|_| args.to_string());
        format!("# Tool Call: {}\n\nArguments:\n{}", kind.name(), pretty)
    })
}

/// Verdict as received on the wire: `{"type": ..., "args": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: Option<Value>,
}

impl HumanResponse {
    pub fn new(kind: impl Into<String>, args: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            args,
        }
    }

    /// Validate the type and payload shape.
    pub fn into_verdict(self) -> Result<Verdict, WorkflowError> {
        match self.kind.as_str() {
            "accept" => Ok(Verdict::Accept),
            "ignore" => Ok(Verdict::Ignore),
            "edit" => match self.args {
                Some(Value::Object(mut map)) => match map.remove("args") {
                    Some(Value::Object(inner)) => Ok(Verdict::Edit(Value::Object(inner))),
                    Some(other) => Err(WorkflowError::InvalidVerdictPayload {
                        verdict: "edit".into(),
                        reason: format!("expected an object under 'args', got {other}"),
                    }),
                    None => Ok(Verdict::Edit(Value::Object(map))),
                },
                other => Err(WorkflowError::InvalidVerdictPayload {
                    verdict: "edit".into(),
                    reason: format!(
                        "expected replacement arguments object, got {}",
                        other.map_or_else(|| "nothing".to_string(), |v| v.to_string())
                    ),
                }),
            },
            "response" => match self.args {
                Some(Value::String(text)) => Ok(Verdict::Response(text)),
                None | Some(Value::Null) => Err(WorkflowError::InvalidVerdictPayload {
                    verdict: "response".into(),
                    reason: "feedback text is required".into(),
                }),
                Some(other) => Ok(Verdict::Response(other.to_string())),
            },
            other => Err(WorkflowError::UnknownVerdict {
                kind: other.to_string(),
            }),
        }
    }
}

/// A validated human verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accept,
    /// Replacement arguments.
    Edit(Value),
    Ignore,
    /// Free-text feedback.
    Response(String),
}

impl Verdict {
    pub fn kind(&self) -> VerdictKind {
        match self {
            Self::Accept => VerdictKind::Accept,
            Self::Edit(_) => VerdictKind::Edit,
            Self::Ignore => VerdictKind::Ignore,
            Self::Response(_) => VerdictKind::Response,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn email() -> Email {
        Email {
            author: "alice@company.com".into(),
            to: "me@company.com".into(),
            subject: "Docs".into(),
            email_thread: "Where are the docs?".into(),
        }
    }

    #[test]
    fn allowed_verdicts_serialize_as_flags() {
        let allowed = AllowedVerdicts::of(&[VerdictKind::Ignore, VerdictKind::Response]);
        assert_eq!(
            serde_json::to_value(allowed).unwrap(),
            json!({"allow_ignore": true, "allow_respond": true, "allow_edit": false, "allow_accept": false})
        );
        assert!(allowed.check(VerdictKind::Edit, "Question").is_err());
        assert!(allowed.check(VerdictKind::Ignore, "Question").is_ok());
    }

    #[test]
    fn edit_accepts_wrapped_or_bare_args() {
        let wrapped = HumanResponse::new("edit", Some(json!({"args": {"to": "x"}})));
        assert_eq!(wrapped.into_verdict().unwrap(), Verdict::Edit(json!({"to": "x"})));

        let bare = HumanResponse::new("edit", Some(json!({"to": "y"})));
        assert_eq!(bare.into_verdict().unwrap(), Verdict::Edit(json!({"to": "y"})));

        let missing = HumanResponse::new("edit", None);
        assert!(matches!(
            missing.into_verdict(),
            Err(WorkflowError::InvalidVerdictPayload { .. })
        ));
    }

    #[test]
    fn response_requires_feedback() {
        let ok = HumanResponse::new("response", Some(json!("Tuesday works")));
        assert_eq!(ok.into_verdict().unwrap(), Verdict::Response("Tuesday works".into()));

        let structured = HumanResponse::new("response", Some(json!({"note": 1})));
        assert_eq!(
            structured.into_verdict().unwrap(),
            Verdict::Response("{\"note\":1}".into())
        );

        assert!(HumanResponse::new("response", None).into_verdict().is_err());
    }

    #[test]
    fn unknown_verdict_type_is_rejected() {
        let err = HumanResponse::new("approve", None).into_verdict().unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownVerdict { ref kind } if kind == "approve"));
    }

    #[test]
    fn tool_review_description_renders_draft() {
        let args = json!({"to": "alice@company.com", "subject": "Re: Docs", "content": "Here they are"});
        let request = ReviewRequest::for_tool_call(
            ToolKind::WriteEmail,
            "call_1",
            &args,
            &email(),
            AllowedVerdicts::all(),
        );
        assert!(request.description.starts_with("**Subject**: Docs"));
        assert!(request.description.contains("# Email Draft"));
        assert!(request.description.ends_with("Here they are"));
        assert_eq!(request.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn notify_review_allows_only_ignore_and_respond() {
        let request = ReviewRequest::for_notify(&email());
        assert_eq!(request.action, NOTIFY_ACTION);
        assert!(!request.allowed_actions.allow_accept);
        assert!(!request.allowed_actions.allow_edit);
        assert!(request.allowed_actions.allow_ignore);
        assert!(request.allowed_actions.allow_respond);
    }
}
