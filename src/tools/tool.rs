//! The closed set of assistant tools.
//!
//! `ToolKind` is the one place that knows, per tool, its wire name, its JSON
//! schema, whether a human must review it and with which verdicts, which
//! preference profile its feedback trains, and how it executes. Every
//! question about a tool is answered by an exhaustive `match` here.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::agent::review::{AllowedVerdicts, VerdictKind};
use crate::error::ToolError;
use crate::llm::ToolDefinition;
use crate::store::memory::Namespace;

/// Every tool the assistant can propose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    WriteEmail,
    ScheduleMeeting,
    CheckCalendarAvailability,
    Question,
    Done,
}

/// Whether a proposed call runs immediately or waits for a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewPolicy {
    Auto,
    Review(AllowedVerdicts),
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::WriteEmail,
        ToolKind::ScheduleMeeting,
        ToolKind::CheckCalendarAvailability,
        ToolKind::Question,
        ToolKind::Done,
    ];

    /// Name the model uses in tool calls.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WriteEmail => "write_email",
            Self::ScheduleMeeting => "schedule_meeting",
            Self::CheckCalendarAvailability => "check_calendar_availability",
            Self::Question => "Question",
            Self::Done => "Done",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn review_policy(&self) -> ReviewPolicy {
        match self {
            Self::WriteEmail | Self::ScheduleMeeting => ReviewPolicy::Review(AllowedVerdicts::all()),
            Self::Question => ReviewPolicy::Review(AllowedVerdicts::of(&[
                VerdictKind::Ignore,
                VerdictKind::Response,
            ])),
            Self::CheckCalendarAvailability | Self::Done => ReviewPolicy::Auto,
        }
    }

    /// Profile trained by edits and feedback on this tool.
    pub fn preference_namespace(&self) -> Option<Namespace> {
        match self {
            Self::WriteEmail => Some(Namespace::ResponsePreferences),
            Self::ScheduleMeeting => Some(Namespace::CalendarPreferences),
            Self::CheckCalendarAvailability | Self::Question | Self::Done => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::WriteEmail => "Write and send an email.",
            Self::ScheduleMeeting => "Schedule a calendar meeting.",
            Self::CheckCalendarAvailability => "Check calendar availability for a given day.",
            Self::Question => "Question to ask user.",
            Self::Done => "E-mail has been sent.",
        }
    }

    /// One line for the tool listing in the agent system prompt.
    pub fn prompt_line(&self) -> &'static str {
        match self {
            Self::WriteEmail => "write_email(to, subject, content) - Send emails to specified recipients",
            Self::ScheduleMeeting => {
                "schedule_meeting(attendees, subject, duration_minutes, preferred_day, start_time) - Schedule calendar meetings where preferred_day is a datetime object"
            }
            Self::CheckCalendarAvailability => {
                "check_calendar_availability(day) - Check available time slots for a given day"
            }
            Self::Question => "Question(content) - Ask the user any follow-up questions",
            Self::Done => "Done - E-mail has been sent",
        }
    }

    pub fn parameters_schema(&self) -> Value {
        match self {
            Self::WriteEmail => serde_json::json!({
                "type": "object",
                "properties": {
                    "to": {"type": "string", "description": "Recipient email address"},
                    "subject": {"type": "string", "description": "Email subject line"},
                    "content": {"type": "string", "description": "Email body"}
                },
                "required": ["to", "subject", "content"]
            }),
            Self::ScheduleMeeting => serde_json::json!({
                "type": "object",
                "properties": {
                    "attendees": {"type": "array", "items": {"type": "string"}},
                    "subject": {"type": "string"},
                    "duration_minutes": {"type": "integer"},
                    "preferred_day": {"type": "string", "description": "ISO 8601 date or datetime"},
                    "start_time": {"type": "integer", "description": "Hour of day, 24h clock"}
                },
                "required": ["attendees", "subject", "duration_minutes", "preferred_day", "start_time"]
            }),
            Self::CheckCalendarAvailability => serde_json::json!({
                "type": "object",
                "properties": {
                    "day": {"type": "string", "description": "Day to check"}
                },
                "required": ["day"]
            }),
            Self::Question => serde_json::json!({
                "type": "object",
                "properties": {
                    "content": {"type": "string", "description": "The question to ask"}
                },
                "required": ["content"]
            }),
            Self::Done => serde_json::json!({
                "type": "object",
                "properties": {
                    "done": {"type": "boolean"}
                },
                "required": ["done"]
            }),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }

    /// Run the simulated tool. `Question` has no executor; its result always
    /// comes from the human.
    pub fn execute(&self, args: &Value) -> Result<String, ToolError> {
        match self {
            Self::WriteEmail => {
                let args: WriteEmailArgs = parse_args(self, args)?;
                Ok(format!(
                    "Email sent to {} with subject '{}'",
                    args.to, args.subject
                ))
            }
            Self::ScheduleMeeting => {
                let args: ScheduleMeetingArgs = parse_args(self, args)?;
                let day = parse_day(self, &args.preferred_day)?;
                Ok(format!(
                    "Meeting '{}' scheduled on {} at {}:00",
                    args.subject,
                    day.format("%A, %B %d, %Y"),
                    args.start_time
                ))
            }
            Self::CheckCalendarAvailability => {
                let args: CheckCalendarArgs = parse_args(self, args)?;
                Ok(format!(
                    "All attendees available on {} between 9:00-17:00",
                    args.day
                ))
            }
            Self::Question => Err(ToolError::NotExecutable {
                name: self.name().to_string(),
                reason: "questions are answered by the user".to_string(),
            }),
            Self::Done => Ok("Task complete.".to_string()),
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Typed arguments ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WriteEmailArgs {
    pub to: String,
    pub subject: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleMeetingArgs {
    pub attendees: Vec<String>,
    pub subject: String,
    pub duration_minutes: u32,
    pub preferred_day: String,
    pub start_time: u32,
}

#[derive(Debug, Deserialize)]
pub struct CheckCalendarArgs {
    pub day: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionArgs {
    pub content: String,
}

pub fn parse_args<T: DeserializeOwned>(kind: &ToolKind, args: &Value) -> Result<T, ToolError> {
    serde_json::from_value(args.clone()).map_err(|e| ToolError::InvalidParameters {
        name: kind.name().to_string(),
        reason: e.to_string(),
    })
}

/// Accepts `YYYY-MM-DD`, a naive ISO datetime, or RFC 3339.
fn parse_day(kind: &ToolKind, raw: &str) -> Result<NaiveDate, ToolError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    Err(ToolError::InvalidParameters {
        name: kind.name().to_string(),
        reason: format!("preferred_day '{raw}' is not an ISO 8601 date"),
    })
}
