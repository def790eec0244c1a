//! Interrupt/resume controller: raises reviews and applies human verdicts.
//!
//! Verdict effects by tool kind:
//!
//! | kind                          | accept  | edit                      | ignore                | response                  |
//! |-------------------------------|---------|---------------------------|-----------------------|---------------------------|
//! | write_email, schedule_meeting | execute | supersede, execute, learn | refuse, end, triage   | feedback result, learn    |
//! | Question                      | -       | -                         | ignored, end, triage  | answer result             |
//! | triage notify                 | -       | -                         | end, triage           | seed response, triage     |

use serde_json::Value;
use tracing::info;

use crate::agent::preferences::PreferenceUpdater;
use crate::agent::review::{ReviewRequest, Verdict};
use crate::agent::state::ThreadSnapshot;
use crate::error::{Error, WorkflowError};
use crate::llm::provider::{ChatMessage, ToolCall};
use crate::pipeline::classifier::notify_response_seed;
use crate::pipeline::prompts::MEMORY_UPDATE_REINFORCEMENT;
use crate::pipeline::types::Email;
use crate::store::memory::Namespace;
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::{ReviewPolicy, ToolKind};

/// What the run does after a verdict has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    Terminate,
}

pub struct InterruptController {
    tools: ToolRegistry,
    preferences: PreferenceUpdater,
}

impl InterruptController {
    pub fn new(tools: ToolRegistry, preferences: PreferenceUpdater) -> Self {
        Self { tools, preferences }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Review to raise for a proposed call, `None` when the tool runs
    /// without one.
    pub fn review_for(&self, kind: ToolKind, call: &ToolCall, email: &Email) -> Option<ReviewRequest> {
        match kind.review_policy() {
            ReviewPolicy::Auto => None,
            ReviewPolicy::Review(allowed) => Some(ReviewRequest::for_tool_call(
                kind,
                &call.id,
                &call.arguments,
                email,
                allowed,
            )),
        }
    }

    /// Run an auto-executed call and record its result.
    pub fn execute(
        &self,
        snapshot: &mut ThreadSnapshot,
        kind: ToolKind,
        call: &ToolCall,
    ) -> Result<(), Error> {
        let output = self.tools.execute(kind, &call.arguments)?;
        snapshot
            .conversation
            .push_tool_result(&call.id, kind.name(), output.as_str())?;
        snapshot.record_action(&call.id, kind, &output);
        Ok(())
    }

    /// Apply a verdict to the reviewed tool call.
    pub async fn apply_tool_verdict(
        &self,
        snapshot: &mut ThreadSnapshot,
        pending: &ReviewRequest,
        kind: ToolKind,
        call: &ToolCall,
        verdict: Verdict,
    ) -> Result<Disposition, Error> {
        pending.allowed_actions.check(verdict.kind(), &pending.action)?;
        info!(
            thread_id = %snapshot.thread_id,
            tool = %kind,
            verdict = %verdict.kind(),
            "Applying verdict"
        );

        match verdict {
            Verdict::Accept => {
                self.execute(snapshot, kind, call)?;
                Ok(Disposition::Continue)
            }
            Verdict::Edit(edited) => {
                let revised = ToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: edited.clone(),
                };
                snapshot.conversation.supersede_tool_call(revised.clone())?;
                self.execute(snapshot, kind, &revised)?;

                if let Some(namespace) = kind.preference_namespace() {
                    let note = edit_feedback(kind, &call.arguments, &edited);
                    self.learn(namespace, &snapshot.email, note).await?;
                }
                Ok(Disposition::Continue)
            }
            Verdict::Ignore => {
                snapshot
                    .conversation
                    .push_tool_result(&call.id, kind.name(), ignore_result(kind))?;
                self.learn(
                    Namespace::TriagePreferences,
                    &snapshot.email,
                    ignore_feedback(kind),
                )
                .await?;
                Ok(Disposition::Terminate)
            }
            Verdict::Response(feedback) => {
                snapshot.conversation.push_tool_result(
                    &call.id,
                    kind.name(),
                    response_result(kind, &feedback),
                )?;
                if let Some(namespace) = kind.preference_namespace() {
                    let note = response_feedback(namespace, &feedback);
                    self.learn(namespace, &snapshot.email, note).await?;
                }
                Ok(Disposition::Continue)
            }
        }
    }

    /// Apply a verdict to the triage review of a `notify` email.
    pub async fn apply_notify_verdict(
        &self,
        snapshot: &mut ThreadSnapshot,
        pending: &ReviewRequest,
        verdict: Verdict,
    ) -> Result<Disposition, Error> {
        let verdict_kind = verdict.kind();
        pending.allowed_actions.check(verdict_kind, &pending.action)?;
        info!(
            thread_id = %snapshot.thread_id,
            verdict = %verdict_kind,
            "Applying triage verdict"
        );

        match verdict {
            Verdict::Ignore => {
                self.learn(
                    Namespace::TriagePreferences,
                    &snapshot.email,
                    format!(
                        "The user decided to ignore the email even though it was classified as notify. \
                         Update triage preferences to capture this. {MEMORY_UPDATE_REINFORCEMENT}"
                    ),
                )
                .await?;
                Ok(Disposition::Terminate)
            }
            Verdict::Response(feedback) => {
                let seed = notify_response_seed(&snapshot.email, &feedback);
                snapshot.conversation.push(ChatMessage::user(seed))?;
                self.learn(
                    Namespace::TriagePreferences,
                    &snapshot.email,
                    format!(
                        "The user decided to respond to the email, so update the triage preferences \
                         to capture this. {MEMORY_UPDATE_REINFORCEMENT}"
                    ),
                )
                .await?;
                Ok(Disposition::Continue)
            }
            Verdict::Accept | Verdict::Edit(_) => Err(WorkflowError::VerdictNotAllowed {
                verdict: verdict_kind.to_string(),
                action: pending.action.clone(),
            }
            .into()),
        }
    }

    async fn learn(&self, namespace: Namespace, email: &Email, note: String) -> Result<(), Error> {
        let feedback = [
            ChatMessage::user(format!("Email under review:\n{}", email.to_markdown())),
            ChatMessage::user(note),
        ];
        self.preferences.update(namespace, &feedback).await?;
        Ok(())
    }
}

fn ignore_result(kind: ToolKind) -> &'static str {
    match kind {
        ToolKind::ScheduleMeeting => {
            "User ignored this calendar meeting draft. Ignore this email and end the workflow."
        }
        ToolKind::Question => "User ignored this question. Ignore this email and end the workflow.",
        _ => "User ignored this email draft. Ignore this email and end the workflow.",
    }
}

fn response_result(kind: ToolKind, feedback: &str) -> String {
    match kind {
        ToolKind::ScheduleMeeting => format!(
            "User gave feedback, which can we incorporate into the meeting request. Feedback: {feedback}"
        ),
        ToolKind::Question => format!(
            "User answered the question, which can we can use for any follow up actions. Feedback: {feedback}"
        ),
        _ => format!(
            "User gave feedback, which can we incorporate into the email. Feedback: {feedback}"
        ),
    }
}

fn ignore_feedback(kind: ToolKind) -> String {
    let what = match kind {
        ToolKind::ScheduleMeeting => "The user ignored the calendar meeting draft.",
        ToolKind::Question => {
            "The user ignored the Question. That means they did not want to answer the question or deal with this email."
        }
        _ => "The user ignored the email draft. That means they did not want to respond to the email.",
    };
    format!(
        "{what} Update the triage preferences to ensure emails of this type are not classified as respond. \
         Follow all instructions above, and remember: {MEMORY_UPDATE_REINFORCEMENT}"
    )
}

fn edit_feedback(kind: ToolKind, original: &Value, edited: &Value) -> String {
    let (what, artifact) = match kind {
        ToolKind::ScheduleMeeting => ("calendar invitation", "calendar invitation"),
        _ => ("email response", "email"),
    };
    format!(
        "User edited the {what}. Here is the initial {artifact} generated by the assistant: {original}. \
         Here is the edited {artifact}: {edited}. Follow all instructions above, and remember: \
         {MEMORY_UPDATE_REINFORCEMENT}"
    )
}

fn response_feedback(namespace: Namespace, feedback: &str) -> String {
    let target = match namespace {
        Namespace::CalendarPreferences => "calendar preferences",
        _ => "response preferences",
    };
    format!(
        "User gave feedback, which we can use to update the {target}. Feedback: {feedback}. \
         Follow all instructions above, and remember: {MEMORY_UPDATE_REINFORCEMENT}"
    )
}
