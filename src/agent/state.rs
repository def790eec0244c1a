//! Workflow state machine and the persisted thread snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::conversation::Conversation;
use crate::agent::review::ReviewRequest;
use crate::error::WorkflowError;
use crate::llm::TokenUsage;
use crate::pipeline::types::{Classification, Email};
use crate::tools::tool::ToolKind;

/// Response text when a run produced nothing to show.
pub const NO_RESPONSE: &str = "No response generated";

/// State of a workflow thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Classifying or selecting/dispatching tools.
    Running,
    /// Suspended on exactly one pending review.
    AwaitingReview,
    /// A verdict is being applied.
    Resumed,
    Completed,
    /// A fatal error ended the run.
    Failed,
}

impl RunState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: RunState) -> bool {
        use RunState::*;

        matches!(
            (self, target),
            (Running, AwaitingReview) | (Running, Completed) | (Running, Failed) |
            (AwaitingReview, Resumed) | (AwaitingReview, Failed) |
            (Resumed, Running) | (Resumed, Completed) | (Resumed, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::AwaitingReview => "awaiting_review",
            Self::Resumed => "resumed",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A state transition event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: RunState,
    pub to: RunState,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Whether the run may suspend for human review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Direct,
    Hitl,
}

/// Where a snapshot continues from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    Triage,
    /// Waiting on the human's disposition of a `notify` email.
    TriageReview,
    SelectTool,
    /// Dispatching the latest assistant message's calls, starting at
    /// `next_index`.
    DispatchTools { next_index: usize },
    Finished,
}

/// A tool that actually ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedAction {
    pub tool_call_id: String,
    pub tool: String,
    pub output: String,
}

/// Final outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub classification: Classification,
    pub response: String,
    pub reasoning: String,
}

/// Everything needed to resume a thread, persisted as one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub thread_id: Uuid,
    pub mode: Mode,
    pub email: Email,
    pub classification: Option<Classification>,
    pub triage_reasoning: Option<String>,
    pub conversation: Conversation,
    pub state: RunState,
    pub stage: Stage,
    /// Present exactly when `state` is `AwaitingReview`.
    pub pending: Option<ReviewRequest>,
    pub actions: Vec<ExecutedAction>,
    /// Tool-selection rounds used so far.
    pub rounds: u32,
    pub usage: TokenUsage,
    pub error: Option<String>,
    pub transitions: Vec<StateTransition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ThreadSnapshot {
    pub fn new(mode: Mode, email: Email) -> Self {
        let now = Utc::now();
        Self {
            thread_id: Uuid::new_v4(),
            mode,
            email,
            classification: None,
            triage_reasoning: None,
            conversation: Conversation::new(),
            state: RunState::Running,
            stage: Stage::Triage,
            pending: None,
            actions: Vec::new(),
            rounds: 0,
            usage: TokenUsage::default(),
            error: None,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to a new state, recording the event.
    pub fn transition_to(
        &mut self,
        new_state: RunState,
        reason: Option<String>,
    ) -> Result<(), WorkflowError> {
        if !self.state.can_transition_to(new_state) {
            return Err(WorkflowError::InvalidTransition {
                id: self.thread_id,
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }

        let now = Utc::now();
        self.transitions.push(StateTransition {
            from: self.state,
            to: new_state,
            timestamp: now,
            reason,
        });
        self.state = new_state;
        self.updated_at = now;
        Ok(())
    }

    /// Suspend on a review.
    pub fn suspend(&mut self, review: ReviewRequest) -> Result<(), WorkflowError> {
        self.transition_to(RunState::AwaitingReview, Some(review.action.clone()))?;
        self.pending = Some(review);
        Ok(())
    }

    /// End the run successfully.
    pub fn complete(&mut self, reason: &str) -> Result<(), WorkflowError> {
        self.transition_to(RunState::Completed, Some(reason.to_string()))?;
        self.stage = Stage::Finished;
        self.pending = None;
        Ok(())
    }

    /// Mark the run failed. Never fails itself: a snapshot that is already
    /// terminal keeps its state.
    pub fn fail(&mut self, error: &str) {
        if self.state.can_transition_to(RunState::Failed) {
            let _ = self.transition_to(RunState::Failed, Some(error.to_string()));
        }
        self.stage = Stage::Finished;
        self.pending = None;
        self.error = Some(error.to_string());
        self.updated_at = Utc::now();
    }

    pub fn record_action(&mut self, tool_call_id: &str, tool: ToolKind, output: &str) {
        self.actions.push(ExecutedAction {
            tool_call_id: tool_call_id.to_string(),
            tool: tool.name().to_string(),
            output: output.to_string(),
        });
    }

    /// Text shown as the run's response: the last email or meeting that was
    /// actually executed, else the last assistant text.
    pub fn response_text(&self) -> String {
        let drafted = self.actions.iter().rev().find(|a| {
            a.tool == ToolKind::WriteEmail.name() || a.tool == ToolKind::ScheduleMeeting.name()
        });
        if let Some(action) = drafted {
            return action.output.clone();
        }

        self.conversation
            .last_assistant()
            .map(|(_, m)| m.content)
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| NO_RESPONSE.to_string())
    }

    /// Final result, once the run has been classified.
    pub fn result(&self) -> Option<TriageResult> {
        Some(TriageResult {
            classification: self.classification?,
            response: self.response_text(),
            reasoning: self.triage_reasoning.clone().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::review::ReviewRequest;

    fn snapshot() -> ThreadSnapshot {
        ThreadSnapshot::new(
            Mode::Hitl,
            Email {
                author: "a".into(),
                to: "b".into(),
                subject: "s".into(),
                email_thread: "t".into(),
            },
        )
    }

    #[test]
    fn test_state_transitions() {
        assert!(RunState::Running.can_transition_to(RunState::AwaitingReview));
        assert!(RunState::AwaitingReview.can_transition_to(RunState::Resumed));
        assert!(RunState::Resumed.can_transition_to(RunState::Running));
        assert!(!RunState::Completed.can_transition_to(RunState::Running));
        assert!(!RunState::AwaitingReview.can_transition_to(RunState::Completed));
        assert!(!RunState::Failed.can_transition_to(RunState::Failed));
    }

    #[test]
    fn test_terminal_states() {
        assert!(RunState::Completed.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::AwaitingReview.is_terminal());
    }

    #[test]
    fn suspend_records_pending_and_history() {
        let mut snap = snapshot();
        snap.suspend(ReviewRequest::for_notify(&snap.email.clone())).unwrap();
        assert_eq!(snap.state, RunState::AwaitingReview);
        assert!(snap.pending.is_some());
        assert_eq!(snap.transitions.len(), 1);

        let err = snap.complete("skip").unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn fail_is_idempotent() {
        let mut snap = snapshot();
        snap.fail("boom");
        snap.fail("again");
        assert_eq!(snap.state, RunState::Failed);
        assert_eq!(snap.transitions.len(), 1);
        assert_eq!(snap.error.as_deref(), Some("again"));
    }

    #[test]
    fn response_prefers_executed_draft() {
        let mut snap = snapshot();
        snap.classification = Some(Classification::Respond);
        assert_eq!(snap.result().unwrap().response, NO_RESPONSE);

        snap.record_action("c1", ToolKind::CheckCalendarAvailability, "free");
        snap.record_action("c2", ToolKind::WriteEmail, "Email sent to x with subject 'y'");
        snap.record_action("c3", ToolKind::Done, "Task complete.");
        assert_eq!(snap.response_text(), "Email sent to x with subject 'y'");
    }
}
