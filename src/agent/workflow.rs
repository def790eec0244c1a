//! Workflow orchestrator: classifier → response loop → review, driven as an
//! explicit state machine over a persisted `ThreadSnapshot`.
//!
//! Suspension is "save the snapshot and return". Resume loads the snapshot,
//! applies the verdict, and keeps driving from the saved stage.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::controller::{Disposition, InterruptController};
use crate::agent::preferences::{LlmPreferenceSummarizer, PreferenceSummarizer, PreferenceUpdater};
use crate::agent::review::{HumanResponse, ReviewRequest};
use crate::agent::state::{Mode, RunState, Stage, ThreadSnapshot, TriageResult};
use crate::error::{DatabaseError, Error, WorkflowError};
use crate::llm::provider::{ChatMessage, LlmProvider};
use crate::llm::reasoning::{Reasoning, ReasoningContext, RespondResult};
use crate::pipeline::classifier::{Classifier, respond_seed};
use crate::pipeline::prompts::{DEFAULT_BACKGROUND, agent_system_prompt};
use crate::pipeline::types::{Classification, Email};
use crate::store::memory::{MemoryStore, Namespace};
use crate::store::traits::Database;
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::ToolKind;

/// Tool-selection rounds allowed per run.
pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 25;

/// Tunables for the assistant.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Who the assistant works for.
    pub background: String,
    pub max_tool_rounds: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

/// Result of starting or resuming a HITL thread.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Interrupted {
        thread_id: Uuid,
        review: ReviewRequest,
    },
    Completed {
        thread_id: Uuid,
        result: TriageResult,
    },
}

/// Marks a thread as being resumed; released on drop.
struct BusyGuard<'a> {
    busy: &'a Mutex<HashSet<Uuid>>,
    thread_id: Uuid,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
        busy.remove(&self.thread_id);
    }
}

/// The email assistant in both its direct and human-in-the-loop forms.
pub struct EmailAssistant {
    llm: Arc<dyn LlmProvider>,
    db: Arc<dyn Database>,
    memory: MemoryStore,
    classifier: Classifier,
    hitl: InterruptController,
    direct: InterruptController,
    settings: WorkflowSettings,
    busy: Mutex<HashSet<Uuid>>,
}

impl EmailAssistant {
    /// Create an assistant whose preference summaries come from `llm`.
    pub fn new(llm: Arc<dyn LlmProvider>, db: Arc<dyn Database>, settings: WorkflowSettings) -> Self {
        let summarizer = Arc::new(LlmPreferenceSummarizer::new(Arc::clone(&llm)));
        Self::with_summarizer(llm, db, settings, summarizer)
    }

    pub fn with_summarizer(
        llm: Arc<dyn LlmProvider>,
        db: Arc<dyn Database>,
        settings: WorkflowSettings,
        summarizer: Arc<dyn PreferenceSummarizer>,
    ) -> Self {
        let memory = MemoryStore::new(Arc::clone(&db));
        let updater = PreferenceUpdater::new(memory.clone(), summarizer);
        Self {
            classifier: Classifier::new(Arc::clone(&llm), settings.background.clone()),
            hitl: InterruptController::new(ToolRegistry::hitl(), updater.clone()),
            direct: InterruptController::new(ToolRegistry::direct(), updater),
            llm,
            db,
            memory,
            settings,
            busy: Mutex::new(HashSet::new()),
        }
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    // ── Direct mode ─────────────────────────────────────────────────

    /// Run an email start to finish without human review.
    pub async fn process_email(&self, email: Email) -> Result<TriageResult, Error> {
        let snapshot = self.run_direct(email).await?;
        snapshot.result().ok_or_else(|| {
            Error::Workflow(WorkflowError::InvalidClassification(
                "run finished without a classification".to_string(),
            ))
        })
    }

    /// Direct run returning the full final snapshot.
    pub async fn run_direct(&self, email: Email) -> Result<ThreadSnapshot, Error> {
        let mut snapshot = ThreadSnapshot::new(Mode::Direct, email);
        info!(thread_id = %snapshot.thread_id, mode = "direct", "Processing email");
        if let Err(e) = self.advance(&mut snapshot).await {
            warn!(thread_id = %snapshot.thread_id, error = %e, "Run failed");
            return Err(e);
        }
        Ok(snapshot)
    }

    // ── HITL mode ───────────────────────────────────────────────────

    /// Start a new thread; runs until the first review or completion.
    pub async fn start(&self, email: Email) -> Result<RunOutcome, Error> {
        let mut snapshot = ThreadSnapshot::new(Mode::Hitl, email);
        info!(thread_id = %snapshot.thread_id, mode = "hitl", "Processing email");
        let result = self.advance(&mut snapshot).await;
        self.settle(snapshot, result).await
    }

    /// Resume a suspended thread with the human's verdict.
    pub async fn resume(&self, thread_id: Uuid, response: HumanResponse) -> Result<RunOutcome, Error> {
        let _guard = self.acquire(thread_id)?;

        let mut snapshot = self.thread(thread_id).await?;
        if snapshot.state.is_terminal() {
            return Err(WorkflowError::ThreadFinished { id: thread_id }.into());
        }
        if snapshot.state != RunState::AwaitingReview {
            return Err(WorkflowError::NotAwaitingReview { id: thread_id }.into());
        }
        let Some(pending) = snapshot.pending.take() else {
            return Err(WorkflowError::NotAwaitingReview { id: thread_id }.into());
        };

        info!(thread_id = %thread_id, verdict = %response.kind, action = %pending.action, "Resuming thread");
        let result = self.apply_and_continue(&mut snapshot, &pending, response).await;
        self.settle(snapshot, result).await
    }

    /// Stored snapshot of a thread.
    pub async fn thread(&self, thread_id: Uuid) -> Result<ThreadSnapshot, Error> {
        let value = self
            .db
            .load_checkpoint(thread_id)
            .await?
            .ok_or(WorkflowError::ThreadNotFound { id: thread_id })?;
        serde_json::from_value(value)
            .map_err(|e| Error::Database(DatabaseError::Serialization(format!("snapshot: {e}"))))
    }

    fn acquire(&self, thread_id: Uuid) -> Result<BusyGuard<'_>, WorkflowError> {
        let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
        if !busy.insert(thread_id) {
            return Err(WorkflowError::ThreadBusy { id: thread_id });
        }
        Ok(BusyGuard {
            busy: &self.busy,
            thread_id,
        })
    }

    /// Persist the snapshot and turn it into an outcome. Fatal errors mark
    /// the thread failed before it is saved.
    async fn settle(
        &self,
        mut snapshot: ThreadSnapshot,
        result: Result<(), Error>,
    ) -> Result<RunOutcome, Error> {
        if let Err(e) = result {
            warn!(thread_id = %snapshot.thread_id, error = %e, "Run failed");
            snapshot.fail(&e.to_string());
            self.save(&snapshot).await?;
            return Err(e);
        }

        self.save(&snapshot).await?;
        let thread_id = snapshot.thread_id;
        if snapshot.state == RunState::AwaitingReview
            && let Some(review) = snapshot.pending.take()
        {
            info!(thread_id = %thread_id, action = %review.action, "Awaiting review");
            return Ok(RunOutcome::Interrupted { thread_id, review });
        }

        let result = snapshot
            .result()
            .ok_or_else(|| WorkflowError::InvalidClassification(String::new()))?;
        info!(thread_id = %thread_id, classification = %result.classification, "Thread completed");
        Ok(RunOutcome::Completed { thread_id, result })
    }

    async fn save(&self, snapshot: &ThreadSnapshot) -> Result<(), Error> {
        let value = serde_json::to_value(snapshot)
            .map_err(|e| DatabaseError::Serialization(format!("snapshot: {e}")))?;
        self.db
            .save_checkpoint(snapshot.thread_id, &snapshot.state.to_string(), &value)
            .await?;
        Ok(())
    }

    fn controller(&self, mode: Mode) -> &InterruptController {
        match mode {
            Mode::Direct => &self.direct,
            Mode::Hitl => &self.hitl,
        }
    }

    // ── State machine ───────────────────────────────────────────────

    async fn apply_and_continue(
        &self,
        snapshot: &mut ThreadSnapshot,
        pending: &ReviewRequest,
        response: HumanResponse,
    ) -> Result<(), Error> {
        snapshot.transition_to(RunState::Resumed, Some(response.kind.clone()))?;
        let verdict = response.into_verdict()?;
        let controller = self.controller(snapshot.mode);

        let disposition = match snapshot.stage {
            Stage::TriageReview => {
                let disposition = controller
                    .apply_notify_verdict(snapshot, pending, verdict)
                    .await?;
                if disposition == Disposition::Continue {
                    snapshot.stage = Stage::SelectTool;
                }
                disposition
            }
            Stage::DispatchTools { next_index } => {
                let call = snapshot
                    .conversation
                    .pending_calls()
                    .get(next_index)
                    .cloned()
                    .filter(|call| pending.tool_call_id.as_deref() == Some(call.id.as_str()))
                    .ok_or_else(|| WorkflowError::ToolCallNotFound {
                        tool_call_id: pending.tool_call_id.clone().unwrap_or_default(),
                    })?;
                let kind = controller.tools().resolve(&call.name)?;
                let disposition = controller
                    .apply_tool_verdict(snapshot, pending, kind, &call, verdict)
                    .await?;
                if disposition == Disposition::Continue {
                    snapshot.stage = Stage::DispatchTools {
                        next_index: next_index + 1,
                    };
                }
                disposition
            }
            Stage::Triage | Stage::SelectTool | Stage::Finished => {
                return Err(WorkflowError::NotAwaitingReview {
                    id: snapshot.thread_id,
                }
                .into());
            }
        };

        match disposition {
            Disposition::Terminate => {
                snapshot.complete("ended by reviewer")?;
                Ok(())
            }
            Disposition::Continue => {
                snapshot.transition_to(RunState::Running, None)?;
                self.advance(snapshot).await
            }
        }
    }

    /// Drive the snapshot until it suspends or finishes.
    async fn advance(&self, snapshot: &mut ThreadSnapshot) -> Result<(), Error> {
        let controller = self.controller(snapshot.mode);

        loop {
            match snapshot.stage {
                Stage::Triage => self.triage(snapshot).await?,
                Stage::SelectTool => self.select_tools(snapshot, controller).await?,
                Stage::DispatchTools { next_index } => {
                    let calls = snapshot.conversation.pending_calls();
                    let Some(call) = calls.get(next_index) else {
                        snapshot.stage = Stage::SelectTool;
                        continue;
                    };
                    let kind = controller.tools().resolve(&call.name)?;

                    let review = match snapshot.mode {
                        Mode::Hitl => controller.review_for(kind, call, &snapshot.email),
                        Mode::Direct => None,
                    };
                    if let Some(review) = review {
                        snapshot.suspend(review)?;
                        return Ok(());
                    }

                    controller.execute(snapshot, kind, call)?;
                    snapshot.stage = Stage::DispatchTools {
                        next_index: next_index + 1,
                    };
                }
                Stage::TriageReview | Stage::Finished => return Ok(()),
            }

            if snapshot.state != RunState::Running {
                return Ok(());
            }
        }
    }

    async fn triage(&self, snapshot: &mut ThreadSnapshot) -> Result<(), Error> {
        let instructions = self.memory.preferences(Namespace::TriagePreferences).await?;
        let decision = self.classifier.classify(&snapshot.email, &instructions).await?;
        snapshot.classification = Some(decision.classification);
        snapshot.triage_reasoning = Some(decision.reasoning);

        match (decision.classification, snapshot.mode) {
            (Classification::Ignore, _) => {
                snapshot.complete("classified as ignore")?;
            }
            (Classification::Notify, Mode::Direct) => {
                snapshot.complete("classified as notify")?;
            }
            (Classification::Notify, Mode::Hitl) => {
                let review = ReviewRequest::for_notify(&snapshot.email);
                snapshot.stage = Stage::TriageReview;
                snapshot.suspend(review)?;
            }
            (Classification::Respond, _) => {
                let seed = respond_seed(&snapshot.email);
                snapshot.conversation.push(ChatMessage::user(seed))?;
                snapshot.stage = Stage::SelectTool;
            }
        }
        Ok(())
    }

    async fn select_tools(
        &self,
        snapshot: &mut ThreadSnapshot,
        controller: &InterruptController,
    ) -> Result<(), Error> {
        if snapshot.rounds >= self.settings.max_tool_rounds {
            return Err(WorkflowError::RoundLimitExceeded {
                limit: self.settings.max_tool_rounds,
            }
            .into());
        }
        snapshot.rounds += 1;

        let response_preferences = self.memory.preferences(Namespace::ResponsePreferences).await?;
        let cal_preferences = self.memory.preferences(Namespace::CalendarPreferences).await?;
        let registry = controller.tools();

        let reasoning = Reasoning::new(Arc::clone(&self.llm)).with_system_prompt(agent_system_prompt(
            &registry.tools_prompt(),
            &self.settings.background,
            &response_preferences,
            &cal_preferences,
        ));
        let context = ReasoningContext::new()
            .with_messages(snapshot.conversation.messages())
            .with_tools(registry.tool_definitions())
            .requiring_tool_call();

        let output = reasoning.respond_with_tools(&context).await?;
        snapshot.usage.add(output.usage);
        debug!(
            thread_id = %snapshot.thread_id,
            round = snapshot.rounds,
            tokens = output.usage.total(),
            cost = %output.usage.cost(self.llm.as_ref()),
            "Tool selection round"
        );

        match output.result {
            RespondResult::Text(text) => {
                snapshot.conversation.push(ChatMessage::assistant(text))?;
                snapshot.complete("model answered without tools")?;
            }
            RespondResult::ToolCalls {
                tool_calls,
                content,
            } => {
                let mut kinds = Vec::with_capacity(tool_calls.len());
                for call in &tool_calls {
                    kinds.push(registry.resolve(&call.name)?);
                }
                info!(
                    thread_id = %snapshot.thread_id,
                    tools = ?tool_calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                    "Model proposed tools"
                );
                snapshot
                    .conversation
                    .push(ChatMessage::assistant_with_tool_calls(content, tool_calls))?;

                if kinds.iter().all(|kind| *kind == ToolKind::Done) {
                    snapshot.complete("done")?;
                } else {
                    snapshot.stage = Stage::DispatchTools { next_index: 0 };
                }
            }
        }
        Ok(())
    }
}
