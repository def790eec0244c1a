//! Agent module: thread state machine, human review, and preference learning.

pub mod controller;
pub mod conversation;
pub mod preferences;
pub mod review;
pub mod state;
pub mod workflow;

pub use controller::{Disposition, InterruptController};
pub use conversation::{Conversation, LogEntry};
pub use preferences::{LlmPreferenceSummarizer, PreferenceSummarizer, PreferenceUpdater, UserPreferences};
pub use review::{AllowedVerdicts, HumanResponse, ReviewRequest, Verdict, VerdictKind};
pub use state::{Mode, RunState, Stage, ThreadSnapshot, TriageResult};
pub use workflow::{EmailAssistant, RunOutcome, WorkflowSettings};
