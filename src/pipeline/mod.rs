//! Triage pipeline: email types, prompts, and the LLM classifier.
//!
//! Every email is classified exactly once per run. `respond` enters the
//! response loop, `ignore` ends the run, and `notify` either ends the run
//! (direct mode) or is surfaced to the human for disposition (HITL mode).

pub mod classifier;
pub mod prompts;
pub mod types;

pub use classifier::Classifier;
pub use types::{Classification, Email, RouterDecision};
