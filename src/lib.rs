//! Triage Assist: an email triage assistant with human-in-the-loop review.

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod tools;
