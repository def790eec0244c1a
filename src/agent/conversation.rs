//! Append-only conversation log.
//!
//! History is never edited in place. Correcting a tool call appends a
//! `Supersede` entry; `messages()` materializes the view the model sees by
//! replaying the log.

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::llm::provider::{ChatMessage, Role, ToolCall};

/// One log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum LogEntry {
    Message(ChatMessage),
    /// Replace the call with `tool_call.id` inside message `message_index`.
    Supersede {
        message_index: usize,
        tool_call: ToolCall,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    entries: Vec<LogEntry>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of messages (supersede entries excluded).
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, LogEntry::Message(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a message. Tool results must answer a call in the most recent
    /// assistant message.
    pub fn push(&mut self, message: ChatMessage) -> Result<(), WorkflowError> {
        if message.role == Role::Tool {
            let id = message.tool_call_id.clone().unwrap_or_default();
            let answers_call = self
                .last_assistant()
                .is_some_and(|(_, assistant)| assistant.calls().iter().any(|c| c.id == id));
            if !answers_call {
                return Err(WorkflowError::OrphanToolResult { tool_call_id: id });
            }
        }
        self.entries.push(LogEntry::Message(message));
        Ok(())
    }

    pub fn push_tool_result(
        &mut self,
        tool_call_id: &str,
        name: &str,
        content: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        self.push(ChatMessage::tool_result(tool_call_id, name, content))
    }

    /// Replace one call (matched by id) in the most recent assistant message.
    pub fn supersede_tool_call(&mut self, tool_call: ToolCall) -> Result<(), WorkflowError> {
        let message_index = self
            .last_assistant()
            .filter(|(_, assistant)| assistant.calls().iter().any(|c| c.id == tool_call.id))
            .map(|(index, _)| index)
            .ok_or_else(|| WorkflowError::ToolCallNotFound {
                tool_call_id: tool_call.id.clone(),
            })?;

        self.entries.push(LogEntry::Supersede {
            message_index,
            tool_call,
        });
        Ok(())
    }

    /// Materialized message list with every supersede applied.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages: Vec<ChatMessage> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match entry {
                LogEntry::Message(message) => messages.push(message.clone()),
                LogEntry::Supersede {
                    message_index,
                    tool_call,
                } => {
                    if let Some(calls) = messages
                        .get_mut(*message_index)
                        .and_then(|m| m.tool_calls.as_mut())
                        && let Some(slot) = calls.iter_mut().find(|c| c.id == tool_call.id)
                    {
                        *slot = tool_call.clone();
                    }
                }
            }
        }
        messages
    }

    /// Most recent assistant message (materialized) and its message index.
    pub fn last_assistant(&self) -> Option<(usize, ChatMessage)> {
        self.messages()
            .into_iter()
            .enumerate()
            .rev()
            .find(|(_, m)| m.role == Role::Assistant)
    }

    /// Materialized tool calls of the most recent assistant message.
    pub fn pending_calls(&self) -> Vec<ToolCall> {
        self.last_assistant()
            .map(|(_, m)| m.calls().to_vec())
            .unwrap_or_default()
    }
}
