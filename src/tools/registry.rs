//! Tool registry: the set of tools offered to the model in one mode.

use tracing::debug;

use crate::error::{ToolError, WorkflowError};
use crate::llm::ToolDefinition;
use crate::tools::tool::ToolKind;

/// Tools available to the response loop.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    kinds: Vec<ToolKind>,
}

impl ToolRegistry {
    /// Tools for the human-in-the-loop assistant (includes `Question`).
    pub fn hitl() -> Self {
        Self {
            kinds: ToolKind::ALL.to_vec(),
        }
    }

    /// Tools for the direct assistant. Without a human there is nobody to
    /// answer a `Question`.
    pub fn direct() -> Self {
        Self {
            kinds: ToolKind::ALL
                .into_iter()
                .filter(|kind| *kind != ToolKind::Question)
                .collect(),
        }
    }

    /// Resolve a proposed tool name. Names outside this registry are a
    /// contract violation by the model.
    pub fn resolve(&self, name: &str) -> Result<ToolKind, WorkflowError> {
        ToolKind::from_name(name)
            .filter(|kind| self.kinds.contains(kind))
            .ok_or_else(|| WorkflowError::UnknownTool {
                name: name.to_string(),
            })
    }

    pub fn kinds(&self) -> &[ToolKind] {
        &self.kinds
    }

    /// Get tool definitions for LLM function calling.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.kinds.iter().map(ToolKind::definition).collect()
    }

    /// Numbered tool listing for the agent system prompt.
    pub fn tools_prompt(&self) -> String {
        self.kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| format!("{}. {}", i + 1, kind.prompt_line()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Execute a resolved tool with the given arguments.
    pub fn execute(&self, kind: ToolKind, args: &serde_json::Value) -> Result<String, ToolError> {
        if !self.kinds.contains(&kind) {
            return Err(ToolError::NotFound {
                name: kind.name().to_string(),
            });
        }
        let output = kind.execute(args)?;
        debug!(tool = %kind, output = %output, "Tool executed");
        Ok(output)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::hitl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_registry_excludes_question() {
        let registry = ToolRegistry::direct();
        assert!(registry.resolve("Question").is_err());
        assert_eq!(registry.resolve("Done").unwrap(), ToolKind::Done);
        assert_eq!(registry.tool_definitions().len(), 4);
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = ToolRegistry::hitl().resolve("send_slack").unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownTool { ref name } if name == "send_slack"));
    }

    #[test]
    fn tools_prompt_is_numbered() {
        let prompt = ToolRegistry::hitl().tools_prompt();
        assert!(prompt.starts_with("1. write_email("));
        assert!(prompt.contains("4. Question(content)"));
    }

    #[test]
    fn execute_refuses_tools_outside_registry() {
        let err = ToolRegistry::direct()
            .execute(ToolKind::Question, &serde_json::json!({"content": "?"}))
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }
}
