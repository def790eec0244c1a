//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::agent::workflow::{DEFAULT_MAX_TOOL_ROUNDS, WorkflowSettings};
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::pipeline::prompts::DEFAULT_BACKGROUND;

/// Assistant configuration.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub llm: LlmConfig,
    /// libSQL database file.
    pub db_path: PathBuf,
    /// HTTP listen port.
    pub port: u16,
    pub workflow: WorkflowSettings,
}

impl AssistantConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend: LlmBackend = match lookup("EMAIL_ASSISTANT_LLM_BACKEND") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "EMAIL_ASSISTANT_LLM_BACKEND".to_string(),
                message,
            })?,
            None => LlmBackend::OpenAi,
        };

        let key_var = match backend {
            LlmBackend::OpenAi => "OPENAI_API_KEY",
            LlmBackend::Anthropic => "ANTHROPIC_API_KEY",
        };
        let api_key = lookup(key_var)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let model = lookup("EMAIL_ASSISTANT_MODEL").unwrap_or_else(|| "gpt-4.1".to_string());

        let db_path = lookup("EMAIL_ASSISTANT_DB_PATH")
            .unwrap_or_else(|| "./data/email-assistant.db".to_string())
            .into();

        let port = parse_or("EMAIL_ASSISTANT_PORT", lookup("EMAIL_ASSISTANT_PORT"), 8000u16)?;

        let max_tool_rounds = parse_or(
            "EMAIL_ASSISTANT_MAX_TOOL_ROUNDS",
            lookup("EMAIL_ASSISTANT_MAX_TOOL_ROUNDS"),
            DEFAULT_MAX_TOOL_ROUNDS,
        )?;
        if max_tool_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "EMAIL_ASSISTANT_MAX_TOOL_ROUNDS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let background = lookup("EMAIL_ASSISTANT_BACKGROUND")
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string());

        Ok(Self {
            llm: LlmConfig {
                backend,
                api_key: SecretString::from(api_key),
                model,
            },
            db_path,
            port,
            workflow: WorkflowSettings {
                background,
                max_tool_rounds,
            },
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AssistantConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AssistantConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_openai_key() {
        let cfg = config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(cfg.llm.backend, LlmBackend::OpenAi);
        assert_eq!(cfg.llm.model, "gpt-4.1");
        assert_eq!(cfg.llm.api_key.expose_secret(), "sk-test");
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.db_path, PathBuf::from("./data/email-assistant.db"));
        assert_eq!(cfg.workflow.max_tool_rounds, 25);
        assert_eq!(cfg.workflow.background, DEFAULT_BACKGROUND);
    }

    #[test]
    fn anthropic_requires_its_own_key() {
        let err = config(&[
            ("EMAIL_ASSISTANT_LLM_BACKEND", "anthropic"),
            ("OPENAI_API_KEY", "sk-test"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "ANTHROPIC_API_KEY"));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = config(&[("OPENAI_API_KEY", "k"), ("EMAIL_ASSISTANT_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "EMAIL_ASSISTANT_PORT"));

        let err = config(&[("OPENAI_API_KEY", "k"), ("EMAIL_ASSISTANT_LLM_BACKEND", "mistral")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = config(&[("OPENAI_API_KEY", "k"), ("EMAIL_ASSISTANT_MAX_TOOL_ROUNDS", "0")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn overrides_apply() {
        let cfg = config(&[
            ("EMAIL_ASSISTANT_LLM_BACKEND", "Anthropic"),
            ("ANTHROPIC_API_KEY", "ant"),
            ("EMAIL_ASSISTANT_MODEL", "claude-3-5-sonnet-latest"),
            ("EMAIL_ASSISTANT_PORT", "9001"),
            ("EMAIL_ASSISTANT_BACKGROUND", "I run a bakery."),
        ])
        .unwrap();
        assert_eq!(cfg.llm.backend, LlmBackend::Anthropic);
        assert_eq!(cfg.port, 9001);
        assert_eq!(cfg.workflow.background, "I run a bakery.");
    }
}
