//! Structured (JSON) output extraction from free-text completions.

use serde::de::DeserializeOwned;

use crate::error::LlmError;

/// Parse a JSON object of type `T` out of raw model output.
pub fn parse_structured<T: DeserializeOwned>(raw: &str, provider: &str) -> Result<T, LlmError> {
    let json_str = extract_json_object(raw);
    serde_json::from_str(&json_str).map_err(|e| LlmError::InvalidResponse {
        provider: provider.to_string(),
        reason: format!("structured output did not match schema: {e}"),
    })
}

/// Extract a JSON object from LLM output (handles markdown wrapping).
pub fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}
