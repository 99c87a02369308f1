use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiMessage {
    pub role: String,
    pub content: String,
}

impl AiMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    /// Ask the provider to constrain its output to a JSON document.
    /// Providers that can't honour this simply ignore it.
    pub json_output: bool,
}

/// Response from an AI provider, containing the main content and optional thinking.
///
/// Only `content` is consumed by the moderation pipeline. `thinking` is kept so
/// adapters can surface reasoning parts in debug logs without mixing them into
/// the text that gets parsed.
#[derive(Debug, Clone, Default)]
pub struct AiProviderResponse {
    /// The main response content from the model.
    pub content: String,

    /// Optional thinking/reasoning process from the model.
    pub thinking: Option<String>,
}
