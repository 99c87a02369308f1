use crate::core::ai::{AiConfig, AiMessage, AiProvider, AiProviderResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::error::Error;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            url: OPENROUTER_URL.to_string(),
        }
    }

    fn build_payload(messages: &[AiMessage], config: &AiConfig) -> serde_json::Value {
        let mut payload = json!({
            "model": config.model,
            "messages": messages,
            "temperature": config.temperature,
        });

        if let Some(max_tokens) = config.max_tokens {
            payload["max_tokens"] = json!(max_tokens);
        }
        if let Some(top_p) = config.top_p {
            payload["top_p"] = json!(top_p);
        }
        if config.json_output {
            payload["response_format"] = json!({ "type": "json_object" });
        }

        payload
    }

    /// Pull the assistant text (and reasoning, if the model sent any) out of a
    /// chat-completions body.
    fn parse_body(
        response_json: &serde_json::Value,
    ) -> Result<AiProviderResponse, Box<dyn Error + Send + Sync>> {
        let message = &response_json["choices"][0]["message"];

        let content = message["content"]
            .as_str()
            .ok_or("Failed to parse response content")?
            .to_string();

        let thinking = message["reasoning"]
            .as_str()
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        Ok(AiProviderResponse { content, thinking })
    }
}

#[async_trait]
impl AiProvider for OpenRouterClient {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, Box<dyn Error + Send + Sync>> {
        let payload = Self::build_payload(messages, config);

        tracing::debug!(
            "OpenRouter request to model {}: {} messages",
            config.model,
            messages.len()
        );

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(format!("OpenRouter API error: {} - {}", status, text).into());
        }

        let response_json: serde_json::Value = response.json().await?;

        Self::parse_body(&response_json)
    }
}
