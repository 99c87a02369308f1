// Semantic stage: asks the language model whether a message is trying to move
// the conversation off-platform.
//
// This layer only builds the prompt, calls the provider under a timeout and
// hands back whatever text it got. Parsing that text is the extractor's job.

use super::moderation_models::{CapabilityError, REDACTION_NOTICE};
use crate::core::ai::{AiConfig, AiMessage, AiProvider};
use std::time::Duration;

/// Build the built-in moderation instruction.
pub fn default_moderation_prompt() -> String {
    format!(
        r#"You moderate the private chat of a marriage-matching application.
Members must not exchange direct contact details or move the conversation
off the platform before the staged contact protocol allows it.

Block the message if it tries to share, or asks for, any of:
1. Phone numbers, including digits written as words, digits split by spaces
   or symbols, and Arabic-Indic numerals.
2. Social media handles or accounts (Snapchat, Instagram, WhatsApp, Telegram
   and similar), with or without an "@".
3. Links, URLs or domain names.
4. Indirect pointers such as "find me on ..." or "my number is in my bio".

Reply with a single JSON object and nothing else, with exactly these fields:
- "is_blocked": boolean, true if the message violates the rules above.
- "reason": string, a short explanation when blocked, otherwise "".
- "clean_text": string, "{notice}" when blocked, otherwise the original message.
- "risk_score": integer from 0 to 10 for how deliberate the circumvention is."#,
        notice = REDACTION_NOTICE
    )
}

/// Adapter around the injected `AiProvider`.
pub struct SemanticAnalyzer<P: AiProvider> {
    provider: P,
    system_prompt: String,
    config: AiConfig,
    timeout: Duration,
}

impl<P: AiProvider> SemanticAnalyzer<P> {
    pub fn new(provider: P, system_prompt: String, config: AiConfig, timeout: Duration) -> Self {
        Self {
            provider,
            system_prompt,
            config,
            timeout,
        }
    }

    /// Messages sent to the provider: the policy, then the candidate message.
    ///
    /// The candidate is JSON-quoted so embedded quotes or newlines can't break
    /// out of the user turn.
    fn build_messages(&self, message: &str) -> Vec<AiMessage> {
        let quoted = serde_json::to_string(message).unwrap_or_else(|_| format!("\"{}\"", message));

        vec![
            AiMessage::system(self.system_prompt.clone()),
            AiMessage::user(format!("Message to analyze: {}", quoted)),
        ]
    }

    /// Returns the provider's raw text. Makes exactly one attempt; no retries.
    pub async fn analyze(&self, message: &str) -> Result<String, CapabilityError> {
        let messages = self.build_messages(message);

        let call = self.provider.chat_complete(&messages, &self.config);
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(CapabilityError::Provider(e.to_string())),
            Err(_) => return Err(CapabilityError::Timeout(self.timeout)),
        };

        if let Some(thinking) = &response.thinking {
            tracing::debug!(
                thinking_chars = thinking.len(),
                "Semantic stage returned reasoning parts"
            );
        }

        Ok(response.content)
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::AiProviderResponse;
    use async_trait::async_trait;
    use std::error::Error;
    use std::sync::Mutex;

    /// Records the messages it receives and answers with fixed text.
    struct RecordingProvider {
        seen: Mutex<Vec<AiMessage>>,
        reply: String,
    }

    #[async_trait]
    impl AiProvider for RecordingProvider {
        async fn chat_complete(
            &self,
            messages: &[AiMessage],
            _config: &AiConfig,
        ) -> Result<AiProviderResponse, Box<dyn Error + Send + Sync>> {
            self.seen.lock().unwrap().extend(messages.iter().cloned());
            Ok(AiProviderResponse {
                content: self.reply.clone(),
                thinking: None,
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl AiProvider for FailingProvider {
        async fn chat_complete(
            &self,
            _messages: &[AiMessage],
            _config: &AiConfig,
        ) -> Result<AiProviderResponse, Box<dyn Error + Send + Sync>> {
            Err("quota exceeded".into())
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl AiProvider for SlowProvider {
        async fn chat_complete(
            &self,
            _messages: &[AiMessage],
            _config: &AiConfig,
        ) -> Result<AiProviderResponse, Box<dyn Error + Send + Sync>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(AiProviderResponse::default())
        }
    }

    fn config() -> AiConfig {
        AiConfig {
            model: "test-model".to_string(),
            temperature: 0.0,
            max_tokens: None,
            top_p: None,
            json_output: true,
        }
    }

    #[test]
    fn test_prompt_describes_schema_and_notice() {
        let prompt = default_moderation_prompt();
        for field in ["is_blocked", "reason", "clean_text", "risk_score"] {
            assert!(prompt.contains(field), "prompt missing {}", field);
        }
        assert!(prompt.contains(REDACTION_NOTICE));
        assert!(prompt.contains("0 to 10"));
    }

    #[tokio::test]
    async fn test_analyze_sends_policy_then_quoted_message() {
        let analyzer = SemanticAnalyzer::new(
            RecordingProvider {
                seen: Mutex::new(Vec::new()),
                reply: "{}".to_string(),
            },
            "policy".to_string(),
            config(),
            Duration::from_secs(5),
        );

        let raw = analyzer.analyze("say \"hi\"").await.unwrap();
        assert_eq!(raw, "{}");

        let seen = analyzer.provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].role, "system");
        assert_eq!(seen[0].content, "policy");
        assert_eq!(seen[1].role, "user");
        assert_eq!(seen[1].content, r#"Message to analyze: "say \"hi\"""#);
    }

    #[tokio::test]
    async fn test_provider_error_becomes_capability_error() {
        let analyzer = SemanticAnalyzer::new(
            FailingProvider,
            default_moderation_prompt(),
            config(),
            Duration::from_secs(5),
        );

        let err = analyzer.analyze("hello").await.unwrap_err();
        assert!(matches!(err, CapabilityError::Provider(ref m) if m.contains("quota")));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let analyzer = SemanticAnalyzer::new(
            SlowProvider,
            default_moderation_prompt(),
            config(),
            Duration::from_millis(50),
        );

        let err = analyzer.analyze("hello").await.unwrap_err();
        assert!(matches!(err, CapabilityError::Timeout(_)));
    }
}
