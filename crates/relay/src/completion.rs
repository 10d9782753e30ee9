//! Completion client — one backend call per user message.

use std::sync::Arc;

use motoasesor_config::AppConfig;
use motoasesor_core::{GenerationError, Provider, ProviderRequest, Turn, Usage};
use tracing::debug;

/// A generated reply with the backend's bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Option<Usage>,
}

/// Stateless wrapper around a [`Provider`] with fixed generation settings.
pub struct CompletionClient {
    provider: Arc<dyn Provider>,
    model: String,
    max_output_tokens: u32,
    temperature: Option<f32>,
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            provider,
            model: model.into(),
            max_output_tokens,
            temperature: None,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self {
            temperature: config.temperature,
            ..Self::new(provider, &config.default_model, config.max_output_tokens)
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate the reply to `user_text` given the full `history`.
    pub async fn generate(&self, history: &[Turn], user_text: &str) -> Result<String, GenerationError> {
        self.complete(history, user_text).await.map(|c| c.text)
    }

    /// Like [`generate`](Self::generate), keeping model and token usage.
    ///
    /// No retries. The reply text is returned as the backend sent it; one
    /// that is empty after trimming is an error.
    pub async fn complete(&self, history: &[Turn], user_text: &str) -> Result<Completion, GenerationError> {
        let mut turns = Vec::with_capacity(history.len() + 1);
        turns.extend_from_slice(history);
        turns.push(Turn::user(user_text));

        let request = ProviderRequest {
            model: self.model.clone(),
            turns,
            temperature: self.temperature,
            max_tokens: Some(self.max_output_tokens),
        };

        debug!(
            provider = %self.provider.name(),
            model = %self.model,
            turns = request.turns.len(),
            est_tokens = request.turns.iter().map(Turn::estimated_tokens).sum::<usize>(),
            "Requesting completion"
        );

        let response = self.provider.complete(request).await?;
        let text = response.turn.content;
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyReply);
        }

        Ok(Completion {
            text,
            model: response.model,
            usage: response.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use motoasesor_core::{ProviderError, Role};

    fn history() -> Vec<Turn> {
        vec![Turn::user("preamble"), Turn::assistant("¡Entendido!")]
    }

    #[tokio::test]
    async fn sends_history_plus_new_turn() {
        let provider = Arc::new(ScriptedProvider::replies(&["¡Hola! ¿Qué estilo buscas?"]));
        let client = CompletionClient::new(provider.clone(), "gemini-2.0-flash", 500);

        let reply = client.generate(&history(), "hola").await.unwrap();
        assert_eq!(reply, "¡Hola! ¿Qué estilo buscas?");

        let request = provider.last_request().unwrap();
        assert_eq!(request.turns.len(), 3);
        assert_eq!(request.turns[2].role, Role::User);
        assert_eq!(request.turns[2].content, "hola");
        assert_eq!(request.max_tokens, Some(500));
        assert_eq!(request.model, "gemini-2.0-flash");
        assert!(request.temperature.is_none());
    }

    #[tokio::test]
    async fn backend_failure_is_generation_error() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::Timeout("60s".into())));
        let client = CompletionClient::new(provider.clone(), "gemini-2.0-flash", 500);

        let err = client.generate(&history(), "hola").await.unwrap_err();
        assert!(matches!(err, GenerationError::Backend(ProviderError::Timeout(_))));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn blank_reply_is_error() {
        let provider = Arc::new(ScriptedProvider::replies(&["  \n "]));
        let client = CompletionClient::new(provider, "m", 500);
        assert!(matches!(
            client.generate(&history(), "hola").await,
            Err(GenerationError::EmptyReply)
        ));
    }

    #[tokio::test]
    async fn completion_keeps_usage_and_model() {
        let provider = Arc::new(ScriptedProvider::replies(&[" Claro "]));
        let client = CompletionClient::new(provider, "gemini-2.0-flash", 500).with_temperature(0.4);

        let completion = client.complete(&history(), "hola").await.unwrap();
        assert_eq!(completion.text, " Claro ");
        assert_eq!(completion.model, "scripted");
        assert_eq!(completion.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn settings_from_config() {
        let config = AppConfig {
            temperature: Some(0.2),
            max_output_tokens: 300,
            ..AppConfig::default()
        };
        let client = CompletionClient::from_config(Arc::new(ScriptedProvider::replies(&[])), &config);
        assert_eq!(client.model(), "gemini-2.0-flash");
        assert_eq!(client.max_output_tokens, 300);
        assert_eq!(client.temperature, Some(0.2));
        assert_eq!(client.provider_name(), "scripted");
    }

    #[tokio::test]
    async fn reply_text_is_kept_verbatim() {
        let reply = "¡Claro!\n\n| Modelo | Precio |\n| MT-07 | $8999.00 |\n";
        let provider = Arc::new(ScriptedProvider::replies(&[reply]));
        let client = CompletionClient::new(provider, "m", 500);

        assert_eq!(client.generate(&history(), "hola").await.unwrap(), reply);
    }
}
