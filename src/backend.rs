//! Language-model capability interface and provider selection.
//!
//! The provider is chosen once, when `AppState` is built. `None` means offline
//! mode: the analyzer uses its rule-based path and every problem is simulated.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::config::{LlmProvider, Prompts, Settings};
use crate::error::BackendError;
use crate::gemini::Gemini;
use crate::openai::OpenAI;

#[async_trait]
pub trait LanguageModel: Send + Sync {
  /// Short provider name for logs.
  fn name(&self) -> &'static str;

  /// Linguistic analysis request; returns the parsed JSON object.
  async fn analyze(&self, prompt: &str) -> Result<Value, BackendError>;

  /// Problem generation request; returns the parsed JSON object.
  async fn generate(&self, prompt: &str) -> Result<Value, BackendError>;
}

pub type SharedModel = Arc<dyn LanguageModel>;

/// Build the configured provider, or `None` when its credentials are missing.
pub fn from_settings(settings: &Settings, prompts: &Prompts) -> Option<SharedModel> {
  let model: Option<SharedModel> = match settings.llm_provider {
    LlmProvider::OpenAi => OpenAI::from_settings(settings, prompts).map(|m| Arc::new(m) as SharedModel),
    LlmProvider::Gemini => Gemini::from_settings(settings, prompts).map(|m| Arc::new(m) as SharedModel),
  };
  match &model {
    Some(m) => info!(target: "parsey_backend", provider = m.name(), model = %settings.llm_model, "Language model enabled."),
    None => info!(target: "parsey_backend", provider = ?settings.llm_provider, "Language model disabled (no API key). Using rule-based analysis and simulated problems."),
  }
  model
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn no_credentials_means_offline() {
    let settings = Settings::default();
    assert!(from_settings(&settings, &Prompts::default()).is_none());

    let gemini_without_key = Settings {
      llm_provider: LlmProvider::Gemini,
      openai_api_key: Some("sk-test".into()),
      ..Settings::default()
    };
    assert!(from_settings(&gemini_without_key, &Prompts::default()).is_none());
  }

  #[test]
  fn selects_configured_provider() {
    let openai = Settings { openai_api_key: Some("sk-test".into()), ..Settings::default() };
    assert_eq!(from_settings(&openai, &Prompts::default()).map(|m| m.name()), Some("openai"));

    let gemini = Settings {
      llm_provider: LlmProvider::Gemini,
      google_api_key: Some("g-test".into()),
      ..Settings::default()
    };
    assert_eq!(from_settings(&gemini, &Prompts::default()).map(|m| m.name()), Some("gemini"));
  }
}
