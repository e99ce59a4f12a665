//! Minimal OpenAI client for our use-cases.
//!
//! We only call chat.completions and request a strict JSON object.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::backend::LanguageModel;
use crate::config::{Prompts, Settings};
use crate::error::BackendError;
use crate::util::{strip_code_fence, trunc_for_log};

const ANALYSIS_TEMPERATURE: f32 = 0.2;
const GENERATION_TEMPERATURE: f32 = 0.7;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  analysis_system: String,
  generation_system: String,
}

impl OpenAI {
  /// Construct the client if OPENAI_API_KEY is configured; otherwise return None.
  pub fn from_settings(settings: &Settings, prompts: &Prompts) -> Option<Self> {
    let api_key = settings.openai_api_key.clone()?;
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(settings.llm_timeout_secs))
      .build()
      .ok()?;

    Some(Self {
      client,
      api_key,
      base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
      model: settings.llm_model.clone(),
      analysis_system: prompts.analysis_system.clone(),
      generation_system: prompts.generation_system.clone(),
    })
  }

  /// JSON-object chat completion.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, user_len = user.len()))]
  async fn chat_json(&self, system: &str, user: &str, temperature: f32) -> Result<Value, BackendError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: ResponseFormat { r#type: "json_object".into() },
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "parsey-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      error!(elapsed = ?start.elapsed(), status, detail = %trunc_for_log(&message, 300), "OpenAI call failed");
      return Err(BackendError::Status { provider: "openai", status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .filter(|t| !t.trim().is_empty())
      .ok_or(BackendError::EmptyResponse("openai"))?;
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");

    Ok(serde_json::from_str::<Value>(strip_code_fence(&text))?)
  }
}

#[async_trait]
impl LanguageModel for OpenAI {
  fn name(&self) -> &'static str { "openai" }

  async fn analyze(&self, prompt: &str) -> Result<Value, BackendError> {
    self.chat_json(&self.analysis_system, prompt, ANALYSIS_TEMPERATURE).await
  }

  async fn generate(&self, prompt: &str) -> Result<Value, BackendError> {
    self.chat_json(&self.generation_system, prompt, GENERATION_TEMPERATURE).await
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  response_format: ResponseFormat,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
