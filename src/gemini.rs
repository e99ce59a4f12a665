//! Google Gemini client (generateContent with a JSON response MIME type).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::backend::LanguageModel;
use crate::config::{Prompts, Settings};
use crate::error::BackendError;
use crate::util::{strip_code_fence, trunc_for_log};

#[derive(Clone)]
pub struct Gemini {
  client: reqwest::Client,
  api_key: String,
  base_url: String,
  model: String,
  analysis_system: String,
  generation_system: String,
}

impl Gemini {
  /// Construct the client if GOOGLE_API_KEY is configured; otherwise return None.
  pub fn from_settings(settings: &Settings, prompts: &Prompts) -> Option<Self> {
    let api_key = settings.google_api_key.clone()?;
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(settings.llm_timeout_secs))
      .build()
      .ok()?;
    Some(Self {
      client,
      api_key,
      base_url: settings.gemini_base_url.trim_end_matches('/').to_string(),
      model: settings.llm_model.clone(),
      analysis_system: prompts.analysis_system.clone(),
      generation_system: prompts.generation_system.clone(),
    })
  }

  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, user_len = user.len()))]
  async fn generate_json(&self, system: &str, user: &str, temperature: f32) -> Result<Value, BackendError> {
    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let req = GenerateContentRequest {
      system_instruction: Content { role: None, parts: vec![Part { text: system.into() }] },
      contents: vec![Content { role: Some("user".into()), parts: vec![Part { text: user.into() }] }],
      generation_config: GenerationConfig {
        temperature,
        response_mime_type: "application/json".into(),
      },
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .query(&[("key", self.api_key.as_str())])
      .header(USER_AGENT, "parsey-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let message = res.text().await.unwrap_or_default();
      error!(elapsed = ?start.elapsed(), status, detail = %trunc_for_log(&message, 300), "Gemini call failed");
      return Err(BackendError::Status { provider: "gemini", status, message });
    }

    let body: GenerateContentResponse = res.json().await?;
    let text: String = body.candidates.into_iter().next()
      .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
      .filter(|t: &String| !t.trim().is_empty())
      .ok_or(BackendError::EmptyResponse("gemini"))?;
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");

    Ok(serde_json::from_str::<Value>(strip_code_fence(&text))?)
  }
}

#[async_trait]
impl LanguageModel for Gemini {
  fn name(&self) -> &'static str { "gemini" }

  async fn analyze(&self, prompt: &str) -> Result<Value, BackendError> {
    self.generate_json(&self.analysis_system, prompt, 0.2).await
  }

  async fn generate(&self, prompt: &str) -> Result<Value, BackendError> {
    self.generate_json(&self.generation_system, prompt, 0.7).await
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  system_instruction: Content,
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}
#[derive(Serialize, Deserialize)]
struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<Part>,
}
#[derive(Serialize, Deserialize)]
struct Part { #[serde(default)] text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  temperature: f32,
  response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate { content: Content }
