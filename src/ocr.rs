//! Image-to-text via Google Vision TEXT_DETECTION, with a canned result when
//! no Google API key is configured.

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument};

use crate::config::Settings;
use crate::error::BackendError;

pub const SIMULATED_TEXT: &str = "The quarterly sales report indicates a significant increase in revenue. \
All employees are required to attend the mandatory training session. \
The meeting has been postponed until further notice.";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OcrResult {
  pub success: bool,
  pub text: String,
  pub confidence: Option<f32>,
  pub language: Option<String>,
}

impl OcrResult {
  fn simulated() -> Self {
    Self { success: true, text: SIMULATED_TEXT.into(), confidence: Some(0.85), language: Some("en".into()) }
  }

  fn empty() -> Self {
    Self { success: false, text: String::new(), confidence: Some(0.0), language: None }
  }
}

#[derive(Clone)]
pub struct VisionClient {
  client: reqwest::Client,
  api_key: String,
  base_url: String,
}

impl VisionClient {
  pub fn from_settings(settings: &Settings) -> Option<Self> {
    let api_key = settings.google_api_key.clone()?;
    let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build().ok()?;
    Some(Self { client, api_key, base_url: settings.vision_base_url.trim_end_matches('/').to_string() })
  }

  async fn annotate(&self, image: &[u8]) -> Result<Option<(String, String)>, BackendError> {
    let content = base64::engine::general_purpose::STANDARD.encode(image);
    let payload = json!({
      "requests": [{ "image": { "content": content }, "features": [{ "type": "TEXT_DETECTION" }] }]
    });
    let res = self.client
      .post(format!("{}/images:annotate", self.base_url))
      .query(&[("key", self.api_key.as_str())])
      .json(&payload)
      .send()
      .await?;
    if !res.status().is_success() {
      let status = res.status().as_u16();
      let message = res.text().await.unwrap_or_default();
      return Err(BackendError::Status { provider: "vision", status, message });
    }
    let body: AnnotateResponse = res.json().await?;
    Ok(body.responses.into_iter().next()
      .and_then(|r| r.text_annotations.into_iter().next())
      .map(|a| (a.description.trim().to_string(), a.locale.unwrap_or_else(|| "en".into()))))
  }
}

/// Never fails: errors are reported inside the result.
#[instrument(level = "info", skip(vision, image), fields(image_len = image.len(), has_vision = vision.is_some()))]
pub async fn extract_text(vision: Option<&VisionClient>, image: &[u8]) -> OcrResult {
  let Some(vision) = vision else {
    info!(target: "parsey_backend", "Vision disabled (no GOOGLE_API_KEY); returning simulated OCR text");
    return OcrResult::simulated();
  };
  match vision.annotate(image).await {
    Ok(Some((text, locale))) => OcrResult { success: true, text, confidence: Some(0.95), language: Some(locale) },
    Ok(None) => OcrResult::empty(),
    Err(e) => {
      error!(target: "parsey_backend", error = %e, "OCR request failed");
      OcrResult { text: format!("Error: {e}"), ..OcrResult::empty() }
    }
  }
}

#[derive(Deserialize)]
struct AnnotateResponse {
  #[serde(default)]
  responses: Vec<AnnotateItem>,
}
#[derive(Deserialize)]
struct AnnotateItem {
  #[serde(default, rename = "textAnnotations")]
  text_annotations: Vec<TextAnnotation>,
}
#[derive(Deserialize)]
struct TextAnnotation {
  #[serde(default)]
  description: String,
  #[serde(default)]
  locale: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  async fn vision_with(server: &MockServer) -> VisionClient {
    let settings = Settings {
      google_api_key: Some("g-key".into()),
      vision_base_url: server.uri(),
      ..Settings::default()
    };
    VisionClient::from_settings(&settings).unwrap()
  }

  #[tokio::test]
  async fn no_key_returns_simulated_text() {
    let r = extract_text(None, b"png").await;
    assert!(r.success);
    assert_eq!(r.text, SIMULATED_TEXT);
    assert_eq!(r.language.as_deref(), Some("en"));
  }

  #[tokio::test]
  async fn reads_first_annotation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/images:annotate"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "responses": [{ "textAnnotations": [
          { "description": "  Quarterly report \n", "locale": "en" },
          { "description": "Quarterly" }
        ] }]
      })))
      .mount(&server)
      .await;

    let vision = vision_with(&server).await;
    let r = extract_text(Some(&vision), b"img").await;
    assert_eq!(r, OcrResult { success: true, text: "Quarterly report".into(), confidence: Some(0.95), language: Some("en".into()) });
  }

  #[tokio::test]
  async fn no_annotations_and_errors_are_unsuccessful() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "responses": [{}] })))
      .up_to_n_times(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
      .mount(&server)
      .await;

    let vision = vision_with(&server).await;
    assert_eq!(extract_text(Some(&vision), b"img").await, OcrResult::empty());
    let failed = extract_text(Some(&vision), b"img").await;
    assert!(!failed.success);
    assert!(failed.text.starts_with("Error: vision HTTP 403"));
  }
}
