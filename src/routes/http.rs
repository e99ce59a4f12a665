//! HTTP endpoint handlers. These are thin wrappers that validate input and
//! forward to the pipeline. Each handler is instrumented and logs basic result info.

use std::sync::Arc;
use axum::{extract::{multipart::MultipartRejection, Multipart, State}, Json, response::IntoResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::error::ValidationError;
use crate::ocr::extract_text;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_root() -> impl IntoResponse {
  Json(json!({ "message": "Welcome to Parsey API" }))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_analyze(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnalyzeIn>,
) -> Result<Json<AnalyzeOut>, ValidationError> {
  body.validate()?;
  let analysis = state.synthesizer.analyze(&body.text).await;
  info!(target: "generation", part = %analysis.detected_part, "HTTP analysis served");
  Ok(Json(AnalyzeOut::from_analysis(analysis, &body)))
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len(), count = body.count))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> Result<Json<GenerateOut>, ValidationError> {
  let request = body.validate()?;
  let outcome = state.synthesizer.generate(&request).await;
  info!(target: "generation", part = %outcome.detected_part, problems = outcome.problems.len(), "HTTP problems served");
  Ok(Json(GenerateOut::from(outcome)))
}

#[instrument(level = "info", skip(state, multipart))]
pub async fn http_post_ocr(
  State(state): State<Arc<AppState>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrOut>, ValidationError> {
  let mut multipart = multipart.map_err(|e| ValidationError::InvalidUpload(e.body_text()))?;
  let image = read_upload(&mut multipart).await?;
  let r = extract_text(state.vision.as_ref(), &image).await;
  info!(target: "parsey_backend", image_len = image.len(), success = r.success, text_len = r.text.len(), "HTTP OCR served");
  Ok(Json(OcrOut { success: r.success, text: r.text, confidence: r.confidence, language: r.language }))
}
