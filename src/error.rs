//! Error types. Backend and index errors never escape the pipeline; they are
//! turned into `Staged::Degraded` values. Validation errors become HTTP 400.

use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("{provider} HTTP {status}: {message}")]
  Status { provider: &'static str, status: u16, message: String },
  #[error("empty response from {0}")]
  EmptyResponse(&'static str),
  #[error("JSON parse error: {0}")]
  Decode(#[from] serde_json::Error),
  #[error("invalid problem: {0}")]
  InvalidProblem(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
  #[error("pattern index unavailable: {0}")]
  Unavailable(String),
  #[error("pattern query failed: {0}")]
  Query(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Read { path: String, source: std::io::Error },
  #[error("failed to parse {path}: {source}")]
  Parse { path: String, source: toml::de::Error },
}

/// Request validation failures, surfaced to the caller before the core runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
  #[error("Text cannot be empty")]
  EmptyText,
  #[error("Text exceeds maximum length of {0} characters")]
  TextTooLong(usize),
  #[error("Count must be between 1 and {0}")]
  CountOutOfRange(usize),
  #[error("Part must be 5, 6, or 7")]
  InvalidPart,
  #[error("Difficulty must be easy, medium, or hard")]
  InvalidDifficulty,
  #[error("Invalid file type. Allowed: {0}")]
  InvalidMime(String),
  #[error("File size exceeds 10MB limit")]
  ImageTooLarge,
  #[error("No file uploaded")]
  MissingFile,
  #[error("Invalid upload: {0}")]
  InvalidUpload(String),
}

impl IntoResponse for ValidationError {
  fn into_response(self) -> axum::response::Response {
    let body = serde_json::json!({ "detail": self.to_string() });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
  }
}
