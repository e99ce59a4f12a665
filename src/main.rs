//! Parsey · TOEIC problem generator backend
//!
//! - Axum HTTP API (analysis, generation, OCR)
//! - OpenAI or Gemini for analysis/generation; canned fallbacks without a key
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   LLM_PROVIDER       : "openai" (default) or "gemini"
//!   LLM_MODEL          : model name for the selected provider
//!   OPENAI_API_KEY     : enables the OpenAI provider
//!   GOOGLE_API_KEY     : enables the Gemini provider and Google Vision OCR
//!   USE_RAG            : "true"/"false", pattern retrieval (default true)
//!   CORS_ORIGINS       : comma separated allowed origins
//!   PARSEY_CONFIG_PATH : TOML file with prompt overrides
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use parsey_backend::routes::build_router;
use parsey_backend::state::AppState;
use parsey_backend::telemetry;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  // A missing .env file is fine.
  dotenv::dotenv().ok();
  telemetry::init_tracing();

  let state = Arc::new(AppState::new());
  let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "parsey_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  shutdown_on(tokio::signal::ctrl_c()).await
}

/// Resolves when `signal` fires. If the signal cannot be installed the server
/// keeps running instead of shutting down at once.
async fn shutdown_on(signal: impl std::future::Future<Output = std::io::Result<()>>) {
  if let Err(e) = signal.await {
    tracing::error!(target: "parsey_backend", error = %e, "Failed to listen for shutdown signal; serving until killed");
    std::future::pending::<()>().await;
  }
  info!(target: "parsey_backend", "Shutdown signal received");
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::FutureExt;

  #[test]
  fn signal_shuts_down() {
    assert_eq!(shutdown_on(async { Ok(()) }).now_or_never(), Some(()));
  }

  #[test]
  fn failed_signal_keeps_serving() {
    let failed = async { Err(std::io::Error::new(std::io::ErrorKind::Other, "no signal handler")) };
    assert_eq!(shutdown_on(failed).now_or_never(), None);
  }
}
