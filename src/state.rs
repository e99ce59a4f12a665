//! Application state: settings, prompt templates, the language model (if any),
//! the pattern store, the problem synthesizer and the OCR client.
//!
//! Everything is built once at startup and shared by handlers through `Arc<AppState>`.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::backend;
use crate::config::{load_prompts_from_env, Prompts, Settings};
use crate::ocr::VisionClient;
use crate::patterns::PatternStore;
use crate::synthesizer::ProblemSynthesizer;

pub struct AppState {
    pub settings: Settings,
    pub synthesizer: ProblemSynthesizer,
    pub vision: Option<VisionClient>,
}

impl AppState {
    /// Build state from env: settings, TOML prompt overrides, model, store.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let settings = Settings::from_env();
        let prompts = load_prompts_from_env();
        Self::from_parts(settings, prompts)
    }

    pub fn from_parts(settings: Settings, prompts: Prompts) -> Self {
        let model = backend::from_settings(&settings, &prompts);
        let store = Arc::new(PatternStore::new(settings.use_rag));
        let synthesizer = ProblemSynthesizer::new(model, Arc::new(prompts), store);

        let vision = VisionClient::from_settings(&settings);
        if vision.is_none() {
            info!(target: "parsey_backend", "Google Vision disabled (no GOOGLE_API_KEY). OCR returns simulated text.");
        }
        info!(target: "parsey_backend", use_rag = settings.use_rag, "Application state ready");

        Self { settings, synthesizer, vision }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
