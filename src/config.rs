//! Runtime settings (environment) and prompt templates (TOML, optional).
//!
//! Settings come from the process environment (a `.env` file is loaded first by
//! `main`). Prompt templates default to `Prompts::default()` and can be
//! overridden by a TOML file at `PARSEY_CONFIG_PATH` with a `[prompts]` table.

use serde::Deserialize;
use tracing::{error, info};

use crate::error::ConfigError;

/// Which language-model provider backs analysis and generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmProvider {
  OpenAi,
  Gemini,
}

impl LlmProvider {
  pub fn default_model(self) -> &'static str {
    match self {
      LlmProvider::OpenAi => "gpt-4o-mini",
      LlmProvider::Gemini => "gemini-1.5-flash",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "openai" => Some(LlmProvider::OpenAi),
      "gemini" => Some(LlmProvider::Gemini),
      _ => None,
    }
  }
}

#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub llm_provider: LlmProvider,
  pub llm_model: String,
  pub openai_api_key: Option<String>,
  pub openai_base_url: String,
  pub google_api_key: Option<String>,
  pub gemini_base_url: String,
  pub vision_base_url: String,
  /// Global switch for pattern retrieval; requests can only narrow it.
  pub use_rag: bool,
  pub cors_origins: Vec<String>,
  pub llm_timeout_secs: u64,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      port: 3000,
      llm_provider: LlmProvider::OpenAi,
      llm_model: "gpt-4o-mini".into(),
      openai_api_key: None,
      openai_base_url: "https://api.openai.com/v1".into(),
      google_api_key: None,
      gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
      vision_base_url: "https://vision.googleapis.com/v1".into(),
      use_rag: true,
      cors_origins: vec!["http://localhost:5173".into(), "http://localhost:3000".into()],
      llm_timeout_secs: 20,
    }
  }
}

impl Settings {
  /// Read settings from the environment, falling back to defaults per key.
  pub fn from_env() -> Self {
    Self::from_lookup(|k| std::env::var(k).ok())
  }

  /// Same as `from_env` but with an injectable lookup (tests).
  pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
    let d = Settings::default();
    let non_empty = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let llm_provider = match non_empty("LLM_PROVIDER") {
      Some(p) => LlmProvider::parse(&p).unwrap_or_else(|| {
        error!(target: "parsey_backend", provider = %p, "Unknown LLM_PROVIDER; using openai");
        LlmProvider::OpenAi
      }),
      None => d.llm_provider,
    };

    Self {
      port: non_empty("PORT").and_then(|p| p.parse().ok()).unwrap_or(d.port),
      llm_provider,
      llm_model: non_empty("LLM_MODEL").unwrap_or_else(|| llm_provider.default_model().to_string()),
      openai_api_key: non_empty("OPENAI_API_KEY"),
      openai_base_url: non_empty("OPENAI_BASE_URL").unwrap_or(d.openai_base_url),
      google_api_key: non_empty("GOOGLE_API_KEY"),
      gemini_base_url: non_empty("GEMINI_BASE_URL").unwrap_or(d.gemini_base_url),
      vision_base_url: non_empty("VISION_BASE_URL").unwrap_or(d.vision_base_url),
      use_rag: non_empty("USE_RAG").map(|v| parse_bool(&v)).unwrap_or(d.use_rag),
      cors_origins: non_empty("CORS_ORIGINS")
        .map(|v| v.split(',').map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect())
        .unwrap_or(d.cors_origins),
      llm_timeout_secs: non_empty("LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()).unwrap_or(d.llm_timeout_secs),
    }
  }
}

fn parse_bool(v: &str) -> bool {
  matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct FileConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompt templates used by the analyzer and the problem generator.
/// Placeholders are `{name}`; see `prompts.rs` for the keys each template receives.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub analysis_system: String,
  pub analysis_user_template: String,
  pub generation_system: String,
  pub part5_template: String,
  pub part6_template: String,
  pub part7_template: String,
}

const CHOICES_JSON: &str = r#"    "choices": [
        {"label": "A", "text": "option1", "is_correct": false},
        {"label": "B", "text": "option2", "is_correct": true},
        {"label": "C", "text": "option3", "is_correct": false},
        {"label": "D", "text": "option4", "is_correct": false}
    ],
    "answer": "B","#;

impl Default for Prompts {
  fn default() -> Self {
    Self {
      analysis_system: "You are an expert English linguist and TOEIC instructor. Analyze the given text precisely.".into(),
      analysis_user_template: r#"Analyze the following English text and provide a detailed linguistic analysis.

Text: "{text}"

Respond in JSON format with the following structure:
{
    "pos_tags": [
        {"word": "word", "pos": "NOUN/VERB/ADJ/etc", "description": "brief description"}
    ],
    "grammar_elements": [
        {"type": "tense/voice/clause/etc", "value": "identified element", "explanation": "brief explanation"}
    ],
    "sentence_structure": "description of sentence structure (simple/compound/complex)",
    "toeic_part": 5 or 6 or 7,
    "toeic_part_reason": "explanation why this fits the TOEIC part",
    "summary": "brief semantic summary of the text"
}

TOEIC Part Guidelines:
- Part 5: Single sentences testing grammar/vocabulary (blank-filling)
- Part 6: Short passages with multiple blanks (text completion)
- Part 7: Reading comprehension passages (emails, memos, articles, etc.)"#.into(),
      generation_system: "You are an expert TOEIC test writer. Create authentic TOEIC questions following ETS guidelines. Respond ONLY with strict JSON.".into(),
      part5_template: format!(r#"Create a TOEIC Part 5 (Incomplete Sentences) question based on this text.
{{patterns}}
Source text: "{{source_text}}"
{{analysis}}
Difficulty: {{difficulty}}

Create a fill-in-the-blank question that tests grammar or vocabulary.
Provide exactly 4 choices labelled A-D with exactly one correct choice.

Respond in JSON:
{{
    "question": "sentence with _______ for the blank",
{CHOICES_JSON}
    "question_type": "grammar" or "vocabulary",
    "explanation": "detailed explanation of why B is correct and others are wrong"
}}"#),
      part6_template: format!(r#"Create a TOEIC Part 6 (Text Completion) question based on this text.
{{patterns}}
Source text: "{{source_text}}"
{{analysis}}
Difficulty: {{difficulty}}

Create a passage with a blank that tests context understanding.
Provide exactly 4 choices labelled A-D with exactly one correct choice.

Respond in JSON:
{{
    "passage": "paragraph with _______ indicating the blank",
    "question": "Question number and context",
{CHOICES_JSON}
    "question_type": "context",
    "explanation": "explanation of the correct answer"
}}"#),
      part7_template: format!(r#"Create a TOEIC Part 7 (Reading Comprehension) question based on this text.
{{patterns}}
Source text: "{{source_text}}"
{{analysis}}
Difficulty: {{difficulty}}

Create a reading comprehension question about the passage.
Provide exactly 4 choices labelled A-D with exactly one correct choice.

Respond in JSON:
{{
    "passage": "the reading passage (can expand on source text)",
    "question": "What is indicated about...",
{CHOICES_JSON}
    "question_type": "reading comprehension",
    "explanation": "explanation referencing the passage"
}}"#),
    }
  }
}

/// Parse a TOML config file. Missing tables fall back to defaults.
pub fn load_file_config(path: &str) -> Result<FileConfig, ConfigError> {
  let s = std::fs::read_to_string(path)
    .map_err(|source| ConfigError::Read { path: path.to_string(), source })?;
  toml::from_str::<FileConfig>(&s)
    .map_err(|source| ConfigError::Parse { path: path.to_string(), source })
}

/// Load prompts from PARSEY_CONFIG_PATH. On any IO/parse error, logs and uses defaults.
pub fn load_prompts_from_env() -> Prompts {
  let Ok(path) = std::env::var("PARSEY_CONFIG_PATH") else {
    return Prompts::default();
  };
  match load_file_config(&path) {
    Ok(cfg) => {
      info!(target: "parsey_backend", %path, "Loaded prompt config (TOML)");
      cfg.prompts
    }
    Err(e) => {
      error!(target: "parsey_backend", %path, error = %e, "Failed to load TOML config; using default prompts");
      Prompts::default()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
      pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |k| map.get(k).cloned()
  }

  #[test]
  fn defaults_without_env() {
    let s = Settings::from_lookup(lookup(&[]));
    assert_eq!(s.port, 3000);
    assert_eq!(s.llm_provider, LlmProvider::OpenAi);
    assert!(s.openai_api_key.is_none());
    assert!(s.use_rag);
  }

  #[test]
  fn reads_overrides() {
    let s = Settings::from_lookup(lookup(&[
      ("PORT", "8080"),
      ("LLM_PROVIDER", "Gemini"),
      ("OPENAI_API_KEY", "  "),
      ("GOOGLE_API_KEY", "g-key"),
      ("USE_RAG", "false"),
      ("CORS_ORIGINS", "http://a.test, http://b.test,"),
    ]));
    assert_eq!(s.port, 8080);
    assert_eq!(s.llm_provider, LlmProvider::Gemini);
    assert_eq!(s.llm_model, "gemini-1.5-flash");
    assert!(s.openai_api_key.is_none(), "blank key counts as missing");
    assert_eq!(s.google_api_key.as_deref(), Some("g-key"));
    assert!(!s.use_rag);
    assert_eq!(s.cors_origins, vec!["http://a.test", "http://b.test"]);
  }

  #[test]
  fn partial_toml_keeps_default_templates() {
    let cfg: FileConfig = toml::from_str(
      r#"
      [prompts]
      generation_system = "custom"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.prompts.generation_system, "custom");
    assert!(cfg.prompts.part5_template.contains("Part 5"));
  }

  #[test]
  fn default_templates_keep_placeholders() {
    let p = Prompts::default();
    for tpl in [&p.part5_template, &p.part6_template, &p.part7_template] {
      for key in ["{patterns}", "{source_text}", "{analysis}", "{difficulty}"] {
        assert!(tpl.contains(key), "missing {key}");
      }
      assert!(tpl.contains(r#""answer": "B""#));
    }
  }
}
