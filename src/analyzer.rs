//! Text analysis: TOEIC part classification plus lightweight linguistic features.
//!
//! With a language model configured, the model's JSON analysis is parsed field
//! by field. Without one, or when the call fails, a rule-based analyzer runs
//! instead. Either way `analyze` always returns a populated result.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::backend::SharedModel;
use crate::config::Prompts;
use crate::domain::{AnalysisResult, GrammarElement, PosTag, Staged, ToeicPart};
use crate::util::fill_template;

/// Number of leading tokens the rule-based tagger looks at.
const TAGGED_TOKENS: usize = 10;

#[derive(Clone)]
pub struct TextAnalyzer {
  model: Option<SharedModel>,
  user_template: String,
}

impl TextAnalyzer {
  pub fn new(model: Option<SharedModel>, prompts: &Prompts) -> Self {
    Self { model, user_template: prompts.analysis_user_template.clone() }
  }

  /// Rule-based only.
  pub fn offline() -> Self {
    Self::new(None, &Prompts::default())
  }

  pub async fn analyze(&self, text: &str) -> AnalysisResult {
    self.analyze_staged(text).await.into_inner()
  }

  #[instrument(level = "info", skip(self, text), fields(text_len = text.len(), has_model = self.model.is_some()))]
  pub async fn analyze_staged(&self, text: &str) -> Staged<AnalysisResult> {
    let Some(model) = &self.model else {
      return Staged::degraded(analyze_rule_based(text), "no language model configured");
    };

    let prompt = fill_template(&self.user_template, &[("text", text)]);
    match model.analyze(&prompt).await {
      Ok(json) => {
        let result = parse_model_analysis(text, json);
        debug!(target: "generation", part = %result.detected_part, tags = result.pos_tags.len(), "Model analysis parsed");
        Staged::Ok(result)
      }
      Err(e) => {
        warn!(target: "generation", provider = model.name(), error = %e, "Model analysis failed; using rule-based analysis");
        Staged::degraded(analyze_rule_based(text), e.to_string())
      }
    }
  }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ModelAnalysis {
  pos_tags: Vec<Value>,
  grammar_elements: Vec<Value>,
  sentence_structure: Option<String>,
  toeic_part: Option<Value>,
  toeic_part_reason: Option<String>,
  summary: Option<String>,
}

/// Parse the model's JSON. Missing or malformed fields become empty values;
/// a missing or out-of-range part falls back to the heuristic classifier.
pub fn parse_model_analysis(original_text: &str, json: Value) -> AnalysisResult {
  let raw: ModelAnalysis = serde_json::from_value(json).unwrap_or_default();

  let pos_tags = raw.pos_tags.into_iter()
    .filter_map(|v| serde_json::from_value::<PosTag>(v).ok())
    .collect();
  let grammar_elements = raw.grammar_elements.into_iter()
    .filter_map(|v| serde_json::from_value::<GrammarElement>(v).ok())
    .collect();

  let model_part = raw.toeic_part.as_ref().and_then(|v| match v {
    Value::Number(n) => n.as_i64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }).and_then(ToeicPart::from_number);

  let (detected_part, detected_part_reason) = match model_part {
    Some(part) => (part, raw.toeic_part_reason.unwrap_or_default()),
    None => {
      let stats = TextStats::of(original_text);
      let part = detect_part(stats.sentences, stats.words);
      (part, part_reason(part).to_string())
    }
  };

  AnalysisResult {
    original_text: original_text.to_string(),
    pos_tags,
    grammar_elements,
    sentence_structure: raw.sentence_structure.unwrap_or_default(),
    detected_part,
    detected_part_reason,
    summary: raw.summary.unwrap_or_default(),
  }
}

/// Sentence and word counts used by the part classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextStats {
  /// Count of `.`, `!` and `?` characters.
  pub sentences: usize,
  /// Whitespace-separated token count.
  pub words: usize,
}

impl TextStats {
  pub fn of(text: &str) -> Self {
    Self {
      sentences: text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count(),
      words: text.split_whitespace().count(),
    }
  }
}

/// Part 5 for a single short sentence, Part 6 for a short paragraph, else Part 7.
pub fn detect_part(sentences: usize, words: usize) -> ToeicPart {
  if sentences <= 1 && words < 30 {
    ToeicPart::Part5
  } else if sentences <= 4 && words < 100 {
    ToeicPart::Part6
  } else {
    ToeicPart::Part7
  }
}

fn part_reason(part: ToeicPart) -> &'static str {
  match part {
    ToeicPart::Part5 => "Short single sentence suitable for grammar/vocabulary testing",
    ToeicPart::Part6 => "Short paragraph suitable for text completion",
    ToeicPart::Part7 => "Longer passage suitable for reading comprehension",
  }
}

fn tag_token(word: &str) -> PosTag {
  let lower = word.to_lowercase();
  let (pos, description) = if matches!(lower.as_str(), "the" | "a" | "an") {
    ("DET", "Determiner")
  } else if matches!(lower.as_str(), "is" | "are" | "was" | "were" | "has" | "have" | "had" | "been") {
    ("VERB", "Auxiliary/Main Verb")
  } else if word.ends_with("ly") {
    ("ADV", "Adverb")
  } else if word.ends_with("ed") || word.ends_with("ing") {
    ("VERB", "Verb form")
  } else {
    ("NOUN/ADJ", "Noun or Adjective")
  };
  PosTag { word: word.to_string(), pos: pos.into(), description: description.into() }
}

fn grammar(kind: &str, value: &str, explanation: &str) -> GrammarElement {
  GrammarElement { kind: kind.into(), value: value.into(), explanation: explanation.into() }
}

/// Heuristic analysis used offline and whenever the model call fails.
/// Keyword checks are plain substring tests on the lowercased text.
pub fn analyze_rule_based(text: &str) -> AnalysisResult {
  let pos_tags = text
    .split_whitespace()
    .take(TAGGED_TOKENS)
    .map(|w| tag_token(w.trim_matches(|c| matches!(c, '.' | ',' | '!' | '?'))))
    .collect();

  let lower = text.to_lowercase();
  let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
  let mut grammar_elements = Vec::new();

  if has(&["was", "were", "been"]) && (lower.contains("by") || lower.contains("ed ")) {
    grammar_elements.push(grammar("voice", "Passive Voice", "Sentence uses passive construction"));
  }

  if has(&["will", "shall", "going to"]) {
    grammar_elements.push(grammar("tense", "Future", "Future tense indicator found"));
  } else if has(&["was", "were", "had", "did"]) {
    grammar_elements.push(grammar("tense", "Past", "Past tense indicator found"));
  } else {
    grammar_elements.push(grammar("tense", "Present", "Present tense (default)"));
  }

  let stats = TextStats::of(text);
  let detected_part = detect_part(stats.sentences, stats.words);

  AnalysisResult {
    original_text: text.to_string(),
    pos_tags,
    grammar_elements,
    sentence_structure: if stats.sentences <= 1 { "Simple" } else { "Complex" }.into(),
    detected_part,
    detected_part_reason: part_reason(detected_part).into(),
    summary: format!(
      "Text containing {} words in {} sentence(s).",
      stats.words,
      stats.sentences.max(1)
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::LanguageModel;
  use crate::error::BackendError;
  use async_trait::async_trait;
  use serde_json::json;
  use std::sync::Arc;

  struct Canned(Result<Value, String>);

  #[async_trait]
  impl LanguageModel for Canned {
    fn name(&self) -> &'static str { "canned" }
    async fn analyze(&self, _prompt: &str) -> Result<Value, BackendError> {
      self.0.clone().map_err(BackendError::InvalidProblem)
    }
    async fn generate(&self, _prompt: &str) -> Result<Value, BackendError> {
      unreachable!("analyzer never generates")
    }
  }

  fn analyzer(reply: Result<Value, String>) -> TextAnalyzer {
    TextAnalyzer::new(Some(Arc::new(Canned(reply))), &Prompts::default())
  }

  #[test]
  fn part_boundaries() {
    assert_eq!(detect_part(1, 2), ToeicPart::Part5);
    assert_eq!(detect_part(0, 29), ToeicPart::Part5);
    assert_eq!(detect_part(1, 30), ToeicPart::Part6);
    assert_eq!(detect_part(2, 5), ToeicPart::Part6);
    assert_eq!(detect_part(4, 99), ToeicPart::Part6);
    assert_eq!(detect_part(4, 100), ToeicPart::Part7);
    assert_eq!(detect_part(5, 10), ToeicPart::Part7);
  }

  #[test]
  fn go_now_is_part5() {
    let stats = TextStats::of("Go now.");
    assert_eq!(stats, TextStats { sentences: 1, words: 2 });
    assert_eq!(analyze_rule_based("Go now.").detected_part, ToeicPart::Part5);
  }

  #[test]
  fn tags_first_ten_tokens_with_heuristics() {
    let r = analyze_rule_based("The report was quickly finished, reviewing figures. a b c d e f g");
    assert_eq!(r.pos_tags.len(), 10);
    let tags: Vec<(&str, &str)> = r.pos_tags.iter().map(|t| (t.word.as_str(), t.pos.as_str())).collect();
    assert_eq!(tags[0], ("The", "DET"));
    assert_eq!(tags[1], ("report", "NOUN/ADJ"));
    assert_eq!(tags[2], ("was", "VERB"));
    assert_eq!(tags[3], ("quickly", "ADV"));
    assert_eq!(tags[4], ("finished", "VERB"));
    assert_eq!(tags[5], ("reviewing", "VERB"));
    assert_eq!(tags[6], ("figures", "NOUN/ADJ"));
  }

  #[test]
  fn detects_passive_and_past() {
    let r = analyze_rule_based("The contract was signed by the director.");
    let values: Vec<&str> = r.grammar_elements.iter().map(|g| g.value.as_str()).collect();
    assert_eq!(values, vec!["Passive Voice", "Past"]);
    assert_eq!(r.sentence_structure, "Simple");
  }

  #[test]
  fn future_wins_over_past() {
    let r = analyze_rule_based("The team was told they will travel.");
    assert!(r.grammar_elements.iter().any(|g| g.value == "Future"));
    assert!(!r.grammar_elements.iter().any(|g| g.value == "Past"));
  }

  #[test]
  fn present_is_default_and_summary_counts() {
    let r = analyze_rule_based("Prices rise. Sales grow! Why?");
    assert_eq!(r.grammar_elements.last().map(|g| g.value.as_str()), Some("Present"));
    assert_eq!(r.sentence_structure, "Complex");
    assert_eq!(r.detected_part, ToeicPart::Part6);
    assert_eq!(r.summary, "Text containing 5 words in 3 sentence(s).");
  }

  #[test]
  fn summary_reports_at_least_one_sentence() {
    assert_eq!(analyze_rule_based("no punctuation here").summary, "Text containing 3 words in 1 sentence(s).");
  }

  #[test]
  fn model_analysis_missing_fields_become_empty() {
    let r = parse_model_analysis("Go now.", json!({ "summary": "imperative" }));
    assert!(r.pos_tags.is_empty());
    assert!(r.grammar_elements.is_empty());
    assert_eq!(r.sentence_structure, "");
    assert_eq!(r.summary, "imperative");
    assert_eq!(r.detected_part, ToeicPart::Part5, "heuristic part when model omits it");
  }

  #[test]
  fn model_analysis_keeps_valid_part_and_drops_bad_entries() {
    let r = parse_model_analysis("Go now.", json!({
      "pos_tags": [{ "word": "Go", "pos": "VERB", "description": "imperative" }, { "oops": 1 }],
      "grammar_elements": [{ "type": "mood", "value": "Imperative", "explanation": "command" }],
      "toeic_part": "7",
      "toeic_part_reason": "model says so"
    }));
    assert_eq!(r.pos_tags.len(), 1);
    assert_eq!(r.grammar_elements[0].kind, "mood");
    assert_eq!(r.detected_part, ToeicPart::Part7);
    assert_eq!(r.detected_part_reason, "model says so");
  }

  #[test]
  fn model_analysis_out_of_range_part_uses_heuristic() {
    let r = parse_model_analysis("Go now.", json!({ "toeic_part": 3 }));
    assert_eq!(r.detected_part, ToeicPart::Part5);
  }

  #[tokio::test]
  async fn offline_analysis_is_degraded() {
    let staged = TextAnalyzer::offline().analyze_staged("Go now.").await;
    assert!(staged.is_degraded());
    assert_eq!(staged.value().detected_part, ToeicPart::Part5);
  }

  #[tokio::test]
  async fn model_failure_falls_back_to_rules() {
    let staged = analyzer(Err("timeout".into())).analyze_staged("The contract was signed by them.").await;
    assert!(staged.reason().unwrap_or_default().contains("timeout"));
    assert_eq!(staged.into_inner(), analyze_rule_based("The contract was signed by them."));
  }

  #[tokio::test]
  async fn model_success_is_ok() {
    let staged = analyzer(Ok(json!({ "toeic_part": 6, "summary": "s" }))).analyze_staged("Go now.").await;
    assert!(!staged.is_degraded());
    assert_eq!(staged.value().detected_part, ToeicPart::Part6);
  }
}
