//! Domain models: TOEIC parts, difficulty, analysis results, patterns, problems,
//! and the staged outcome type used at every fallback boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Question format of a TOEIC reading section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ToeicPart {
  /// Incomplete sentences (single-sentence cloze).
  Part5,
  /// Text completion (short passage with a blank).
  Part6,
  /// Reading comprehension.
  Part7,
}

impl ToeicPart {
  pub const ALL: [ToeicPart; 3] = [ToeicPart::Part5, ToeicPart::Part6, ToeicPart::Part7];

  pub fn number(self) -> u8 {
    match self {
      ToeicPart::Part5 => 5,
      ToeicPart::Part6 => 6,
      ToeicPart::Part7 => 7,
    }
  }

  pub fn from_number(n: i64) -> Option<Self> {
    match n {
      5 => Some(ToeicPart::Part5),
      6 => Some(ToeicPart::Part6),
      7 => Some(ToeicPart::Part7),
      _ => None,
    }
  }
}

impl TryFrom<u8> for ToeicPart {
  type Error = String;
  fn try_from(n: u8) -> Result<Self, Self::Error> {
    ToeicPart::from_number(n as i64).ok_or_else(|| format!("invalid TOEIC part: {n}"))
  }
}

impl From<ToeicPart> for u8 {
  fn from(p: ToeicPart) -> u8 { p.number() }
}

impl fmt::Display for ToeicPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.number())
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Some(Difficulty::Easy),
      "medium" => Some(Difficulty::Medium),
      "hard" => Some(Difficulty::Hard),
      _ => None,
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Part-of-speech guess for a single token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosTag {
  pub word: String,
  pub pos: String,
  #[serde(default)]
  pub description: String,
}

/// A grammar feature found in the text (tense, voice, clause, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarElement {
  #[serde(rename = "type")]
  pub kind: String,
  pub value: String,
  #[serde(default)]
  pub explanation: String,
}

/// Output of the text analyzer. Built once per request, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
  pub original_text: String,
  pub pos_tags: Vec<PosTag>,
  pub grammar_elements: Vec<GrammarElement>,
  pub sentence_structure: String,
  pub detected_part: ToeicPart,
  pub detected_part_reason: String,
  pub summary: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
  Distractor,
  Structure,
  Passage,
  Question,
  Difficulty,
  SentenceInsertion,
}

/// Curated description of an ETS question-style convention.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
  pub content: String,
  #[serde(rename = "type")]
  pub pattern_type: PatternType,
  pub part: ToeicPart,
  pub category: String,
}

/// Metadata returned with each retrieved pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMeta {
  #[serde(rename = "type")]
  pub pattern_type: PatternType,
  pub part: ToeicPart,
  pub category: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternHit {
  pub content: String,
  pub metadata: PatternMeta,
}

impl From<&Pattern> for PatternHit {
  fn from(p: &Pattern) -> Self {
    PatternHit {
      content: p.content.clone(),
      metadata: PatternMeta {
        pattern_type: p.pattern_type,
        part: p.part,
        category: p.category.clone(),
      },
    }
  }
}

/// Validated generation request. Only built through `protocol::GenerateIn::validate`
/// or `GenerationRequest::new`, so the core can rely on its bounds.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
  pub(crate) source_text: String,
  pub(crate) part: Option<ToeicPart>,
  pub(crate) count: usize,
  pub(crate) difficulty: Option<Difficulty>,
  pub(crate) use_retrieval: bool,
}

pub const MAX_SOURCE_CHARS: usize = 5000;
pub const MAX_PROBLEM_COUNT: usize = 5;

impl GenerationRequest {
  /// Check the entry bounds: non-empty text of at most 5000 chars and 1..=5 problems.
  pub fn new(
    source_text: impl Into<String>,
    part: Option<ToeicPart>,
    count: usize,
    difficulty: Option<Difficulty>,
    use_retrieval: bool,
  ) -> Result<Self, crate::error::ValidationError> {
    use crate::error::ValidationError;
    let source_text = source_text.into();
    if source_text.trim().is_empty() {
      return Err(ValidationError::EmptyText);
    }
    if source_text.chars().count() > MAX_SOURCE_CHARS {
      return Err(ValidationError::TextTooLong(MAX_SOURCE_CHARS));
    }
    if count == 0 || count > MAX_PROBLEM_COUNT {
      return Err(ValidationError::CountOutOfRange(MAX_PROBLEM_COUNT));
    }
    Ok(Self { source_text, part, count, difficulty, use_retrieval })
  }

  pub fn source_text(&self) -> &str {
    &self.source_text
  }

  pub fn part(&self) -> Option<ToeicPart> {
    self.part
  }

  pub fn count(&self) -> usize {
    self.count
  }

  pub fn difficulty(&self) -> Option<Difficulty> {
    self.difficulty
  }

  pub fn use_retrieval(&self) -> bool {
    self.use_retrieval
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
  pub label: String,
  pub text: String,
  #[serde(default)]
  pub is_correct: bool,
}

impl Choice {
  pub fn new(label: &str, text: &str, is_correct: bool) -> Self {
    Self { label: label.into(), text: text.into(), is_correct }
  }
}

pub const CHOICE_LABELS: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
  pub part: ToeicPart,
  pub question_type: String,
  #[serde(default)]
  pub passage: Option<String>,
  pub question: String,
  pub choices: Vec<Choice>,
  pub answer: String,
  pub explanation: String,
  pub difficulty: Difficulty,
}

impl Problem {
  /// Exactly four choices labelled A-D once each, exactly one correct,
  /// and the correct label equals `answer`.
  pub fn check_invariants(&self) -> Result<(), String> {
    if self.choices.len() != CHOICE_LABELS.len() {
      return Err(format!("expected 4 choices, got {}", self.choices.len()));
    }
    for label in CHOICE_LABELS {
      let n = self.choices.iter().filter(|c| c.label == label).count();
      if n != 1 {
        return Err(format!("label {label} appears {n} times"));
      }
    }
    let correct: Vec<&Choice> = self.choices.iter().filter(|c| c.is_correct).collect();
    match correct.as_slice() {
      [only] if only.label == self.answer => Ok(()),
      [only] => Err(format!("answer {} does not match correct choice {}", self.answer, only.label)),
      many => Err(format!("expected exactly one correct choice, got {}", many.len())),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
  pub success: bool,
  pub problems: Vec<Problem>,
  pub source_text: String,
  pub detected_part: ToeicPart,
}

/// Result of a pipeline stage that cannot fail: either the primary path
/// produced the value, or a fallback did and `reason` says why.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Staged<T> {
  Ok(T),
  Degraded { value: T, reason: String },
}

impl<T> Staged<T> {
  pub fn degraded(value: T, reason: impl Into<String>) -> Self {
    Staged::Degraded { value, reason: reason.into() }
  }

  pub fn is_degraded(&self) -> bool {
    matches!(self, Staged::Degraded { .. })
  }

  pub fn reason(&self) -> Option<&str> {
    match self {
      Staged::Ok(_) => None,
      Staged::Degraded { reason, .. } => Some(reason),
    }
  }

  pub fn value(&self) -> &T {
    match self {
      Staged::Ok(v) | Staged::Degraded { value: v, .. } => v,
    }
  }

  pub fn into_inner(self) -> T {
    match self {
      Staged::Ok(v) | Staged::Degraded { value: v, .. } => v,
    }
  }
}
