//! End-to-end problem generation:
//! analyze → resolve part → (optional) pattern retrieval → per-slot prompt →
//! model call → parse & validate, with a simulated problem substituted for any
//! slot whose model path is absent or fails.

use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::analyzer::TextAnalyzer;
use crate::backend::SharedModel;
use crate::config::Prompts;
use crate::domain::{
  AnalysisResult, Choice, Difficulty, GenerationOutcome, GenerationRequest, PatternHit, Problem, Staged, ToeicPart,
};
use crate::error::BackendError;
use crate::patterns::{PatternStore, DEFAULT_SEARCH_LIMIT};
use crate::prompts;
use crate::simulation::simulate_problem;

#[derive(Clone)]
pub struct ProblemSynthesizer {
  model: Option<SharedModel>,
  analyzer: TextAnalyzer,
  store: Arc<PatternStore>,
  prompts: Arc<Prompts>,
}

impl ProblemSynthesizer {
  pub fn new(model: Option<SharedModel>, prompts: Arc<Prompts>, store: Arc<PatternStore>) -> Self {
    let analyzer = TextAnalyzer::new(model.clone(), &prompts);
    Self { model, analyzer, store, prompts }
  }

  pub fn store(&self) -> &PatternStore {
    &self.store
  }

  pub async fn analyze(&self, text: &str) -> AnalysisResult {
    self.analyzer.analyze(text).await
  }

  /// Always succeeds with exactly `request.count` problems.
  #[instrument(level = "info", skip(self, request), fields(request_id = %Uuid::new_v4(), count = request.count, text_len = request.source_text.len()))]
  pub async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
    let analysis = self.analyzer.analyze_staged(&request.source_text).await;
    if let Some(reason) = analysis.reason() {
      debug!(target: "generation", %reason, "Analysis degraded");
    }
    let analysis = analysis.into_inner();
    let part = request.part.unwrap_or(analysis.detected_part);

    let patterns = if request.use_retrieval && self.store.retrieval_enabled() {
      self.store.initialize().await;
      self.store
        .search_staged(&request.source_text, Some(part), None, DEFAULT_SEARCH_LIMIT)
        .into_inner()
    } else {
      Vec::new()
    };

    let slots = (0..request.count)
      .map(|slot| self.generate_one(part, request, &analysis, &patterns, slot));
    let results = join_all(slots).await;

    let simulated = results.iter().filter(|r| r.is_degraded()).count();
    info!(target: "generation", %part, problems = results.len(), simulated, patterns = patterns.len(), "Generation finished");

    GenerationOutcome {
      success: true,
      problems: results.into_iter().map(Staged::into_inner).collect(),
      source_text: request.source_text.clone(),
      detected_part: part,
    }
  }

  /// One slot. `Degraded` carries the simulated problem and why it was used.
  pub async fn generate_one(
    &self,
    part: ToeicPart,
    request: &GenerationRequest,
    analysis: &AnalysisResult,
    patterns: &[PatternHit],
    slot: usize,
  ) -> Staged<Problem> {
    let simulated = || simulate_problem(part, &request.source_text, request.difficulty);

    let Some(model) = &self.model else {
      return Staged::degraded(simulated(), "no language model configured");
    };

    let prompt = prompts::build(&self.prompts, part, &request.source_text, Some(analysis), patterns, request.difficulty);
    let parsed = match model.generate(&prompt).await {
      Ok(json) => parse_problem(json, part, request.difficulty),
      Err(e) => Err(e),
    };

    match parsed {
      Ok(problem) => Staged::Ok(problem),
      Err(e) => {
        warn!(target: "generation", slot, provider = model.name(), error = %e, "Problem generation failed; using simulated problem");
        Staged::degraded(simulated(), e.to_string())
      }
    }
  }
}

#[derive(Deserialize)]
struct ProblemReply {
  #[serde(default)] question_type: Option<String>,
  #[serde(default)] passage: Option<String>,
  #[serde(default)] question: String,
  #[serde(default)] choices: Vec<Choice>,
  #[serde(default)] answer: String,
  #[serde(default)] explanation: String,
  #[serde(default)] difficulty: Option<String>,
}

fn default_question_type(part: ToeicPart) -> &'static str {
  match part {
    ToeicPart::Part5 => "grammar",
    ToeicPart::Part6 => "context",
    ToeicPart::Part7 => "reading comprehension",
  }
}

/// Turn the model's JSON into a `Problem`, rejecting anything that breaks the
/// four-choice / one-correct-answer contract.
pub fn parse_problem(json: Value, part: ToeicPart, requested: Option<Difficulty>) -> Result<Problem, BackendError> {
  let reply: ProblemReply = serde_json::from_value(json)?;

  let question = reply.question.trim().to_string();
  if question.is_empty() {
    return Err(BackendError::InvalidProblem("missing question".into()));
  }

  let choices = reply.choices.into_iter()
    .map(|c| Choice { label: c.label.trim().to_ascii_uppercase(), text: c.text, is_correct: c.is_correct })
    .collect();

  let difficulty = requested
    .or_else(|| reply.difficulty.as_deref().and_then(Difficulty::parse))
    .unwrap_or_default();

  let problem = Problem {
    part,
    question_type: reply.question_type
      .filter(|t| !t.trim().is_empty())
      .unwrap_or_else(|| default_question_type(part).into()),
    passage: reply.passage.filter(|p| !p.trim().is_empty()),
    question,
    choices,
    answer: reply.answer.trim().to_ascii_uppercase(),
    explanation: reply.explanation,
    difficulty,
  };
  problem.check_invariants().map_err(BackendError::InvalidProblem)?;
  Ok(problem)
}
