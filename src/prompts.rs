//! Per-part generation prompts.
//!
//! Template keys: `{patterns}` (ETS guideline block or empty), `{source_text}`,
//! `{analysis}` (grammar hint line or empty), `{difficulty}`.

use crate::config::Prompts;
use crate::domain::{AnalysisResult, Difficulty, PatternHit, ToeicPart};
use crate::util::fill_template;

/// Grammar elements quoted in the hint line.
const GRAMMAR_HINTS: usize = 3;

/// Pure: same inputs, same prompt.
pub fn build(
  templates: &Prompts,
  part: ToeicPart,
  source_text: &str,
  analysis: Option<&AnalysisResult>,
  patterns: &[PatternHit],
  difficulty: Option<Difficulty>,
) -> String {
  let template = match part {
    ToeicPart::Part5 => &templates.part5_template,
    ToeicPart::Part6 => &templates.part6_template,
    ToeicPart::Part7 => &templates.part7_template,
  };
  let pattern_block = guidelines_block(patterns);
  let analysis_line = analysis.map(grammar_hint_line).unwrap_or_default();
  let difficulty = difficulty.unwrap_or_default();

  fill_template(
    template,
    &[
      ("patterns", pattern_block.as_str()),
      ("source_text", source_text),
      ("analysis", analysis_line.as_str()),
      ("difficulty", difficulty.as_str()),
    ],
  )
}

fn guidelines_block(patterns: &[PatternHit]) -> String {
  if patterns.is_empty() {
    return String::new();
  }
  let mut block = String::from("\nETS Style Guidelines:\n");
  for p in patterns {
    block.push_str("- ");
    block.push_str(&p.content);
    block.push('\n');
  }
  block
}

fn grammar_hint_line(analysis: &AnalysisResult) -> String {
  if analysis.grammar_elements.is_empty() {
    return String::new();
  }
  let values: Vec<&str> = analysis
    .grammar_elements
    .iter()
    .take(GRAMMAR_HINTS)
    .map(|g| g.value.as_str())
    .collect();
  format!("Grammar elements identified: {}", values.join(", "))
}
