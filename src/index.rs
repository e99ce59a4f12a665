//! Similarity index behind the pattern store.
//!
//! `PatternIndex` is the seam the store depends on; the default implementation
//! is an in-memory term-frequency index ranked by cosine similarity.

use std::collections::HashMap;

use crate::domain::{Pattern, PatternHit, PatternMeta, PatternType, ToeicPart};
use crate::error::IndexError;

/// Exact-match metadata filter applied before ranking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetaFilter {
  pub part: Option<ToeicPart>,
  pub pattern_type: Option<PatternType>,
}

impl MetaFilter {
  pub fn matches(&self, meta: &PatternMeta) -> bool {
    self.part.map_or(true, |p| p == meta.part)
      && self.pattern_type.map_or(true, |t| t == meta.pattern_type)
  }
}

pub trait PatternIndex: Send + Sync {
  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Up to `limit` documents passing `filter`, most similar first.
  fn query(&self, text: &str, limit: usize, filter: MetaFilter) -> Result<Vec<PatternHit>, IndexError>;
}

struct Doc {
  content: String,
  meta: PatternMeta,
  terms: HashMap<String, f32>,
  norm: f32,
}

#[derive(Default)]
pub struct InMemoryIndex {
  docs: Vec<Doc>,
}

impl InMemoryIndex {
  pub fn build(patterns: &[Pattern]) -> Self {
    let mut index = Self::default();
    for p in patterns {
      index.add(p);
    }
    index
  }

  pub fn add(&mut self, pattern: &Pattern) {
    let terms = term_frequencies(&pattern.content);
    let norm = magnitude(&terms);
    let hit = PatternHit::from(pattern);
    self.docs.push(Doc { content: hit.content, meta: hit.metadata, terms, norm });
  }
}

impl PatternIndex for InMemoryIndex {
  fn len(&self) -> usize {
    self.docs.len()
  }

  fn query(&self, text: &str, limit: usize, filter: MetaFilter) -> Result<Vec<PatternHit>, IndexError> {
    let q = term_frequencies(text);
    let q_norm = magnitude(&q);

    let mut scored: Vec<(usize, f32)> = self
      .docs
      .iter()
      .enumerate()
      .filter(|(_, d)| filter.matches(&d.meta))
      .map(|(i, d)| (i, cosine(&q, q_norm, &d.terms, d.norm)))
      .collect();

    // Stable sort keeps insertion order among equal scores.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(scored
      .into_iter()
      .take(limit)
      .map(|(i, _)| PatternHit { content: self.docs[i].content.clone(), metadata: self.docs[i].meta.clone() })
      .collect())
  }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
  text.split(|c: char| !c.is_alphanumeric())
    .filter(|w| w.len() > 2)
    .map(|w| w.to_lowercase())
}

fn term_frequencies(text: &str) -> HashMap<String, f32> {
  let mut tf = HashMap::new();
  for token in tokenize(text) {
    *tf.entry(token).or_insert(0.0) += 1.0;
  }
  tf
}

fn magnitude(v: &HashMap<String, f32>) -> f32 {
  v.values().map(|x| x * x).sum::<f32>().sqrt()
}

/// 0.0 when either side has no terms.
fn cosine(a: &HashMap<String, f32>, a_norm: f32, b: &HashMap<String, f32>, b_norm: f32) -> f32 {
  let denom = a_norm * b_norm;
  if denom <= f32::EPSILON {
    return 0.0;
  }
  let dot: f32 = a.iter().filter_map(|(t, x)| b.get(t).map(|y| x * y)).sum();
  dot / denom
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pattern(content: &str, pattern_type: PatternType, part: ToeicPart) -> Pattern {
    Pattern { content: content.into(), pattern_type, part, category: "c".into() }
  }

  fn sample() -> InMemoryIndex {
    InMemoryIndex::build(&[
      pattern("verb tense and voice errors", PatternType::Distractor, ToeicPart::Part5),
      pattern("synonyms with subtle meaning differences", PatternType::Distractor, ToeicPart::Part5),
      pattern("email greeting and closing", PatternType::Passage, ToeicPart::Part7),
    ])
  }

  #[test]
  fn ranks_by_overlap() {
    let hits = sample().query("subtle synonyms", 2, MetaFilter::default()).unwrap();
    assert_eq!(hits[0].content, "synonyms with subtle meaning differences");
  }

  #[test]
  fn filters_before_ranking() {
    let filter = MetaFilter { part: Some(ToeicPart::Part7), pattern_type: None };
    let hits = sample().query("verb tense", 3, filter).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].metadata.part, ToeicPart::Part7);
  }

  #[test]
  fn ties_keep_insertion_order() {
    let hits = sample().query("zzz", 3, MetaFilter::default()).unwrap();
    let order: Vec<&str> = hits.iter().map(|h| h.content.as_str()).collect();
    assert_eq!(order[0], "verb tense and voice errors");
    assert_eq!(order[2], "email greeting and closing");
  }
}
