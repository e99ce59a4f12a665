//! ETS pattern store: a fixed catalog, an optional similarity index built once,
//! and a deterministic part-filtered fallback used whenever retrieval is off or
//! the index misbehaves. `search` never returns an error.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use crate::domain::{Pattern, PatternHit, PatternType, Staged, ToeicPart};
use crate::error::IndexError;
use crate::index::{InMemoryIndex, MetaFilter, PatternIndex};

pub const DEFAULT_SEARCH_LIMIT: usize = 3;

/// Builds the index from the catalog. Called at most once per store.
pub type IndexBuilder =
  Arc<dyn Fn(&[Pattern]) -> Result<Arc<dyn PatternIndex>, IndexError> + Send + Sync>;

pub struct PatternStore {
  catalog: Vec<Pattern>,
  retrieval_enabled: bool,
  builder: IndexBuilder,
  index: OnceCell<Option<Arc<dyn PatternIndex>>>,
  builds: AtomicUsize,
}

impl PatternStore {
  pub fn new(retrieval_enabled: bool) -> Self {
    let builder: IndexBuilder = Arc::new(|patterns: &[Pattern]| {
      Ok(Arc::new(InMemoryIndex::build(patterns)) as Arc<dyn PatternIndex>)
    });
    Self::with_builder(retrieval_enabled, builder)
  }

  pub fn with_builder(retrieval_enabled: bool, builder: IndexBuilder) -> Self {
    Self {
      catalog: default_patterns(),
      retrieval_enabled,
      builder,
      index: OnceCell::new(),
      builds: AtomicUsize::new(0),
    }
  }

  pub fn retrieval_enabled(&self) -> bool {
    self.retrieval_enabled
  }

  pub fn catalog(&self) -> &[Pattern] {
    &self.catalog
  }

  /// How many times the index builder actually ran.
  pub fn index_builds(&self) -> usize {
    self.builds.load(Ordering::SeqCst)
  }

  /// Lazy, idempotent. Concurrent first callers wait on the same build.
  #[instrument(level = "debug", skip(self))]
  pub async fn initialize(&self) {
    self.index
      .get_or_init(|| async {
        if !self.retrieval_enabled {
          info!(target: "parsey_backend", "Pattern retrieval disabled; using catalog fallback");
          return None;
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        match (self.builder)(&self.catalog) {
          Ok(index) => {
            info!(target: "parsey_backend", patterns = index.len(), "Pattern index built");
            Some(index)
          }
          Err(e) => {
            warn!(target: "parsey_backend", error = %e, "Pattern index unavailable; using catalog fallback");
            None
          }
        }
      })
      .await;
  }

  pub fn search(&self, query: &str, part: Option<ToeicPart>, pattern_type: Option<PatternType>, limit: usize) -> Vec<PatternHit> {
    self.search_staged(query, part, pattern_type, limit).into_inner()
  }

  #[instrument(level = "debug", skip(self, query), fields(query_len = query.len()))]
  pub fn search_staged(
    &self,
    query: &str,
    part: Option<ToeicPart>,
    pattern_type: Option<PatternType>,
    limit: usize,
  ) -> Staged<Vec<PatternHit>> {
    if !self.retrieval_enabled {
      return Staged::degraded(self.fallback(part, limit), "retrieval disabled");
    }
    let Some(index) = self.index.get().and_then(|i| i.as_ref()) else {
      return Staged::degraded(self.fallback(part, limit), "pattern index unavailable");
    };
    match index.query(query, limit, MetaFilter { part, pattern_type }) {
      Ok(hits) => Staged::Ok(hits),
      Err(e) => {
        warn!(target: "generation", error = %e, "Pattern search failed; using catalog fallback");
        Staged::degraded(self.fallback(part, limit), e.to_string())
      }
    }
  }

  /// First `limit` catalog entries for `part`, in catalog order. Type is ignored.
  pub fn fallback(&self, part: Option<ToeicPart>, limit: usize) -> Vec<PatternHit> {
    self.catalog
      .iter()
      .filter(|p| part.map_or(true, |want| p.part == want))
      .take(limit)
      .map(PatternHit::from)
      .collect()
  }
}

fn pattern(pattern_type: PatternType, part: ToeicPart, category: &str, content: &str) -> Pattern {
  Pattern { content: content.into(), pattern_type, part, category: category.into() }
}

/// The built-in ETS style catalog. Order is part of the fallback contract.
pub fn default_patterns() -> Vec<Pattern> {
  use PatternType::*;
  use ToeicPart::*;
  vec![
    pattern(Distractor, Part5, "grammar",
      "Part 5 distractors often include: wrong verb forms (tense/voice mismatch), incorrect word forms (noun vs adjective), similar-sounding words, preposition errors."),
    pattern(Distractor, Part5, "vocabulary",
      "Vocabulary distractors use: synonyms with subtle meaning differences, words with similar spelling, context-inappropriate choices, collocations errors."),
    pattern(Structure, Part6, "text_completion",
      "Part 6 passages are 100-150 words. Test coherence, transitions, vocabulary in context. 4 questions per passage. Include sentence insertion questions."),
    pattern(SentenceInsertion, Part6, "cohesion",
      "Sentence insertion tests understanding of: logical sequence, pronoun reference, transition words, topic continuity."),
    pattern(Passage, Part7, "email",
      "Email format: To/From/Subject header, greeting, body paragraphs, closing. Common topics: scheduling, requests, announcements, inquiries."),
    pattern(Passage, Part7, "memo",
      "Memo format: To/From/Subject/Date header. Internal communications about policies, events, changes. Formal but concise tone."),
    pattern(Passage, Part7, "advertisement",
      "Advertisement features: product/service benefits, promotional offers, contact information, call to action. Persuasive language."),
    pattern(Question, Part7, "inference",
      "Inference questions: 'What is implied...', 'What can be inferred...'. Require reading between the lines, understanding tone and purpose."),
    pattern(Question, Part7, "detail",
      "Detail questions: 'According to...', 'What is stated...'. Direct reference to passage information. Paraphrased in question."),
    pattern(Difficulty, Part5, "easy",
      "Easy Part 5: Common vocabulary, clear grammar rules, obvious context clues. Single grammar point tested."),
    pattern(Difficulty, Part5, "hard",
      "Hard Part 5: Advanced vocabulary, subtle grammar distinctions, multiple grammar points, idiomatic expressions."),
  ]
}
