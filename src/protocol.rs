//! Public HTTP request/response structs (serde ready) and request validation.
//! Keep this small and stable to evolve backend and frontend independently.

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AnalysisResult, Difficulty, GenerationOutcome, GenerationRequest, GrammarElement, PosTag, Problem, ToeicPart,
    MAX_SOURCE_CHARS,
};
use crate::error::ValidationError;

pub const ALLOWED_IMAGE_TYPES: [&str; 6] = [
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/bmp",
    "image/webp",
];
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
/// Request body cap for uploads: the image limit plus room for multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;
/// Multipart field that carries the image.
pub const UPLOAD_FIELD: &str = "file";

fn default_true() -> bool {
    true
}
fn default_count() -> i64 {
    1
}

fn check_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    if text.chars().count() > MAX_SOURCE_CHARS {
        return Err(ValidationError::TextTooLong(MAX_SOURCE_CHARS));
    }
    Ok(())
}

//
// Analysis
//

#[derive(Debug, Deserialize)]
pub struct AnalyzeIn {
    pub text: String,
    #[serde(default = "default_true")]
    pub include_pos: bool,
    #[serde(default = "default_true")]
    pub include_grammar: bool,
    #[serde(default = "default_true")]
    pub include_structure: bool,
}

impl AnalyzeIn {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_text(&self.text)
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeOut {
    pub original_text: String,
    pub pos_tags: Option<Vec<PosTag>>,
    pub grammar_elements: Option<Vec<GrammarElement>>,
    pub sentence_structure: Option<String>,
    pub toeic_part: ToeicPart,
    pub toeic_part_reason: String,
    pub summary: String,
}

impl AnalyzeOut {
    pub fn from_analysis(a: AnalysisResult, req: &AnalyzeIn) -> Self {
        Self {
            original_text: a.original_text,
            pos_tags: req.include_pos.then_some(a.pos_tags),
            grammar_elements: req.include_grammar.then_some(a.grammar_elements),
            sentence_structure: req.include_structure.then_some(a.sentence_structure),
            toeic_part: a.detected_part,
            toeic_part_reason: a.detected_part_reason,
            summary: a.summary,
        }
    }
}

//
// Generation
//

/// Raw generation request. Numeric and enum fields stay loose so that bad
/// values produce a 400 with a readable message instead of a decode error.
#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    pub text: String,
    #[serde(default)]
    pub part: Option<i64>,
    #[serde(default = "default_count")]
    pub count: i64,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default = "default_true")]
    pub use_rag: bool,
}

impl GenerateIn {
    pub fn validate(self) -> Result<GenerationRequest, ValidationError> {
        check_text(&self.text)?;
        let part = match self.part {
            None => None,
            Some(n) => Some(ToeicPart::from_number(n).ok_or(ValidationError::InvalidPart)?),
        };
        let difficulty = match self.difficulty.as_deref() {
            None => None,
            Some(d) => Some(Difficulty::parse(d).ok_or(ValidationError::InvalidDifficulty)?),
        };
        let count = usize::try_from(self.count)
            .map_err(|_| ValidationError::CountOutOfRange(crate::domain::MAX_PROBLEM_COUNT))?;
        GenerationRequest::new(self.text, part, count, difficulty, self.use_rag)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateOut {
    pub success: bool,
    pub problems: Vec<Problem>,
    pub source_text: String,
    pub detected_part: ToeicPart,
}

impl From<GenerationOutcome> for GenerateOut {
    fn from(o: GenerationOutcome) -> Self {
        Self {
            success: o.success,
            problems: o.problems,
            source_text: o.source_text,
            detected_part: o.detected_part,
        }
    }
}

//
// OCR
//

pub fn check_image_type(content_type: Option<&str>) -> Result<(), ValidationError> {
    let mime = content_type.unwrap_or_default().trim().to_ascii_lowercase();
    if ALLOWED_IMAGE_TYPES.contains(&mime.as_str()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidMime(ALLOWED_IMAGE_TYPES.join(", ")))
    }
}

fn upload_error(e: MultipartError) -> ValidationError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::ImageTooLarge
    } else {
        ValidationError::InvalidUpload(e.body_text())
    }
}

/// Read the image from the `file` field of a multipart upload, checking its
/// content type and size. Other fields are skipped.
pub async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, ValidationError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        check_image_type(field.content_type())?;
        let bytes = field.bytes().await.map_err(upload_error)?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge);
        }
        return Ok(bytes.to_vec());
    }
    Err(ValidationError::MissingFile)
}

#[derive(Serialize)]
pub struct OcrOut {
    pub success: bool,
    pub text: String,
    pub confidence: Option<f32>,
    pub language: Option<String>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen(json: serde_json::Value) -> Result<GenerationRequest, ValidationError> {
        serde_json::from_value::<GenerateIn>(json).unwrap().validate()
    }

    #[test]
    fn generate_defaults() {
        let r = gen(serde_json::json!({ "text": "Go now." })).unwrap();
        assert_eq!(r.count, 1);
        assert!(r.use_retrieval);
        assert_eq!(r.part, None);
        assert_eq!(r.difficulty, None);
    }

    #[test]
    fn count_boundary() {
        assert_eq!(gen(serde_json::json!({ "text": "x", "count": 5 })).unwrap().count, 5);
        assert_eq!(
            gen(serde_json::json!({ "text": "x", "count": 6 })).unwrap_err(),
            ValidationError::CountOutOfRange(5)
        );
        assert!(gen(serde_json::json!({ "text": "x", "count": -1 })).is_err());
    }

    #[test]
    fn rejects_bad_part_difficulty_and_text() {
        assert_eq!(
            gen(serde_json::json!({ "text": "x", "part": 4 })).unwrap_err(),
            ValidationError::InvalidPart
        );
        assert_eq!(
            gen(serde_json::json!({ "text": "x", "difficulty": "extreme" })).unwrap_err(),
            ValidationError::InvalidDifficulty
        );
        assert_eq!(gen(serde_json::json!({ "text": " \n" })).unwrap_err(), ValidationError::EmptyText);
        assert_eq!(
            gen(serde_json::json!({ "text": "a".repeat(5001) })).unwrap_err(),
            ValidationError::TextTooLong(5000)
        );
    }

    #[test]
    fn accepts_valid_part_and_difficulty() {
        let r = gen(serde_json::json!({ "text": "x", "part": 6, "difficulty": "Hard", "use_rag": false })).unwrap();
        assert_eq!(r.part, Some(ToeicPart::Part6));
        assert_eq!(r.difficulty, Some(Difficulty::Hard));
        assert!(!r.use_retrieval);
    }

    #[test]
    fn analyze_out_respects_include_flags() {
        let req: AnalyzeIn = serde_json::from_value(serde_json::json!({ "text": "Go now.", "include_pos": false })).unwrap();
        let out = AnalyzeOut::from_analysis(crate::analyzer::analyze_rule_based("Go now."), &req);
        assert!(out.pos_tags.is_none());
        assert!(out.grammar_elements.is_some());
        assert_eq!(out.sentence_structure.as_deref(), Some("Simple"));
    }

    #[test]
    fn image_type_checks() {
        assert!(check_image_type(Some("image/png")).is_ok());
        assert!(check_image_type(Some(" Image/JPEG ")).is_ok());
        assert!(matches!(check_image_type(Some("application/pdf")), Err(ValidationError::InvalidMime(_))));
        assert!(matches!(check_image_type(None), Err(ValidationError::InvalidMime(_))));
    }
}
