//! Parsey backend: turns an English passage into TOEIC Reading practice
//! problems (Parts 5, 6 and 7).
//!
//! Pipeline: analyze the text, optionally retrieve ETS-style patterns, build a
//! prompt per problem slot, ask the configured language model, and fall back
//! to canned problems whenever a stage is unavailable.

pub mod analyzer;
pub mod backend;
pub mod config;
pub mod domain;
pub mod error;
pub mod gemini;
pub mod index;
pub mod ocr;
pub mod openai;
pub mod patterns;
pub mod prompts;
pub mod protocol;
pub mod routes;
pub mod simulation;
pub mod state;
pub mod synthesizer;
pub mod telemetry;
pub mod util;
