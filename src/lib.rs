//! Turns a free-text task description into structured GTD fields by
//! asking a language model for JSON and repairing what comes back.

pub mod config;
pub mod date_parser;
pub mod error;
pub mod extractor;
pub mod json_locate;
pub mod llm_manager;
pub mod logger;
pub mod normalizer;
pub mod pipeline;
pub mod providers;
pub mod schema;
pub mod task;
pub mod ui;

pub use error::{ExtractError, Result};
pub use extractor::FieldExtractor;
pub use normalizer::Normalizer;
pub use pipeline::TaskParser;
pub use schema::{FieldKind, FieldSpec, Schema};
pub use task::{DateValue, FieldNote, FieldValue, NoteKind, RawModelResponse, TaskFieldRequest, TaskFields};
