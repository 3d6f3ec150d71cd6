//! Model-facing layer: vision extraction, targeted re-verification, and the
//! async pipeline that runs the pure stages from `rentcheck-core`.

pub mod client;
pub mod error;
pub mod extractor;
pub mod gemini;
pub mod parse;
pub mod pipeline;
pub mod prompt;

pub use client::{CompletionClient, ImagePart, Part};
pub use error::{AiError, PipelineError};
pub use extractor::{FactExtractor, ModelExtractor};
pub use gemini::GeminiClient;
pub use pipeline::{Pipeline, PipelineReport};
