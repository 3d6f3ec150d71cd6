use std::time::Duration;

use thiserror::Error;

/// Failure of a single model call. Never escapes the extractor: every
/// variant degrades to empty facts or a failed re-read.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model API returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model returned no text")]
    EmptyCompletion,
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// Failure of a whole diagnosis request.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("diagnosis did not finish within {after:?}")]
    DeadlineExceeded { after: Duration },
}
