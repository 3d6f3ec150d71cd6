//! The seam between extraction logic and whichever vision model backs it.

use async_trait::async_trait;

use crate::error::AiError;

/// One document page, as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl ImagePart {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }
}

/// A single part of a multimodal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Image(ImagePart),
    Text(String),
}

/// Multimodal completion: parts in, raw model text out.
///
/// Implementations must send the parts in the given order and use
/// deterministic sampling.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, model: &str, parts: &[Part]) -> Result<String, AiError>;
}
