//! Reading facts out of document images.
//!
//! Extraction never fails at this boundary: a transport error, a malformed
//! response, or an unexpected shape degrades to an empty fact set (or a
//! failed re-read) and is logged.

use async_trait::async_trait;
use rentcheck_core::{EvidencedField, ExtractedFacts, FactField, Source, normalize};
use tracing::{info, warn};

use crate::client::{CompletionClient, ImagePart, Part};
use crate::error::AiError;
use crate::{parse, prompt};

#[async_trait]
pub trait FactExtractor: Send + Sync {
    /// Read a full fact set from the images of one document.
    async fn extract(&self, images: &[ImagePart], source: Source) -> ExtractedFacts;

    /// Re-read one field from flyer images. `None` means the call itself
    /// failed; a `Some` with a null value means the model found nothing.
    async fn extract_field(
        &self,
        images: &[ImagePart],
        field: FactField,
    ) -> Option<EvidencedField<f64>>;

    /// Model identifier recorded on reports.
    fn model(&self) -> &str;
}

/// [`FactExtractor`] backed by a multimodal completion model.
pub struct ModelExtractor<C> {
    client: C,
    model: String,
}

impl<C: CompletionClient> ModelExtractor<C> {
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    async fn complete(&self, images: &[ImagePart], instruction: String) -> Result<String, AiError> {
        self.client
            .complete(&self.model, &request_parts(images, instruction))
            .await
    }
}

/// Images first, in order, then exactly one instruction.
fn request_parts(images: &[ImagePart], instruction: String) -> Vec<Part> {
    images
        .iter()
        .cloned()
        .map(Part::Image)
        .chain(std::iter::once(Part::Text(instruction)))
        .collect()
}

#[async_trait]
impl<C: CompletionClient> FactExtractor for ModelExtractor<C> {
    async fn extract(&self, images: &[ImagePart], source: Source) -> ExtractedFacts {
        if images.is_empty() {
            warn!(source = %source, "no images supplied");
            return ExtractedFacts::empty(source);
        }

        let result = self
            .complete(images, prompt::extraction_prompt(source))
            .await
            .and_then(|raw| parse::parse_facts(&raw, source));
        match result {
            Ok(facts) => {
                info!(
                    source = %source,
                    images = images.len(),
                    populated = facts.populated_count(),
                    other_items = facts.other_items.len(),
                    "facts extracted"
                );
                facts
            }
            Err(e) => {
                warn!(source = %source, error = %e, "extraction failed; continuing with empty facts");
                ExtractedFacts::empty(source)
            }
        }
    }

    async fn extract_field(
        &self,
        images: &[ImagePart],
        field: FactField,
    ) -> Option<EvidencedField<f64>> {
        let result = self
            .complete(images, prompt::verification_prompt(field))
            .await
            .and_then(|raw| parse::parse_field(&raw, field));
        match result {
            Ok(reread) => Some(normalize_one(field, reread)),
            Err(e) => {
                warn!(field = %field, error = %e, "re-read failed");
                None
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Apply the normalizer to a single re-read field.
pub fn normalize_one(field: FactField, value: EvidencedField<f64>) -> EvidencedField<f64> {
    let mut facts = ExtractedFacts::empty(value.source());
    facts.set(field, value);
    normalize(facts).field(field).clone()
}
