//! Evidenced values: every extracted value carries the excerpt it was read from.
//!
//! A value without evidence cannot exist. [`EvidencedField::new`] drops the
//! value whenever the evidence text is blank, and deserialization goes through
//! the same constructor, so no code path can hold `value: Some(_)` next to
//! `evidence_text: None`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which document a value was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Listing sheet / floor plan: the contractual promise.
    Flyer,
    /// Itemized cost quote: the billed figures under audit.
    Estimate,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flyer => "flyer",
            Self::Estimate => "estimate",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An optional value backed by a literal excerpt from a source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "RawEvidencedField<T>",
    bound(
        serialize = "T: Serialize",
        deserialize = "T: Deserialize<'de>"
    )
)]
pub struct EvidencedField<T> {
    value: Option<T>,
    evidence_text: Option<String>,
    confidence: f64,
    source: Source,
    image_index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

/// Wire shape accepted on deserialization, before invariants are applied.
#[derive(Deserialize)]
struct RawEvidencedField<T> {
    value: Option<T>,
    #[serde(default)]
    evidence_text: Option<String>,
    #[serde(default)]
    confidence: f64,
    source: Source,
    #[serde(default)]
    image_index: u32,
    #[serde(default)]
    note: Option<String>,
}

impl<T> From<RawEvidencedField<T>> for EvidencedField<T> {
    fn from(raw: RawEvidencedField<T>) -> Self {
        let mut field = Self::new(
            raw.value,
            raw.evidence_text,
            raw.confidence,
            raw.source,
            raw.image_index,
        );
        field.note = raw.note;
        field
    }
}

impl<T> EvidencedField<T> {
    /// Build a field, enforcing the evidence-or-null rule.
    ///
    /// Blank evidence (empty or whitespace only) is treated as absent and
    /// forces the value to `None`. Confidence is clamped to `[0, 1]`; a NaN
    /// confidence becomes 0.
    pub fn new(
        value: Option<T>,
        evidence_text: Option<String>,
        confidence: f64,
        source: Source,
        image_index: u32,
    ) -> Self {
        let evidence_text = evidence_text
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let value = if evidence_text.is_some() { value } else { None };
        Self {
            value,
            evidence_text,
            confidence: clamp_confidence(confidence),
            source,
            image_index,
            note: None,
        }
    }

    /// A field with no value, no evidence, and zero confidence.
    pub fn missing(source: Source) -> Self {
        Self {
            value: None,
            evidence_text: None,
            confidence: 0.0,
            source,
            image_index: 0,
            note: None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn evidence_text(&self) -> Option<&str> {
        self.evidence_text.as_deref()
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    pub fn has_evidence(&self) -> bool {
        self.evidence_text.is_some()
    }

    /// Attach a human-readable note (e.g. "adopted from estimate").
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Drop the value but keep the evidence, so the audit trail still shows
    /// what was read.
    pub fn without_value(mut self) -> Self {
        self.value = None;
        self
    }

    /// Replace the value. Ignored when the field has no evidence.
    pub fn with_value(mut self, value: Option<T>) -> Self {
        if self.evidence_text.is_some() {
            self.value = value;
        }
        self
    }

    /// Re-tag a field read from one document as belonging to another.
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }
}

impl EvidencedField<f64> {
    /// Numeric value, treating NaN and infinities as absent.
    pub fn number(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

fn clamp_confidence(c: f64) -> f64 {
    if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) }
}
