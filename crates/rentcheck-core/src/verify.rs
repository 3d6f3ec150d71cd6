//! Resolution policy for re-verified conflicts.
//!
//! The re-extraction itself lives with the model client; this module only
//! decides what a re-read means. Nothing here invents a value: a field with
//! no evidence on either document ends up null and flagged.

use serde::{Deserialize, Serialize};

use crate::conflict::Conflict;
use crate::evidence::{EvidencedField, Source};
use crate::facts::FactField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// The flyer re-read produced an evidenced value.
    Confirmed,
    /// The flyer stayed silent; the estimate's evidenced value is adopted
    /// but flagged for the user.
    Unconfirmed,
    /// No evidence anywhere. The field is forced to null.
    RequiresManualCheck,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Unconfirmed => "unconfirmed",
            Self::RequiresManualCheck => "requires_manual_check",
        }
    }

    /// Whether the user must double-check this field.
    pub fn is_unresolved(&self) -> bool {
        !matches!(self, Self::Confirmed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub field_name: FactField,
    pub verified_field: EvidencedField<f64>,
    pub status: VerificationStatus,
    pub note: String,
}

/// Decide the outcome of one conflict given the targeted flyer re-read.
///
/// `reread` is `None` when the re-extraction call failed outright.
pub fn resolve(conflict: &Conflict, reread: Option<EvidencedField<f64>>) -> VerificationResult {
    let field_name = conflict.field_name;

    if let Some(field) = reread.filter(|f| f.number().is_some()) {
        return VerificationResult {
            field_name,
            note: format!(
                "confirmed on flyer: {}",
                field.evidence_text().unwrap_or_default()
            ),
            verified_field: field.with_source(Source::Flyer),
            status: VerificationStatus::Confirmed,
        };
    }

    if conflict.estimate_field.number().is_some() {
        return VerificationResult {
            field_name,
            verified_field: conflict
                .estimate_field
                .clone()
                .with_note("adopted from estimate; not found on flyer"),
            status: VerificationStatus::Unconfirmed,
            note: format!("{field_name} not found on flyer; using the estimate's figure"),
        };
    }

    VerificationResult {
        field_name,
        verified_field: EvidencedField::missing(Source::Flyer)
            .with_note("no evidence on either document"),
        status: VerificationStatus::RequiresManualCheck,
        note: format!("{field_name} could not be read from either document"),
    }
}
