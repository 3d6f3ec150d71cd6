//! Cross-checking the flyer against the estimate.

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::evidence::EvidencedField;
use crate::facts::{ExtractedFacts, FactField};

/// Fields present on both documents, checked in this order.
pub const CROSS_CHECKED: [FactField; 6] = [
    FactField::KeyMoneyMonths,
    FactField::DepositMonths,
    FactField::Rent,
    FactField::ManagementFee,
    FactField::BrokerageMonths,
    FactField::FreeRentMonths,
];

/// Fields where a shaky flyer reading is worth a second look even without a
/// contradiction.
pub const CRITICAL: [FactField; 5] = [
    FactField::KeyMoneyMonths,
    FactField::DepositMonths,
    FactField::Rent,
    FactField::ManagementFee,
    FactField::BrokerageMonths,
];

const VALUE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Both documents state a value and they differ.
    ValueMismatch,
    /// The flyer is silent (or unreadable) where the estimate bills something.
    FlyerNullEstimateExists,
    /// A critical flyer field was read with low confidence or without evidence.
    LowConfidence,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValueMismatch => "value_mismatch",
            Self::FlyerNullEstimateExists => "flyer_null_estimate_exists",
            Self::LowConfidence => "low_confidence",
        }
    }
}

/// A disagreement between the two documents on one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub field_name: FactField,
    pub flyer_field: EvidencedField<f64>,
    pub estimate_field: EvidencedField<f64>,
    pub conflict_type: ConflictType,
    pub needs_verification: bool,
}

/// Compare two normalized fact sets. At most one conflict per field; rules are
/// tried in order: flyer-null-estimate-exists, value mismatch, low confidence.
pub fn detect_conflicts(
    flyer: &ExtractedFacts,
    estimate: &ExtractedFacts,
    config: &PipelineConfig,
) -> Vec<Conflict> {
    CROSS_CHECKED
        .iter()
        .filter_map(|&field| {
            let f = flyer.field(field);
            let e = estimate.field(field);
            classify(field, f, e, config).map(|conflict_type| Conflict {
                field_name: field,
                flyer_field: f.clone(),
                estimate_field: e.clone(),
                conflict_type,
                needs_verification: needs_verification(conflict_type, f, config),
            })
        })
        .collect()
}

fn classify(
    field: FactField,
    flyer: &EvidencedField<f64>,
    estimate: &EvidencedField<f64>,
    config: &PipelineConfig,
) -> Option<ConflictType> {
    let low_confidence = flyer.confidence() < config.low_confidence_threshold;

    match (flyer.number(), estimate.number()) {
        (None, Some(_)) => return Some(ConflictType::FlyerNullEstimateExists),
        (Some(_), Some(_)) if low_confidence => {
            return Some(ConflictType::FlyerNullEstimateExists);
        }
        (Some(a), Some(b)) if (a - b).abs() > VALUE_EPSILON => {
            return Some(ConflictType::ValueMismatch);
        }
        _ => {}
    }

    if CRITICAL.contains(&field) && (low_confidence || !flyer.has_evidence()) {
        return Some(ConflictType::LowConfidence);
    }
    None
}

/// A clearly stated flyer term that contradicts the bill is the finding
/// itself; re-reading it can only swap the promise for the billed figure.
fn needs_verification(
    conflict_type: ConflictType,
    flyer: &EvidencedField<f64>,
    config: &PipelineConfig,
) -> bool {
    match conflict_type {
        ConflictType::ValueMismatch => {
            !(flyer.has_evidence() && flyer.confidence() >= config.high_confidence_threshold)
        }
        ConflictType::FlyerNullEstimateExists | ConflictType::LowConfidence => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::Source;

    fn f(value: Option<f64>, evidence: Option<&str>, confidence: f64, source: Source) -> EvidencedField<f64> {
        EvidencedField::new(value, evidence.map(String::from), confidence, source, 0)
    }

    /// Flyer and estimate that agree on every cross-checked field.
    fn agreeing() -> (ExtractedFacts, ExtractedFacts) {
        let mut flyer = ExtractedFacts::empty(Source::Flyer);
        let mut estimate = ExtractedFacts::empty(Source::Estimate);
        for (field, value, text) in [
            (FactField::KeyMoneyMonths, 1.0, "礼金1ヶ月"),
            (FactField::DepositMonths, 1.0, "敷金1ヶ月"),
            (FactField::Rent, 100_000.0, "賃料 100,000円"),
            (FactField::ManagementFee, 5_000.0, "管理費 5,000円"),
            (FactField::BrokerageMonths, 1.0, "仲介手数料 1ヶ月"),
            (FactField::FreeRentMonths, 0.0, "フリーレント なし"),
        ] {
            flyer.set(field, f(Some(value), Some(text), 0.95, Source::Flyer));
            estimate.set(field, f(Some(value), Some(text), 0.95, Source::Estimate));
        }
        (flyer, estimate)
    }

    #[test]
    fn agreement_yields_no_conflicts() {
        let (flyer, estimate) = agreeing();
        assert!(detect_conflicts(&flyer, &estimate, &PipelineConfig::default()).is_empty());
    }

    #[test]
    fn flyer_null_estimate_has_value() {
        let (mut flyer, mut estimate) = agreeing();
        flyer.set(FactField::DepositMonths, EvidencedField::missing(Source::Flyer));
        estimate.set(
            FactField::DepositMonths,
            f(Some(2.0), Some("敷金 2ヶ月"), 0.9, Source::Estimate),
        );

        let conflicts = detect_conflicts(&flyer, &estimate, &PipelineConfig::default());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].field_name, FactField::DepositMonths);
        assert_eq!(conflicts[0].conflict_type, ConflictType::FlyerNullEstimateExists);
        assert!(conflicts[0].needs_verification);
    }

    #[test]
    fn low_confidence_flyer_counts_as_null_when_estimate_has_value() {
        let (mut flyer, estimate) = agreeing();
        flyer.set(
            FactField::Rent,
            f(Some(100_000.0), Some("賃料 10万"), 0.4, Source::Flyer),
        );
        let conflicts = detect_conflicts(&flyer, &estimate, &PipelineConfig::default());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::FlyerNullEstimateExists);
    }

    #[test]
    fn mismatch_with_confident_flyer_skips_verification() {
        let (mut flyer, mut estimate) = agreeing();
        flyer.set(
            FactField::KeyMoneyMonths,
            f(Some(0.0), Some("礼金なし"), 0.95, Source::Flyer),
        );
        estimate.set(
            FactField::KeyMoneyMonths,
            f(Some(1.0), Some("礼金 1ヶ月"), 0.9, Source::Estimate),
        );
        let conflicts = detect_conflicts(&flyer, &estimate, &PipelineConfig::default());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::ValueMismatch);
        assert!(!conflicts[0].needs_verification);
    }

    #[test]
    fn mismatch_with_moderate_flyer_is_verified() {
        let (mut flyer, estimate) = agreeing();
        flyer.set(
            FactField::ManagementFee,
            f(Some(3_000.0), Some("管理費 3,000円"), 0.8, Source::Flyer),
        );
        let conflicts = detect_conflicts(&flyer, &estimate, &PipelineConfig::default());
        assert_eq!(conflicts[0].conflict_type, ConflictType::ValueMismatch);
        assert!(conflicts[0].needs_verification);
    }

    #[test]
    fn critical_field_missing_on_both_sides_is_low_confidence() {
        let (mut flyer, mut estimate) = agreeing();
        flyer.set(FactField::KeyMoneyMonths, EvidencedField::missing(Source::Flyer));
        estimate.set(FactField::KeyMoneyMonths, EvidencedField::missing(Source::Estimate));
        let conflicts = detect_conflicts(&flyer, &estimate, &PipelineConfig::default());
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::LowConfidence);
    }

    #[test]
    fn non_critical_field_missing_on_both_sides_is_ignored() {
        let (mut flyer, mut estimate) = agreeing();
        flyer.set(FactField::FreeRentMonths, EvidencedField::missing(Source::Flyer));
        estimate.set(FactField::FreeRentMonths, EvidencedField::missing(Source::Estimate));
        assert!(detect_conflicts(&flyer, &estimate, &PipelineConfig::default()).is_empty());
    }

    #[test]
    fn conflicts_follow_whitelist_order() {
        let flyer = ExtractedFacts::empty(Source::Flyer);
        let (_, estimate) = agreeing();
        let conflicts = detect_conflicts(&flyer, &estimate, &PipelineConfig::default());
        let names: Vec<FactField> = conflicts.iter().map(|c| c.field_name).collect();
        assert_eq!(names, CROSS_CHECKED.to_vec());
        assert!(
            conflicts
                .iter()
                .all(|c| c.conflict_type == ConflictType::FlyerNullEstimateExists)
        );
    }
}
