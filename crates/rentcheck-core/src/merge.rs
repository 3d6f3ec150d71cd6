//! Folding verification outcomes back into the flyer facts.

use crate::facts::{ExtractedFacts, FactField};
use crate::verify::VerificationResult;

/// Flyer facts after verification, plus the fields the user must check.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub flyer: ExtractedFacts,
    /// Fields whose outcome was `unconfirmed` or `requires_manual_check`, in
    /// verification order. Carried unchanged into the diagnosis.
    pub unconfirmed_fields: Vec<FactField>,
}

/// Apply every verification result to the flyer. The estimate is never
/// touched: it already is the billed figure.
pub fn merge(mut flyer: ExtractedFacts, verifications: &[VerificationResult]) -> MergeOutcome {
    let mut unconfirmed_fields = Vec::new();
    for v in verifications {
        flyer.set(v.field_name, v.verified_field.clone());
        if v.status.is_unresolved() && !unconfirmed_fields.contains(&v.field_name) {
            unconfirmed_fields.push(v.field_name);
        }
    }
    MergeOutcome {
        flyer,
        unconfirmed_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{EvidencedField, Source};
    use crate::verify::VerificationStatus;

    fn result(field: FactField, value: Option<f64>, status: VerificationStatus) -> VerificationResult {
        let verified_field = match value {
            Some(v) => EvidencedField::new(Some(v), Some(format!("{v}")), 0.8, Source::Flyer, 0),
            None => EvidencedField::missing(Source::Flyer),
        };
        VerificationResult {
            field_name: field,
            verified_field,
            status,
            note: String::new(),
        }
    }

    #[test]
    fn applies_outcomes_and_collects_unconfirmed() {
        let mut flyer = ExtractedFacts::empty(Source::Flyer);
        flyer.set(
            FactField::Rent,
            EvidencedField::new(Some(99_000.0), Some("賃料".into()), 0.3, Source::Flyer, 0),
        );

        let outcome = merge(
            flyer,
            &[
                result(FactField::DepositMonths, Some(1.0), VerificationStatus::Confirmed),
                result(FactField::KeyMoneyMonths, Some(1.0), VerificationStatus::Unconfirmed),
                result(FactField::Rent, None, VerificationStatus::RequiresManualCheck),
            ],
        );

        assert_eq!(outcome.flyer.deposit_months.number(), Some(1.0));
        assert_eq!(outcome.flyer.key_money_months.number(), Some(1.0));
        assert!(outcome.flyer.rent.is_null());
        assert_eq!(
            outcome.unconfirmed_fields,
            vec![FactField::KeyMoneyMonths, FactField::Rent]
        );
    }

    #[test]
    fn no_verifications_leaves_flyer_untouched() {
        let flyer = ExtractedFacts::empty(Source::Flyer);
        let outcome = merge(flyer.clone(), &[]);
        assert_eq!(outcome.flyer, flyer);
        assert!(outcome.unconfirmed_fields.is_empty());
    }
}
