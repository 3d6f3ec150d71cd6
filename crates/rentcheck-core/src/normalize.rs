//! Re-validation of extracted facts.
//!
//! The model's own claims ("I included evidence", "this is zero") are not
//! trusted. [`normalize`] re-applies the evidence rule, disambiguates zero
//! from "not stated", and resolves listing shorthand into canonical months.
//! It is idempotent: `normalize(normalize(x)) == normalize(x)`.

use crate::evidence::EvidencedField;
use crate::facts::{ExtractedFacts, FactField, OtherItem};
use crate::shorthand::{self, Origin};

/// Fields whose evidence may carry month shorthand.
const MONTH_FIELDS: [FactField; 4] = [
    FactField::DepositMonths,
    FactField::KeyMoneyMonths,
    FactField::BrokerageMonths,
    FactField::FreeRentMonths,
];

/// Normalize one fact set.
pub fn normalize(mut facts: ExtractedFacts) -> ExtractedFacts {
    facts.property_name = normalize_text(facts.property_name);
    facts.room_number = normalize_text(facts.room_number);
    facts.move_in_date = normalize_text(facts.move_in_date);
    facts.contract_start_date = normalize_text(facts.contract_start_date);

    for field in FactField::ALL {
        let current = facts.field(field).clone();
        facts.set(field, normalize_field(field, current));
    }

    fill_joint_sibling(&mut facts, FactField::DepositMonths, FactField::KeyMoneyMonths);
    fill_joint_sibling(&mut facts, FactField::KeyMoneyMonths, FactField::DepositMonths);

    facts.other_items = facts
        .other_items
        .into_iter()
        .filter(|item| !item.name.trim().is_empty())
        .map(|item| OtherItem {
            name: item.name.trim().to_string(),
            field: enforce_zero(item.field, shorthand::states_zero),
        })
        .collect();

    facts
}

fn normalize_text(field: EvidencedField<String>) -> EvidencedField<String> {
    let blank = field.value().is_some_and(|v| v.trim().is_empty());
    if blank { field.with_value(None) } else { field }
}

/// Zero check, then shorthand resolution, then the zero check again for
/// anything the shorthand produced. A zero with no basis is dropped before
/// the pattern fill, so the evidence can still supply the stated count.
fn normalize_field(field: FactField, value: EvidencedField<f64>) -> EvidencedField<f64> {
    let Some(evidence) = value.evidence_text().map(str::to_string) else {
        return value;
    };

    let value = if value.value().is_some() && value.number().is_none() {
        value.without_value()
    } else {
        value
    };
    let mut value = enforce_zero(value, |e| shorthand::is_explicit_zero(field, e));

    if MONTH_FIELDS.contains(&field)
        && let Some(resolved) = shorthand::resolve_months(field, &evidence)
        && (resolved.origin == Origin::Table || value.is_null())
    {
        value = value.with_value(Some(resolved.months));
    }

    enforce_zero(value, |e| shorthand::is_explicit_zero(field, e))
}

/// Keep a zero only when the evidence states it explicitly.
fn enforce_zero(
    value: EvidencedField<f64>,
    states_zero: impl Fn(&str) -> bool,
) -> EvidencedField<f64> {
    let zero_without_basis = value.number() == Some(0.0)
        && !value.evidence_text().is_some_and(|e| states_zero(e));
    if zero_without_basis {
        value
            .without_value()
            .with_note("zero without explicit evidence")
    } else {
        value
    }
}

/// Split a joint deposit/key-money notation into the sibling field when the
/// sibling has no value of its own.
fn fill_joint_sibling(facts: &mut ExtractedFacts, from: FactField, to: FactField) {
    if !facts.field(to).is_null() {
        return;
    }
    let source = facts.field(from);
    let Some(evidence) = source.evidence_text() else {
        return;
    };
    let Some((notation, _)) = shorthand::joint_notation(evidence) else {
        return;
    };
    let filled = EvidencedField::new(
        notation.months_for(to),
        Some(evidence.to_string()),
        source.confidence(),
        source.source(),
        source.image_index(),
    )
    .with_note(format!("split from joint notation in {from}"));
    facts.set(to, normalize_field(to, filled));
}
