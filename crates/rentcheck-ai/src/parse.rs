//! Lenient parsing of model output into typed facts.
//!
//! Conventions:
//! - The response may be wrapped in a markdown fence or surrounded by prose;
//!   the outermost `{...}` is taken.
//! - The top level must be a JSON object. Anything else is [`AiError::Shape`].
//! - Individual fields are lenient: a missing or malformed field is null, a
//!   numeric string (`"55,000円"`, `"1ヶ月"`) is coerced to a number.
//! - Missing confidence is 0.

use rentcheck_core::shorthand::{parse_amount, resolve_months};
use rentcheck_core::{EvidencedField, ExtractedFacts, FactField, OtherItem, Source};
use serde_json::{Map, Value};

use crate::error::AiError;

/// Strip fences and surrounding prose, leaving the outermost JSON object.
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, AiError> {
    match serde_json::from_str::<Value>(strip_fences(raw))? {
        Value::Object(map) => Ok(map),
        other => Err(AiError::Shape(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse a full-facts response for `source`.
pub fn parse_facts(raw: &str, source: Source) -> Result<ExtractedFacts, AiError> {
    let map = parse_object(raw)?;
    let mut facts = ExtractedFacts::empty(source);

    facts.property_name = text_field(map.get("property_name"), source);
    facts.room_number = text_field(map.get("room_number"), source);
    facts.move_in_date = text_field(map.get("move_in_date"), source);
    facts.contract_start_date = text_field(map.get("contract_start_date"), source);

    for field in FactField::ALL {
        if let Some(Value::Object(obj)) = map.get(field.as_str()) {
            facts.set(field, numeric_field(obj, Some(field), source));
        }
    }

    if let Some(Value::Array(items)) = map.get("other_items") {
        facts.other_items = items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                let name = obj.get("name")?.as_str()?.trim();
                (!name.is_empty()).then(|| OtherItem {
                    name: name.to_string(),
                    field: numeric_field(obj, None, source),
                })
            })
            .collect();
    }

    facts.total_items = map
        .get("total_items")
        .and_then(Value::as_u64)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(0);

    Ok(facts)
}

/// Parse a single-field verification response. The result is tagged as
/// flyer evidence.
pub fn parse_field(raw: &str, field: FactField) -> Result<EvidencedField<f64>, AiError> {
    let map = parse_object(raw)?;
    if let Some(named) = map.get("field").and_then(Value::as_str)
        && named != field.as_str()
    {
        return Err(AiError::Shape(format!(
            "asked for {field}, model answered for {named}"
        )));
    }
    Ok(numeric_field(&map, Some(field), Source::Flyer))
}

// ── Field coercion ──

fn evidence_parts(obj: &Map<String, Value>) -> (Option<String>, f64, u32) {
    let evidence = obj
        .get("evidence_text")
        .and_then(Value::as_str)
        .map(str::to_string);
    let confidence = obj.get("confidence").and_then(Value::as_f64).unwrap_or(0.0);
    let image_index = obj
        .get("image_index")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0);
    (evidence, confidence, image_index)
}

fn numeric_field(
    obj: &Map<String, Value>,
    field: Option<FactField>,
    source: Source,
) -> EvidencedField<f64> {
    let (evidence, confidence, image_index) = evidence_parts(obj);
    let value = obj.get("value").and_then(|v| coerce_number(v, field));
    EvidencedField::new(value, evidence, confidence, source, image_index)
}

fn text_field(value: Option<&Value>, source: Source) -> EvidencedField<String> {
    let Some(Value::Object(obj)) = value else {
        return EvidencedField::missing(source);
    };
    let (evidence, confidence, image_index) = evidence_parts(obj);
    let text = match obj.get("value") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    EvidencedField::new(text, evidence, confidence, source, image_index)
}

fn coerce_number(value: &Value, field: Option<FactField>) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let months = field
                .filter(FactField::is_months)
                .and_then(|f| resolve_months(f, s))
                .map(|r| r.months);
            months.or_else(|| parse_amount(s))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLYER: &str = r#"```json
{
  "property_name": {"value": "メゾン桜", "evidence_text": "メゾン桜 203", "confidence": 0.95, "image_index": 0},
  "room_number": {"value": 203, "evidence_text": "203号室", "confidence": 0.9, "image_index": 0},
  "rent": {"value": 85000, "evidence_text": "賃料 8.5万円", "confidence": 0.92, "image_index": 0},
  "deposit_months": {"value": "1ヶ月", "evidence_text": "敷1礼0", "confidence": 0.8, "image_index": 1},
  "key_money_months": {"value": 0, "evidence_text": "敷1礼0", "confidence": 0.8, "image_index": 1},
  "brokerage_fee": {"value": "93,500円", "evidence_text": "仲介手数料 93,500円", "confidence": 0.7},
  "fire_insurance": {"value": 20000, "evidence_text": "", "confidence": 0.9},
  "other_items": [
    {"name": "室内消毒", "value": 16500, "evidence_text": "室内消毒 16,500円", "confidence": 0.85, "image_index": 1},
    {"name": "  ", "value": 1},
    "garbage"
  ],
  "total_items": 7
}
```"#;

    #[test]
    fn parses_fenced_full_response() {
        let facts = parse_facts(FLYER, Source::Flyer).unwrap();
        assert_eq!(facts.source, Source::Flyer);
        assert_eq!(facts.property_name.value().map(String::as_str), Some("メゾン桜"));
        assert_eq!(facts.room_number.value().map(String::as_str), Some("203"));
        assert_eq!(facts.rent.number(), Some(85_000.0));
        assert_eq!(facts.deposit_months.number(), Some(1.0));
        assert_eq!(facts.deposit_months.image_index(), 1);
        assert_eq!(facts.key_money_months.number(), Some(0.0));
        assert_eq!(facts.brokerage_fee.number(), Some(93_500.0));
        assert_eq!(facts.total_items, 7);
        assert_eq!(facts.other_items.len(), 1);
        assert_eq!(facts.other_items[0].name, "室内消毒");
    }

    #[test]
    fn blank_evidence_nulls_value() {
        let facts = parse_facts(FLYER, Source::Flyer).unwrap();
        assert!(facts.fire_insurance.is_null());
        assert!(!facts.fire_insurance.has_evidence());
    }

    #[test]
    fn absent_fields_are_null() {
        let facts = parse_facts("{}", Source::Estimate).unwrap();
        assert_eq!(facts, ExtractedFacts::empty(Source::Estimate));
    }

    #[test]
    fn missing_confidence_is_zero() {
        let facts = parse_facts(
            r#"{"rent": {"value": 90000, "evidence_text": "賃料 90,000円"}}"#,
            Source::Estimate,
        )
        .unwrap();
        assert_eq!(facts.rent.number(), Some(90_000.0));
        assert_eq!(facts.rent.confidence(), 0.0);
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(parse_facts("[1, 2]", Source::Flyer), Err(AiError::Shape(_))));
        assert!(matches!(
            parse_facts("I could not read the image.", Source::Flyer),
            Err(AiError::Json(_))
        ));
    }

    #[test]
    fn strips_prose_around_object() {
        assert_eq!(strip_fences("Here you go: {\"a\": 1} hope it helps"), "{\"a\": 1}");
        assert_eq!(strip_fences("```json\n{}\n```"), "{}");
    }

    #[test]
    fn parses_single_field() {
        let field = parse_field(
            r#"{"field": "key_money_months", "value": 1, "evidence_text": "礼金1ヶ月", "confidence": 0.85, "image_index": 2}"#,
            FactField::KeyMoneyMonths,
        )
        .unwrap();
        assert_eq!(field.number(), Some(1.0));
        assert_eq!(field.source(), Source::Flyer);
        assert_eq!(field.image_index(), 2);
    }

    #[test]
    fn single_field_for_wrong_field_is_shape_error() {
        let err = parse_field(
            r#"{"field": "rent", "value": 1, "evidence_text": "x"}"#,
            FactField::KeyMoneyMonths,
        )
        .unwrap_err();
        assert!(matches!(err, AiError::Shape(_)));
    }

    #[test]
    fn single_field_not_found() {
        let field = parse_field(
            r#"{"field": "deposit_months", "value": null, "evidence_text": null, "confidence": 0.2}"#,
            FactField::DepositMonths,
        )
        .unwrap();
        assert!(field.is_null());
    }
}
