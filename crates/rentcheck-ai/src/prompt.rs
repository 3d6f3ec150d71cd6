//! Prompt templates for extraction and single-field re-verification.

use rentcheck_core::{FactField, Source};

// ── Prompt templates ──

const EXTRACTION_RULES: &str = "\
You are a transcription assistant for Japanese rental documents.

Your only job is to READ. Do not judge whether any fee is fair, do not diagnose, \
do not compute totals that are not printed.

Rules:
1. Every value must be backed by evidence_text: the exact characters you read on the \
image, copied verbatim. If you cannot quote evidence, value MUST be null.
2. null means \"not found\". 0 means \"the document explicitly states none/zero\" \
(なし, 無料, 0円, 0ヶ月, ゼロ). Never write 0 for something you did not see.
3. Amounts are yen as plain numbers (55000, not \"55,000円\"). Month counts are numbers \
of months of rent (1, 0.5).
4. confidence is 0.0 to 1.0: how sure you are of the reading. image_index is the \
0-based index of the image the evidence came from.

Listing shorthand:
- 敷1礼1 / 敷/礼 1/1: deposit 1 month, key money 1 month
- 敷2礼0: deposit 2 months, key money none
- ゼロゼロ / 敷礼なし / 敷金礼金なし: no deposit and no key money
- 礼なし / 礼金ゼロ: no key money; 敷なし: no deposit
- フリーレント1ヶ月: one month of free rent
";

const RESPONSE_SHAPE: &str = "\
Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON. \
Each field is an object {\"value\": ..., \"evidence_text\": \"...\", \"confidence\": 0.0, \
\"image_index\": 0}, with value and evidence_text null when not found:
{
  \"property_name\": {...},
  \"room_number\": {...},
  \"move_in_date\": {...},
  \"contract_start_date\": {...},
FIELD_KEYS
  \"other_items\": [{\"name\": \"...\", \"value\": 0, \"evidence_text\": \"...\", \
\"confidence\": 0.0, \"image_index\": 0}],
  \"total_items\": 0
}";

fn document_kind(source: Source) -> &'static str {
    match source {
        Source::Flyer => {
            "The images are a property listing flyer (マイソク): the terms the agent advertised."
        }
        Source::Estimate => {
            "The images are an initial-cost estimate (初期費用見積書): the amounts the tenant is billed."
        }
    }
}

/// Instruction for reading a full fact set from one document.
pub fn extraction_prompt(source: Source) -> String {
    let field_list: String = FactField::ALL
        .iter()
        .map(|f| format!("- {}: {}\n", f.as_str(), f.describe()))
        .collect();
    let field_keys: String = FactField::ALL
        .iter()
        .map(|f| format!("  \"{}\": {{...}},\n", f.as_str()))
        .collect();
    let shape = RESPONSE_SHAPE.replace("FIELD_KEYS\n", &field_keys);

    format!(
        "{rules}\n{kind}\n\n\
         Fields to read:\n\
         {field_list}\
         - other_items: every other fee line with its name, as printed\n\
         - total_items: how many fee lines the document shows\n\n\
         {shape}",
        rules = EXTRACTION_RULES,
        kind = document_kind(source),
    )
}

/// Instruction for re-reading exactly one field from the flyer.
pub fn verification_prompt(field: FactField) -> String {
    format!(
        "{rules}\n{kind}\n\n\
         Look ONLY for this one field: {name} ({description}).\n\
         Check every image, including small print, tables and footnotes.\n\n\
         Respond ONLY with a JSON object. No markdown fences, no explanation, just raw JSON:\n\
         {{\"field\": \"{name}\", \"value\": <number or null>, \"evidence_text\": \
         \"<verbatim text or null>\", \"confidence\": 0.0, \"image_index\": 0}}",
        rules = EXTRACTION_RULES,
        kind = document_kind(Source::Flyer),
        name = field.as_str(),
        description = field.describe(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_lists_every_field() {
        let prompt = extraction_prompt(Source::Estimate);
        for field in FactField::ALL {
            assert!(
                prompt.contains(&format!("\"{}\": {{...}}", field.as_str())),
                "missing {field}"
            );
        }
        assert!(prompt.contains("初期費用見積書"));
        assert!(!prompt.contains("FIELD_KEYS"));
        assert!(prompt.contains("value MUST be null"));
    }

    #[test]
    fn verification_prompt_names_one_field() {
        let prompt = verification_prompt(FactField::KeyMoneyMonths);
        assert!(prompt.contains("ONLY for this one field: key_money_months"));
        assert!(prompt.contains("\"field\": \"key_money_months\""));
        assert!(!prompt.contains("deposit_months ("));
    }
}
