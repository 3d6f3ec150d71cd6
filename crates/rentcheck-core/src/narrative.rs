//! Plain-text review composed from a diagnosis. No model call.

use crate::diagnosis::{DiagnosisItem, ItemStatus};
use crate::facts::FactField;

const MINOR_DISCOUNT: i64 = 30_000;
const SIGNIFICANT_DISCOUNT: i64 = 100_000;

/// Everything the narrative depends on.
pub struct NarrativeInput<'a> {
    pub items: &'a [DiagnosisItem],
    pub discount_amount: i64,
    pub unconfirmed: &'a [FactField],
    /// Advertised free-rent months the estimate does not reflect.
    pub free_rent_gap: Option<f64>,
}

/// Compose the review: summary, unconfirmed block, then one bullet per item
/// worth pushing back on.
pub fn compose(input: &NarrativeInput<'_>) -> String {
    let mut sections = vec![summary_line(input.discount_amount)];

    if !input.unconfirmed.is_empty() {
        let mut block =
            String::from("Could not be confirmed on the listing (check these before signing):");
        for field in input.unconfirmed {
            block.push_str(&format!("\n- {} ({})", field.label(), field.as_str()));
        }
        sections.push(block);
    }

    let flagged: Vec<&DiagnosisItem> = input
        .items
        .iter()
        .filter(|i| matches!(i.status, ItemStatus::Cut | ItemStatus::Negotiable))
        .collect();
    if !flagged.is_empty() {
        let mut block = String::from("Items to push back on:");
        for item in flagged {
            block.push_str(&format!(
                "\n- {} [{}] {} → {}: {}",
                item.name,
                item.status.as_str(),
                format_yen(item.price_original),
                format_yen(item.price_fair),
                item.reason
            ));
        }
        sections.push(block);
    }

    if let Some(months) = input.free_rent_gap {
        sections.push(format!(
            "The listing advertises {} month(s) of free rent, which the estimate does not reflect.",
            format_months(months)
        ));
    }

    sections.join("\n\n")
}

fn summary_line(discount: i64) -> String {
    match discount {
        d if d <= 0 => {
            "No overcharges found: the billed items match what the listing promised.".to_string()
        }
        d if d < MINOR_DISCOUNT => format!("Minor savings of about {} are possible.", format_yen(d)),
        d if d < SIGNIFICANT_DISCOUNT => {
            format!("About {} of this estimate is negotiable.", format_yen(d))
        }
        d => format!(
            "Significant overcharge: about {} could be removed from this estimate.",
            format_yen(d)
        ),
    }
}

/// `55000` → `¥55,000`.
pub fn format_yen(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-¥{grouped}")
    } else {
        format!("¥{grouped}")
    }
}

/// `1.0` → `1`, `1.10` → `1.1`.
pub fn format_months(months: f64) -> String {
    let s = format!("{months:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
