//! Domain shorthand for Japanese rental listings.
//!
//! Listing sheets compress the up-front terms into a handful of characters.
//! This module turns those notations into canonical month counts and yen
//! amounts.
//!
//! # Notation conventions
//!
//! - Joint deposit/key-money: `敷1礼1`, `敷2礼0`, `敷/礼 1/1`, `敷金1ヶ月・礼金1ヶ月`
//! - "Zero-zero" listings: `ゼロゼロ`, `敷礼なし`, `敷金礼金なし`
//! - Single terms: `礼なし`, `敷金2ヶ月`, `礼金1`
//! - Months: `1ヶ月`, `1ヵ月`, `1か月`, `1カ月`, `1ケ月`, `1箇月`, `1 month`
//! - Amounts: `80,000円`, `¥15,000`, `8.5万円`
//!
//! Matching runs on a folded form: full-width ASCII becomes half-width,
//! whitespace is removed, and Latin letters are lower-cased. Exact table entries
//! win over the generic patterns.

use std::sync::LazyLock;

use regex::Regex;

use crate::facts::FactField;

/// A deposit/key-money pair read from one joint notation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointNotation {
    pub deposit_months: f64,
    pub key_money_months: f64,
}

impl JointNotation {
    pub fn months_for(&self, field: FactField) -> Option<f64> {
        match field {
            FactField::DepositMonths => Some(self.deposit_months),
            FactField::KeyMoneyMonths => Some(self.key_money_months),
            _ => None,
        }
    }
}

/// How a shorthand value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Exact table entry. Overrides whatever the model reported.
    Table,
    /// Generic numeric pattern. Only fills a missing value.
    Pattern,
}

/// A month count resolved from evidence text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub months: f64,
    pub origin: Origin,
}

// ── Tables ──

/// Exact joint notations (folded form) → (deposit, key money).
const JOINT_TABLE: &[(&str, f64, f64)] = &[
    ("ゼロゼロ", 0.0, 0.0),
    ("敷金礼金なし", 0.0, 0.0),
    ("敷金・礼金なし", 0.0, 0.0),
    ("敷礼なし", 0.0, 0.0),
    ("敷礼ゼロ", 0.0, 0.0),
    ("敷礼0", 0.0, 0.0),
    ("敷0礼0", 0.0, 0.0),
    ("敷0礼1", 0.0, 1.0),
    ("敷1礼0", 1.0, 0.0),
    ("敷1礼1", 1.0, 1.0),
    ("敷1礼2", 1.0, 2.0),
    ("敷2礼0", 2.0, 0.0),
    ("敷2礼1", 2.0, 1.0),
    ("敷2礼2", 2.0, 2.0),
    ("敷/礼0/0", 0.0, 0.0),
    ("敷/礼0/1", 0.0, 1.0),
    ("敷/礼1/0", 1.0, 0.0),
    ("敷/礼1/1", 1.0, 1.0),
    ("敷/礼2/1", 2.0, 1.0),
    ("敷/礼2/2", 2.0, 2.0),
];

/// Exact single-term notations (folded form).
const DEPOSIT_TABLE: &[(&str, f64)] = &[
    ("敷金なし", 0.0),
    ("敷金無し", 0.0),
    ("敷金ゼロ", 0.0),
    ("敷金無料", 0.0),
    ("敷金不要", 0.0),
    ("敷なし", 0.0),
    ("敷ゼロ", 0.0),
];

const KEY_MONEY_TABLE: &[(&str, f64)] = &[
    ("礼金なし", 0.0),
    ("礼金無し", 0.0),
    ("礼金ゼロ", 0.0),
    ("礼金無料", 0.0),
    ("礼金不要", 0.0),
    ("礼なし", 0.0),
    ("礼ゼロ", 0.0),
];

// ── Patterns ──

const MONTHS_SUFFIX: &str = r"(?:ヶ月|ヵ月|か月|カ月|ケ月|箇月|months?)";

static JOINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"敷金?(\d+(?:\.\d+)?){MONTHS_SUFFIX}?[/・,、]?礼金?(\d+(?:\.\d+)?)(?:[^\d,.円万]|$)"
    ))
    .expect("valid joint regex")
});

static SLASH_JOINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"敷金?/礼金?(\d+(?:\.\d+)?)/(\d+(?:\.\d+)?)").expect("valid slash regex")
});

static DEPOSIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"敷金?(\d+(?:\.\d+)?)(?:[^\d,.円万]|$)").expect("valid deposit regex")
});

static KEY_MONEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"礼金?(\d+(?:\.\d+)?)(?:[^\d,.円万]|$)").expect("valid key money regex")
});

static MONTHS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(\d+(?:\.\d+)?){MONTHS_SUFFIX}")).expect("valid months regex")
});

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:,\d{3})*(?:\.\d+)?)(万)?").expect("valid amount regex")
});

static ZERO_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:^|[^\d.,])0+(?:\.0+)?(?:{MONTHS_SUFFIX}|円)|¥0(?:$|[^\d,.])|^0+(?:\.0+)?$"
    ))
    .expect("valid zero regex")
});

/// Word-level markers of an explicit zero.
const ZERO_WORDS: &[&str] = &[
    "なし",
    "無し",
    "無料",
    "不要",
    "ゼロ",
    "none",
    "nocharge",
    "free",
    "notrequired",
];

// ── Public API ──

/// Fold evidence text for matching.
///
/// Full-width ASCII (U+FF01..U+FF5E) maps to half-width, `￥` to `¥`,
/// whitespace (including the ideographic space) is dropped, and Latin letters
/// are lower-cased.
pub fn fold(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '￥' => '¥',
            _ => c,
        })
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Find a joint deposit/key-money notation, table first.
pub fn joint_notation(evidence: &str) -> Option<(JointNotation, Origin)> {
    let folded = fold(evidence);
    if let Some(&(_, d, k)) = JOINT_TABLE.iter().find(|(pat, _, _)| contains_term(&folded, pat)) {
        return Some((joint(d, k), Origin::Table));
    }
    for re in [&*SLASH_JOINT_RE, &*JOINT_RE] {
        if let Some(caps) = re.captures(&folded) {
            let d = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let k = caps.get(2).and_then(|m| m.as_str().parse().ok());
            if let (Some(d), Some(k)) = (d, k) {
                return Some((joint(d, k), Origin::Pattern));
            }
        }
    }
    None
}

/// Resolve a month count for `field` from its own evidence text.
///
/// Order: joint table, single-term table, joint pattern, single-term
/// pattern, then a bare `N ヶ月` pattern.
pub fn resolve_months(field: FactField, evidence: &str) -> Option<Resolved> {
    resolve_labelled(field, evidence).or_else(|| {
        MONTHS_RE
            .captures(&fold(evidence))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .map(|months| Resolved { months, origin: Origin::Pattern })
    })
}

/// Resolution through notations that name the deposit or key money
/// explicitly. A bare `N ヶ月` is not attributed to either.
fn resolve_labelled(field: FactField, evidence: &str) -> Option<Resolved> {
    let folded = fold(evidence);

    let single_table: &[(&str, f64)] = match field {
        FactField::DepositMonths => DEPOSIT_TABLE,
        FactField::KeyMoneyMonths => KEY_MONEY_TABLE,
        _ => &[],
    };

    if let Some((notation, Origin::Table)) = joint_notation(evidence)
        && let Some(months) = notation.months_for(field)
    {
        return Some(Resolved { months, origin: Origin::Table });
    }
    if let Some(&(_, months)) = single_table.iter().find(|(pat, _)| contains_term(&folded, pat)) {
        return Some(Resolved { months, origin: Origin::Table });
    }
    if let Some((notation, Origin::Pattern)) = joint_notation(evidence)
        && let Some(months) = notation.months_for(field)
    {
        return Some(Resolved { months, origin: Origin::Pattern });
    }

    let single_re = match field {
        FactField::DepositMonths => &*DEPOSIT_RE,
        FactField::KeyMoneyMonths => &*KEY_MONEY_RE,
        _ => return None,
    };
    single_re
        .captures(&folded)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .map(|months| Resolved { months, origin: Origin::Pattern })
}

/// Parse a yen amount such as `80,000円`, `¥15,000` or `8.5万円`.
///
/// Returns the first amount found in the text.
pub fn parse_amount(text: &str) -> Option<f64> {
    let folded = fold(text);
    let caps = AMOUNT_RE.captures(&folded)?;
    let number: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let scale = if caps.get(2).is_some() { 10_000.0 } else { 1.0 };
    Some(number * scale)
}

/// Whether `evidence` explicitly states a zero, independent of any field.
///
/// A zero with evidence that says nothing about zero (e.g. a blank cell read
/// as `0`) does not count.
pub fn states_zero(evidence: &str) -> bool {
    let folded = fold(evidence);
    let words = folded.replace("freerent", "").replace("フリーレント", "");
    ZERO_WORDS.iter().any(|w| words.contains(w)) || ZERO_AMOUNT_RE.is_match(&folded)
}

/// Whether `evidence` explicitly states a zero for `field`.
///
/// Deposit and key money are decided by their own notation when one is
/// present: `敷金なし 礼金1ヶ月` states a zero deposit but not zero key money,
/// and `敷1礼0` states zero key money. Otherwise this falls back to
/// [`states_zero`].
pub fn is_explicit_zero(field: FactField, evidence: &str) -> bool {
    if matches!(field, FactField::DepositMonths | FactField::KeyMoneyMonths)
        && let Some(resolved) = resolve_labelled(field, evidence)
    {
        return resolved.months == 0.0;
    }
    states_zero(evidence)
}

/// Substring match that refuses a hit continuing into a number, so `敷1礼1`
/// does not match inside `敷1礼1.5` or `敷/礼1/10`.
fn contains_term(folded: &str, term: &str) -> bool {
    folded.match_indices(term).any(|(at, _)| {
        !folded[at + term.len()..].starts_with(|c: char| c.is_ascii_digit() || c == '.')
    })
}

fn joint(deposit_months: f64, key_money_months: f64) -> JointNotation {
    JointNotation {
        deposit_months,
        key_money_months,
    }
}
