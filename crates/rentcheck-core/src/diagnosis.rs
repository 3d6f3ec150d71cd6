//! Deterministic diagnosis: merged facts in, priced verdicts out.
//!
//! [`diagnose`] is a pure function. It performs no I/O, reads no clock, and
//! returns identical output for identical input, so every rule below can be
//! tested without a model.
//!
//! # Category rules
//!
//! | Category          | Verdict |
//! |-------------------|---------|
//! | Rent, management  | Passed through unchanged, never discounted |
//! | Deposit           | `months × rent`, fair |
//! | Key money         | Cut when the flyer states zero but the bill shows more |
//! | Brokerage         | Negotiable above half a month (+10% tax) |
//! | Fire insurance    | Negotiable above ¥16,000 |
//! | Support service   | Cut when the flyer never mentions it or states it is free, negotiable when optional |
//! | Key exchange      | Cut when the flyer states it is free, negotiable when not documented |
//! | Cleaning, guarantee | Fair |
//! | Other items       | Fair when the flyer lists a matching item, cut otherwise |
//!
//! Any field still unconfirmed after verification turns a fair verdict into
//! `requires_confirmation`.

use serde::{Deserialize, Serialize};

use crate::config::RiskWeights;
use crate::conflict::CROSS_CHECKED;
use crate::evidence::EvidencedField;
use crate::facts::{ExtractedFacts, FactField, OtherItem};
use crate::narrative::{self, NarrativeInput, format_months, format_yen};
use crate::shorthand::fold;

/// Consumption tax multiplier applied to brokerage fees.
pub const TAX_RATE: f64 = 1.1;
/// Brokerage ceiling without explicit tenant consent, in months of rent.
pub const BROKERAGE_FAIR_MONTHS: f64 = 0.5;
/// Typical price of a two-year renter's fire insurance policy.
pub const FIRE_INSURANCE_CAP: i64 = 16_000;

const EPSILON: f64 = 1e-9;

const SUPPORT_KEYWORDS: &[&str] = &["サポート", "安心", "24時間", "support", "concierge", "コンシェルジュ"];
const KEY_EXCHANGE_KEYWORDS: &[&str] = &["鍵交換", "鍵", "シリンダー", "keyexchange", "lock"];
const OPTIONAL_MARKERS: &[&str] = &["任意", "オプション", "希望者", "optional"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Fair,
    Negotiable,
    Cut,
    RequiresConfirmation,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fair => "fair",
            Self::Negotiable => "negotiable",
            Self::Cut => "cut",
            Self::RequiresConfirmation => "requires_confirmation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionQuality {
    High,
    Medium,
    Low,
}

impl ExtractionQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Where the verdict's figures came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEvidence {
    pub flyer_evidence: Option<String>,
    pub estimate_evidence: Option<String>,
    pub source_description: String,
}

impl ItemEvidence {
    pub fn new(flyer: Option<&str>, estimate: Option<&str>) -> Self {
        let source_description = match (flyer, estimate) {
            (Some(_), Some(_)) => "flyer and estimate",
            (None, Some(_)) => "estimate only",
            (Some(_), None) => "flyer only",
            (None, None) => "not found on either document",
        };
        Self {
            flyer_evidence: flyer.map(String::from),
            estimate_evidence: estimate.map(String::from),
            source_description: source_description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisItem {
    pub name: String,
    pub price_original: i64,
    pub price_fair: i64,
    pub status: ItemStatus,
    pub reason: String,
    pub evidence: ItemEvidence,
    pub requires_confirmation: bool,
    pub confidence: f64,
}

impl DiagnosisItem {
    fn new(
        name: &str,
        price_original: i64,
        price_fair: i64,
        status: ItemStatus,
        reason: String,
        evidence: ItemEvidence,
        confidence: f64,
    ) -> Self {
        // Nothing to push back on when nothing is billed.
        let (status, price_fair, reason) =
            if price_original <= 0 && matches!(status, ItemStatus::Cut | ItemStatus::Negotiable) {
                (ItemStatus::Fair, price_original, format!("{name} is billed at no charge"))
            } else {
                (status, price_fair, reason)
            };
        let confidence = if status == ItemStatus::RequiresConfirmation {
            confidence.min(0.5)
        } else {
            confidence
        };
        Self {
            name: name.to_string(),
            price_original,
            price_fair,
            status,
            reason,
            evidence,
            requires_confirmation: status == ItemStatus::RequiresConfirmation,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub property_name: Option<String>,
    pub room_number: Option<String>,
    pub items: Vec<DiagnosisItem>,
    pub total_original: i64,
    pub total_fair: i64,
    pub discount_amount: i64,
    pub risk_score: u8,
    pub pro_review: String,
    pub has_unconfirmed_items: bool,
    pub unconfirmed_item_names: Vec<String>,
    pub extraction_quality: ExtractionQuality,
}

/// Diagnose with the default risk weights.
pub fn diagnose(
    flyer: &ExtractedFacts,
    estimate: &ExtractedFacts,
    unconfirmed: &[FactField],
) -> DiagnosisResult {
    diagnose_with(flyer, estimate, unconfirmed, &RiskWeights::default())
}

/// Turn merged facts into priced, evidence-carrying verdicts.
pub fn diagnose_with(
    flyer: &ExtractedFacts,
    estimate: &ExtractedFacts,
    unconfirmed: &[FactField],
    weights: &RiskWeights,
) -> DiagnosisResult {
    let ctx = Ctx::new(flyer, estimate, unconfirmed);

    let mut items: Vec<DiagnosisItem> = [
        judge_pass_through(&ctx, FactField::Rent, "Monthly rent"),
        judge_pass_through(&ctx, FactField::ManagementFee, "Monthly management fee"),
        judge_deposit(&ctx),
        judge_key_money(&ctx),
        judge_brokerage(&ctx),
        judge_plain(&ctx, FactField::GuaranteeFee),
        judge_fire_insurance(&ctx),
        judge_support(&ctx),
        judge_key_exchange(&ctx),
        judge_plain(&ctx, FactField::CleaningFee),
    ]
    .into_iter()
    .flatten()
    .collect();
    items.extend(judge_other_items(&ctx));

    let total_original: i64 = items.iter().map(|i| i.price_original).sum();
    let total_fair: i64 = items.iter().map(|i| i.price_fair).sum();
    let discount_amount = total_original - total_fair;
    let risk_score = risk_score(&items, total_original, discount_amount, weights);

    let pro_review = narrative::compose(&NarrativeInput {
        items: &items,
        discount_amount,
        unconfirmed,
        free_rent_gap: free_rent_gap(flyer, estimate),
    });

    let property_name = flyer
        .property_name
        .value()
        .or(estimate.property_name.value())
        .cloned();
    let room_number = flyer
        .room_number
        .value()
        .or(estimate.room_number.value())
        .cloned();

    DiagnosisResult {
        property_name,
        room_number,
        items,
        total_original,
        total_fair,
        discount_amount,
        risk_score,
        pro_review,
        has_unconfirmed_items: !unconfirmed.is_empty(),
        unconfirmed_item_names: unconfirmed.iter().map(|f| f.as_str().to_string()).collect(),
        extraction_quality: extraction_quality(flyer),
    }
}

// ── Context ──

struct Ctx<'a> {
    flyer: &'a ExtractedFacts,
    estimate: &'a ExtractedFacts,
    unconfirmed: &'a [FactField],
    rent: Option<f64>,
}

impl<'a> Ctx<'a> {
    fn new(
        flyer: &'a ExtractedFacts,
        estimate: &'a ExtractedFacts,
        unconfirmed: &'a [FactField],
    ) -> Self {
        let rent = estimate
            .rent
            .number()
            .or(flyer.rent.number())
            .filter(|r| *r > 0.0);
        Self {
            flyer,
            estimate,
            unconfirmed,
            rent,
        }
    }

    /// Billed figure for a cross-checked field: the estimate, falling back to
    /// the merged flyer (which may carry a verified value).
    fn billed(&self, field: FactField) -> Option<(f64, &'a EvidencedField<f64>)> {
        self.estimate_billed(field).or_else(|| {
            if !CROSS_CHECKED.contains(&field) {
                return None;
            }
            let f = self.flyer.field(field);
            f.number().map(|v| (v, f))
        })
    }

    /// Billed figure from the estimate only.
    fn estimate_billed(&self, field: FactField) -> Option<(f64, &'a EvidencedField<f64>)> {
        let e = self.estimate.field(field);
        e.number().map(|v| (v, e))
    }

    fn is_unconfirmed(&self, field: FactField) -> bool {
        self.unconfirmed.contains(&field)
    }

    fn evidence(&self, field: FactField) -> ItemEvidence {
        ItemEvidence::new(
            self.flyer.field(field).evidence_text(),
            self.estimate.field(field).evidence_text(),
        )
    }

    /// Placeholder for a field nobody could read.
    fn unreadable(&self, field: FactField) -> DiagnosisItem {
        DiagnosisItem::new(
            field.label(),
            0,
            0,
            ItemStatus::RequiresConfirmation,
            format!(
                "{} could not be read from either document; check the originals",
                field.label()
            ),
            self.evidence(field),
            0.0,
        )
    }

    fn unreadable_if_unconfirmed(&self, field: FactField) -> Option<DiagnosisItem> {
        self.is_unconfirmed(field).then(|| self.unreadable(field))
    }

    fn rent_unknown(&self, field: FactField, months: f64, confidence: f64) -> DiagnosisItem {
        DiagnosisItem::new(
            field.label(),
            0,
            0,
            ItemStatus::RequiresConfirmation,
            format!(
                "{} of {} month(s) cannot be priced because the rent could not be read",
                field.label(),
                format_months(months)
            ),
            self.evidence(field),
            confidence,
        )
    }

    fn fair_or_unconfirmed(&self, field: FactField) -> ItemStatus {
        if self.is_unconfirmed(field) {
            ItemStatus::RequiresConfirmation
        } else {
            ItemStatus::Fair
        }
    }
}

fn yen(amount: f64) -> i64 {
    amount.round() as i64
}

fn min_confidence(a: &EvidencedField<f64>, b: &EvidencedField<f64>) -> f64 {
    a.confidence().min(b.confidence())
}

// ── Category rules ──

fn judge_pass_through(ctx: &Ctx<'_>, field: FactField, what: &str) -> Option<DiagnosisItem> {
    let Some((value, billed)) = ctx.billed(field) else {
        return ctx.unreadable_if_unconfirmed(field);
    };
    let amount = yen(value);
    let status = ctx.fair_or_unconfirmed(field);
    let reason = match status {
        ItemStatus::RequiresConfirmation => {
            format!("{what} was not confirmed on the listing; check the contract")
        }
        _ => format!("{what} is passed through unchanged"),
    };
    Some(DiagnosisItem::new(
        field.label(),
        amount,
        amount,
        status,
        reason,
        ctx.evidence(field),
        billed.confidence(),
    ))
}

fn judge_deposit(ctx: &Ctx<'_>) -> Option<DiagnosisItem> {
    let field = FactField::DepositMonths;
    let Some((months, billed)) = ctx.billed(field) else {
        return ctx.unreadable_if_unconfirmed(field);
    };
    let Some(rent) = ctx.rent else {
        return Some(ctx.rent_unknown(field, months, billed.confidence()));
    };
    let amount = yen(months * rent);
    let status = ctx.fair_or_unconfirmed(field);
    let reason = match status {
        ItemStatus::RequiresConfirmation => format!(
            "Deposit of {} month(s) was not confirmed on the listing; check the contract",
            format_months(months)
        ),
        _ => format!(
            "Deposit of {} month(s) of rent, refundable at move-out",
            format_months(months)
        ),
    };
    Some(DiagnosisItem::new(
        field.label(),
        amount,
        amount,
        status,
        reason,
        ctx.evidence(field),
        billed.confidence(),
    ))
}

fn judge_key_money(ctx: &Ctx<'_>) -> Option<DiagnosisItem> {
    let field = FactField::KeyMoneyMonths;
    let Some((months, billed)) = ctx.billed(field) else {
        return ctx.unreadable_if_unconfirmed(field);
    };
    let Some(rent) = ctx.rent else {
        return Some(ctx.rent_unknown(field, months, billed.confidence()));
    };
    let amount = yen(months * rent);
    let promised = &ctx.flyer.key_money_months;
    let promised_zero = promised.number() == Some(0.0);
    let billed_on_estimate = ctx
        .estimate
        .key_money_months
        .number()
        .is_some_and(|m| m > 0.0);

    let item = if promised_zero && billed_on_estimate {
        DiagnosisItem::new(
            field.label(),
            amount,
            0,
            ItemStatus::Cut,
            format!(
                "The listing states no key money (\"{}\") but the estimate bills {} month(s)",
                promised.evidence_text().unwrap_or_default(),
                format_months(months)
            ),
            ctx.evidence(field),
            min_confidence(promised, billed),
        )
    } else {
        let status = ctx.fair_or_unconfirmed(field);
        let reason = match status {
            ItemStatus::RequiresConfirmation => format!(
                "Key money of {} month(s) was not confirmed on the listing",
                format_months(months)
            ),
            _ => format!(
                "Key money of {} month(s) matches the listing",
                format_months(months)
            ),
        };
        DiagnosisItem::new(
            field.label(),
            amount,
            amount,
            status,
            reason,
            ctx.evidence(field),
            billed.confidence(),
        )
    };
    Some(item)
}

fn judge_brokerage(ctx: &Ctx<'_>) -> Option<DiagnosisItem> {
    let name = FactField::BrokerageFee.label();
    let unconfirmed = ctx.is_unconfirmed(FactField::BrokerageMonths)
        || ctx.is_unconfirmed(FactField::BrokerageFee);

    // Billed terms come from the estimate; the merged flyer fills in only when
    // the estimate states neither a fee nor a month count.
    let on_estimate = !ctx.estimate.brokerage_fee.is_null() || !ctx.estimate.brokerage_months.is_null();
    let terms = if on_estimate { ctx.estimate } else { ctx.flyer };
    let fee = terms.brokerage_fee.number();
    let months = terms.brokerage_months.number();
    let confidence = match (fee, months) {
        (Some(_), _) => terms.brokerage_fee.confidence(),
        _ => terms.brokerage_months.confidence(),
    };

    let evidence = ItemEvidence::new(
        ctx.flyer
            .brokerage_months
            .evidence_text()
            .or(ctx.flyer.brokerage_fee.evidence_text()),
        ctx.estimate
            .brokerage_fee
            .evidence_text()
            .or(ctx.estimate.brokerage_months.evidence_text()),
    );

    let billed = fee
        .map(yen)
        .or_else(|| months.zip(ctx.rent).map(|(m, r)| yen(m * r * TAX_RATE)));
    let Some(billed) = billed else {
        if unconfirmed {
            return Some(ctx.unreadable(FactField::BrokerageMonths));
        }
        return months.map(|m| ctx.rent_unknown(FactField::BrokerageMonths, m, confidence));
    };

    let equivalent = months.or_else(|| fee.zip(ctx.rent).map(|(f, r)| f / (r * TAX_RATE)));
    let (Some(equivalent), Some(rent)) = (equivalent, ctx.rent) else {
        return Some(DiagnosisItem::new(
            name,
            billed,
            billed,
            ItemStatus::RequiresConfirmation,
            "Brokerage fee cannot be compared with the rent because the rent could not be read"
                .to_string(),
            evidence,
            confidence,
        ));
    };

    let item = if equivalent > BROKERAGE_FAIR_MONTHS + EPSILON {
        let fair = yen(BROKERAGE_FAIR_MONTHS * rent * TAX_RATE).min(billed);
        DiagnosisItem::new(
            name,
            billed,
            fair,
            ItemStatus::Negotiable,
            format!(
                "Brokerage of {} month(s) exceeds the half-month limit that applies without the tenant's explicit consent",
                format_months(equivalent)
            ),
            evidence,
            confidence,
        )
    } else if unconfirmed {
        DiagnosisItem::new(
            name,
            billed,
            billed,
            ItemStatus::RequiresConfirmation,
            "Brokerage terms were not confirmed on the listing".to_string(),
            evidence,
            confidence,
        )
    } else {
        DiagnosisItem::new(
            name,
            billed,
            billed,
            ItemStatus::Fair,
            format!(
                "Brokerage of {} month(s) is within the half-month limit",
                format_months(equivalent)
            ),
            evidence,
            confidence,
        )
    };
    Some(item)
}

fn judge_fire_insurance(ctx: &Ctx<'_>) -> Option<DiagnosisItem> {
    let field = FactField::FireInsurance;
    let (value, billed) = ctx.estimate_billed(field)?;
    let amount = yen(value);
    let item = if amount > FIRE_INSURANCE_CAP {
        DiagnosisItem::new(
            field.label(),
            amount,
            FIRE_INSURANCE_CAP,
            ItemStatus::Negotiable,
            format!(
                "Fire insurance above {} for a standard policy; the tenant may choose their own insurer",
                format_yen(FIRE_INSURANCE_CAP)
            ),
            ctx.evidence(field),
            billed.confidence(),
        )
    } else {
        DiagnosisItem::new(
            field.label(),
            amount,
            amount,
            ctx.fair_or_unconfirmed(field),
            "Fire insurance is within the typical range".to_string(),
            ctx.evidence(field),
            billed.confidence(),
        )
    };
    Some(item)
}

/// A flyer mention of a service, either as the dedicated field or as a free-form item.
struct FlyerEntry<'a> {
    evidence: Option<&'a str>,
    optional: bool,
    /// The listing states the charge is 0. The normalizer only keeps a zero
    /// with explicit evidence, so a numeric zero here is a promise.
    free: bool,
    confidence: f64,
}

fn flyer_entry<'a>(
    flyer: &'a ExtractedFacts,
    field: FactField,
    keywords: &[&str],
) -> Option<FlyerEntry<'a>> {
    let dedicated = flyer.field(field);
    if !dedicated.is_null() || dedicated.has_evidence() {
        return Some(FlyerEntry {
            evidence: dedicated.evidence_text(),
            optional: dedicated.evidence_text().is_some_and(is_optional),
            free: dedicated.number() == Some(0.0),
            confidence: dedicated.confidence(),
        });
    }
    flyer
        .other_items
        .iter()
        .find(|item| contains_any(&item.name, keywords))
        .map(|item| FlyerEntry {
            evidence: item.field.evidence_text().or(Some(item.name.as_str())),
            optional: is_optional(&item.name)
                || item.field.evidence_text().is_some_and(is_optional),
            free: item.field.number() == Some(0.0),
            confidence: item.field.confidence(),
        })
}

fn judge_support(ctx: &Ctx<'_>) -> Option<DiagnosisItem> {
    let field = FactField::SupportServiceFee;
    let (value, billed) = ctx.estimate_billed(field)?;
    let amount = yen(value);
    let entry = flyer_entry(ctx.flyer, field, SUPPORT_KEYWORDS);
    let evidence = ItemEvidence::new(
        entry.as_ref().and_then(|e| e.evidence),
        billed.evidence_text(),
    );

    let item = match entry {
        None => DiagnosisItem::new(
            field.label(),
            amount,
            0,
            ItemStatus::Cut,
            "Not mentioned anywhere on the listing; an unadvertised service cannot be made mandatory"
                .to_string(),
            evidence,
            billed.confidence(),
        ),
        Some(entry) if entry.free => promised_free(field, amount, &entry, evidence, billed),
        Some(entry) if entry.optional => DiagnosisItem::new(
            field.label(),
            amount,
            0,
            ItemStatus::Negotiable,
            "The listing marks this service as optional; it can be declined".to_string(),
            evidence,
            billed.confidence().min(entry.confidence),
        ),
        Some(entry) => {
            let status = ctx.fair_or_unconfirmed(field);
            DiagnosisItem::new(
                field.label(),
                amount,
                amount,
                status,
                "The listing includes this service".to_string(),
                evidence,
                billed.confidence().min(entry.confidence),
            )
        }
    };
    Some(item)
}

fn judge_key_exchange(ctx: &Ctx<'_>) -> Option<DiagnosisItem> {
    let field = FactField::KeyExchangeFee;
    let (value, billed) = ctx.estimate_billed(field)?;
    let amount = yen(value);
    let entry = flyer_entry(ctx.flyer, field, KEY_EXCHANGE_KEYWORDS);
    let evidence = ItemEvidence::new(
        entry.as_ref().and_then(|e| e.evidence),
        billed.evidence_text(),
    );

    let item = match entry {
        Some(entry) if entry.free => promised_free(field, amount, &entry, evidence, billed),
        Some(entry) => DiagnosisItem::new(
            field.label(),
            amount,
            amount,
            ctx.fair_or_unconfirmed(field),
            "Key exchange is documented on the listing".to_string(),
            evidence,
            billed.confidence().min(entry.confidence),
        ),
        None => DiagnosisItem::new(
            field.label(),
            amount,
            0,
            ItemStatus::Negotiable,
            "Not on the listing; replacing the lock is customarily the landlord's cost".to_string(),
            evidence,
            billed.confidence(),
        ),
    };
    Some(item)
}

/// The listing promised the charge is 0 but the estimate bills it.
fn promised_free(
    field: FactField,
    amount: i64,
    entry: &FlyerEntry<'_>,
    evidence: ItemEvidence,
    billed: &EvidencedField<f64>,
) -> DiagnosisItem {
    DiagnosisItem::new(
        field.label(),
        amount,
        0,
        ItemStatus::Cut,
        format!(
            "The listing states this is free (\"{}\") but the estimate bills {}",
            entry.evidence.unwrap_or_default(),
            format_yen(amount)
        ),
        evidence,
        billed.confidence().min(entry.confidence),
    )
}

fn judge_plain(ctx: &Ctx<'_>, field: FactField) -> Option<DiagnosisItem> {
    let (value, billed) = ctx.estimate_billed(field)?;
    let amount = yen(value);
    let status = ctx.fair_or_unconfirmed(field);
    let reason = match status {
        ItemStatus::RequiresConfirmation => {
            format!("{} was not confirmed on the listing", field.label())
        }
        _ => format!("{} is a standard charge", field.label()),
    };
    Some(DiagnosisItem::new(
        field.label(),
        amount,
        amount,
        status,
        reason,
        ctx.evidence(field),
        billed.confidence(),
    ))
}

fn judge_other_items(ctx: &Ctx<'_>) -> Vec<DiagnosisItem> {
    ctx.estimate
        .other_items
        .iter()
        .filter_map(|item| {
            let amount = yen(item.field.number()?);
            let matched = ctx
                .flyer
                .other_items
                .iter()
                .find(|f| names_overlap(&item.name, &f.name));
            Some(judge_other(item, matched, amount))
        })
        .collect()
}

fn judge_other(item: &OtherItem, matched: Option<&OtherItem>, amount: i64) -> DiagnosisItem {
    match matched {
        Some(flyer_item) => DiagnosisItem::new(
            &item.name,
            amount,
            amount,
            ItemStatus::Fair,
            format!("Listed on the flyer as \"{}\"", flyer_item.name),
            ItemEvidence::new(
                flyer_item
                    .field
                    .evidence_text()
                    .or(Some(flyer_item.name.as_str())),
                item.field.evidence_text(),
            ),
            min_confidence(&item.field, &flyer_item.field),
        ),
        None => DiagnosisItem::new(
            &item.name,
            amount,
            0,
            ItemStatus::Cut,
            format!("\"{}\" does not appear on the listing", item.name),
            ItemEvidence::new(None, item.field.evidence_text()),
            item.field.confidence(),
        ),
    }
}

// ── Helpers ──

/// Substring containment in either direction, on folded names.
fn names_overlap(a: &str, b: &str) -> bool {
    let a = fold(a);
    let b = fold(b);
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    let folded = fold(text);
    needles.iter().any(|n| folded.contains(n))
}

fn is_optional(text: &str) -> bool {
    contains_any(text, OPTIONAL_MARKERS)
}

fn free_rent_gap(flyer: &ExtractedFacts, estimate: &ExtractedFacts) -> Option<f64> {
    let advertised = flyer.free_rent_months.number().filter(|m| *m > 0.0)?;
    match estimate.free_rent_months.number() {
        Some(applied) if applied + EPSILON >= advertised => None,
        _ => Some(advertised),
    }
}

fn risk_score(
    items: &[DiagnosisItem],
    total_original: i64,
    discount_amount: i64,
    weights: &RiskWeights,
) -> u8 {
    let discount_ratio = if total_original > 0 {
        discount_amount as f64 / total_original as f64
    } else {
        0.0
    };
    let cuts = items.iter().filter(|i| i.status == ItemStatus::Cut).count() as f64;
    let negotiable = items
        .iter()
        .filter(|i| i.status == ItemStatus::Negotiable)
        .count() as f64;
    let raw = discount_ratio * 100.0 + weights.cut * cuts + weights.negotiable * negotiable;
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}

fn extraction_quality(flyer: &ExtractedFacts) -> ExtractionQuality {
    const CRITICAL: [FactField; 3] = [
        FactField::KeyMoneyMonths,
        FactField::DepositMonths,
        FactField::Rent,
    ];
    let critical_nulls = CRITICAL.iter().filter(|f| flyer.field(**f).is_null()).count();
    let total_nulls = CROSS_CHECKED
        .iter()
        .filter(|f| flyer.field(**f).is_null())
        .count();

    if critical_nulls == 0 && total_nulls < 3 {
        ExtractionQuality::High
    } else if critical_nulls <= 1 && total_nulls < 5 {
        ExtractionQuality::Medium
    } else {
        ExtractionQuality::Low
    }
}
