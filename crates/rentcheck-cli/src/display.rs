//! Vertical card display for a diagnosis report.
//!
//! Renders a [`PipelineReport`] as grouped, human-readable sections: totals,
//! one block per item, anything left unconfirmed, the review text, and the
//! conflict audit trail.

use std::fmt::{self, Write};

use rentcheck_ai::PipelineReport;
use rentcheck_core::narrative::format_yen;
use rentcheck_core::{DiagnosisItem, ItemStatus};

const MAX_EVIDENCE_CHARS: usize = 60;

// ── Public API ──

pub fn print_report_card(report: &PipelineReport) -> fmt::Result {
    print!("{}", render_report_card(report)?);
    Ok(())
}

pub fn render_report_card(report: &PipelineReport) -> Result<String, fmt::Error> {
    let d = &report.diagnosis;
    let mut out = String::new();

    let title = match (&d.property_name, &d.room_number) {
        (Some(name), Some(room)) => format!("{name} {room}"),
        (Some(name), None) => name.clone(),
        (None, Some(room)) => format!("Room {room}"),
        (None, None) => "Unnamed property".to_string(),
    };
    writeln!(out, "=== {title} ===")?;
    writeln!(
        out,
        "Risk score {}/100, extraction quality {}",
        d.risk_score,
        d.extraction_quality.as_str()
    )?;
    writeln!(out)?;

    // ── Totals ──
    writeln!(out, "Totals")?;
    row(&mut out, "billed", &format_yen(d.total_original))?;
    row(&mut out, "fair", &format_yen(d.total_fair))?;
    row(&mut out, "negotiable", &format_yen(d.discount_amount))?;
    writeln!(out)?;

    // ── Items ──
    if !d.items.is_empty() {
        writeln!(out, "Items")?;
        for item in &d.items {
            render_item(&mut out, item)?;
        }
        writeln!(out)?;
    }

    // ── Unconfirmed ──
    if d.has_unconfirmed_items {
        writeln!(out, "Unconfirmed")?;
        row(&mut out, "fields", &d.unconfirmed_item_names.join(", "))?;
        writeln!(out)?;
    }

    // ── Review ──
    writeln!(out, "Review")?;
    for line in d.pro_review.lines() {
        writeln!(out, "  {line}")?;
    }
    writeln!(out)?;

    // ── Audit ──
    if !report.conflicts.is_empty() {
        writeln!(out, "Conflicts ({})", report.conflicts.len())?;
        for c in &report.conflicts {
            let outcome = report
                .verifications
                .iter()
                .find(|v| v.field_name == c.field_name)
                .map(|v| v.status.as_str())
                .unwrap_or("not re-read");
            writeln!(
                out,
                "  {:<26} {:<28} {}",
                c.field_name.as_str(),
                c.conflict_type.as_str(),
                outcome
            )?;
        }
        writeln!(out)?;
    }

    writeln!(
        out,
        "model {}, completed {}",
        report.model,
        report
            .completed_at
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    )?;
    Ok(out)
}

// ── Rendering helpers ──

fn row(out: &mut impl Write, label: &str, value: &str) -> fmt::Result {
    writeln!(out, "  {label:<26} {value}")
}

fn status_marker(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Fair => "  ",
        ItemStatus::Negotiable => "~ ",
        ItemStatus::Cut => "✗ ",
        ItemStatus::RequiresConfirmation => "? ",
    }
}

fn render_item(out: &mut impl Write, item: &DiagnosisItem) -> fmt::Result {
    let price = if item.price_fair == item.price_original {
        format_yen(item.price_original)
    } else {
        format!(
            "{} → {}",
            format_yen(item.price_original),
            format_yen(item.price_fair)
        )
    };
    writeln!(
        out,
        "{}{:<26} {:<22} {}",
        status_marker(item.status),
        item.name,
        item.status.as_str(),
        price
    )?;
    writeln!(out, "    {}", item.reason)?;
    if let Some(text) = &item.evidence.flyer_evidence {
        writeln!(out, "    flyer:    \"{}\"", truncate(text))?;
    }
    if let Some(text) = &item.evidence.estimate_evidence {
        writeln!(out, "    estimate: \"{}\"", truncate(text))?;
    }
    Ok(())
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_EVIDENCE_CHARS {
        return s.to_string();
    }
    let cut: String = s.chars().take(MAX_EVIDENCE_CHARS).collect();
    format!("{cut}…")
}
