//! Human readable table sink

use std::io::{self, Write};

use super::ReportSink;
use crate::core::summary::{TrimOutcome, TrimSummary};
use crate::core::units::format_bytes;
use crate::platform::{Hardness, WorkingSetBounds};

pub struct TableSink<W: Write> {
    writer: W,
}

impl<W: Write> TableSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    }
}

fn hardness(h: Hardness) -> &'static str {
    match h {
        Hardness::Hard => "hard",
        Hardness::Soft => "soft",
    }
}

fn bounds_cells(bounds: &WorkingSetBounds) -> String {
    format!(
        "{:>10} {:<4} {:>10} {:<4}",
        format_bytes(bounds.min_bytes),
        hardness(bounds.min_hardness),
        format_bytes(bounds.max_bytes),
        hardness(bounds.max_hardness)
    )
}

fn outcome_cells(outcome: &TrimOutcome) -> String {
    match outcome {
        TrimOutcome::Trimmed { before_bytes, after_bytes: Some(after) } => {
            format!("trimmed {} -> {}", format_bytes(*before_bytes), format_bytes(*after))
        }
        TrimOutcome::Trimmed { before_bytes, after_bytes: None } => {
            format!("trimmed (was {})", format_bytes(*before_bytes))
        }
        TrimOutcome::Reported { bounds } => bounds_cells(bounds),
        TrimOutcome::Skipped { reason } => format!("skipped: {}", reason),
        TrimOutcome::Failed { code, message } => format!("failed ({}): {}", code, message),
    }
}

fn render(summary: &TrimSummary) -> String {
    let mut out = String::new();
    let started = summary.started.format("%Y-%m-%d %H:%M:%S");

    if summary.suppressed {
        out.push_str(&format!("[{}] pass skipped: user not idle\n", started));
        return out;
    }

    out.push_str(&format!(
        "[{}] {} considered, {} trimmed, {} reported, {} skipped, {} failed ({} ms)\n",
        started,
        summary.considered,
        summary.trimmed,
        summary.reported,
        summary.skipped,
        summary.failed,
        summary.duration_ms
    ));

    if summary.savings_measured {
        out.push_str(&format!(
            "  Reclaimed:  {} (regrew {})\n",
            format_bytes(summary.bytes_reclaimed),
            format_bytes(summary.bytes_regrown)
        ));
    }
    if let (Some(before), Some(after)) = (summary.available_before, summary.available_after) {
        out.push_str(&format!(
            "  Available:  {} -> {}\n",
            format_bytes(before),
            format_bytes(after)
        ));
    }
    if !summary.skip_reasons.is_empty() {
        let reasons: Vec<String> = summary
            .skip_reasons
            .iter()
            .map(|(reason, count)| format!("{} {}", reason, count))
            .collect();
        out.push_str(&format!("  Skipped:    {}\n", reasons.join(", ")));
    }

    if summary.results.is_empty() {
        return out;
    }

    out.push_str("┌─────────┬────────────────────────────┬──────────────────────────────────────────────┐\n");
    out.push_str("│   PID   │ Process                    │ Result                                       │\n");
    out.push_str("├─────────┼────────────────────────────┼──────────────────────────────────────────────┤\n");
    for result in &summary.results {
        out.push_str(&format!(
            "│ {:>7} │ {:26} │ {:44} │\n",
            result.pid,
            truncate(&result.name, 26),
            truncate(&outcome_cells(&result.outcome), 44)
        ));
    }
    out.push_str("└─────────┴────────────────────────────┴──────────────────────────────────────────────┘\n");
    out
}

impl<W: Write> ReportSink for TableSink<W> {
    fn emit(&mut self, summary: &TrimSummary) -> io::Result<()> {
        self.writer.write_all(render(summary).as_bytes())?;
        self.writer.flush()
    }
}
