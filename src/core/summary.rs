//! Per-process results and the per-pass summary

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use super::filter::SkipReason;
use crate::platform::WorkingSetBounds;

/// What happened to one process that reached the executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrimOutcome {
    Trimmed {
        before_bytes: u64,
        /// Only measured when savings were requested
        after_bytes: Option<u64>,
    },
    Reported {
        bounds: WorkingSetBounds,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        code: u32,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrimResult {
    pub pid: u32,
    pub name: String,
    #[serde(flatten)]
    pub outcome: TrimOutcome,
}

impl TrimResult {
    /// Bytes released by this trim, clamped at zero.
    pub fn reclaimed_bytes(&self) -> u64 {
        match self.outcome {
            TrimOutcome::Trimmed { before_bytes, after_bytes: Some(after) } => {
                before_bytes.saturating_sub(after)
            }
            _ => 0,
        }
    }

    /// Bytes the working set grew back while it was being trimmed.
    pub fn regrown_bytes(&self) -> u64 {
        match self.outcome {
            TrimOutcome::Trimmed { before_bytes, after_bytes: Some(after) } => {
                after.saturating_sub(before_bytes)
            }
            _ => 0,
        }
    }
}

/// Outcome of one pass. Every enumerated process is counted exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct TrimSummary {
    pub started: DateTime<Local>,
    pub duration_ms: u64,
    /// The idle gate suppressed the pass
    pub suppressed: bool,
    pub considered: usize,
    pub skipped: usize,
    pub skip_reasons: BTreeMap<SkipReason, usize>,
    pub trimmed: usize,
    pub failed: usize,
    pub reported: usize,
    /// Sum of per-process savings, each clamped at zero
    pub bytes_reclaimed: u64,
    /// Sum of per-process regrowth, kept apart from the savings
    pub bytes_regrown: u64,
    pub savings_measured: bool,
    /// System available memory around the pass, when it could be read
    pub available_before: Option<u64>,
    pub available_after: Option<u64>,
    /// Processes that reached the executor
    pub results: Vec<TrimResult>,
}

impl TrimSummary {
    pub fn new(started: DateTime<Local>) -> Self {
        Self {
            started,
            duration_ms: 0,
            suppressed: false,
            considered: 0,
            skipped: 0,
            skip_reasons: BTreeMap::new(),
            trimmed: 0,
            failed: 0,
            reported: 0,
            bytes_reclaimed: 0,
            bytes_regrown: 0,
            savings_measured: false,
            available_before: None,
            available_after: None,
            results: Vec::new(),
        }
    }

    /// A pass the idle gate did not let run.
    pub fn suppressed(started: DateTime<Local>) -> Self {
        Self { suppressed: true, ..Self::new(started) }
    }

    /// Count a process rejected by the predicate chain.
    pub fn record_skip(&mut self, reason: SkipReason) {
        self.considered += 1;
        self.skipped += 1;
        *self.skip_reasons.entry(reason).or_default() += 1;
    }

    /// Count a process that went through the executor.
    pub fn record(&mut self, result: TrimResult) {
        self.considered += 1;
        match &result.outcome {
            TrimOutcome::Trimmed { after_bytes, .. } => {
                self.trimmed += 1;
                if after_bytes.is_some() {
                    self.savings_measured = true;
                }
                self.bytes_reclaimed += result.reclaimed_bytes();
                self.bytes_regrown += result.regrown_bytes();
            }
            TrimOutcome::Reported { .. } => self.reported += 1,
            TrimOutcome::Skipped { reason } => {
                self.skipped += 1;
                *self.skip_reasons.entry(*reason).or_default() += 1;
            }
            TrimOutcome::Failed { .. } => self.failed += 1,
        }
        self.results.push(result);
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.duration_ms = elapsed.as_millis() as u64;
    }

    /// Change in system available memory across the pass, if known.
    pub fn available_delta(&self) -> Option<i64> {
        match (self.available_before, self.available_after) {
            (Some(before), Some(after)) => Some(after as i64 - before as i64),
            _ => None,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.considered == self.skipped + self.trimmed + self.failed + self.reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trimmed(pid: u32, before: u64, after: Option<u64>) -> TrimResult {
        TrimResult {
            pid,
            name: format!("p{}", pid),
            outcome: TrimOutcome::Trimmed { before_bytes: before, after_bytes: after },
        }
    }

    #[test]
    fn test_savings_are_clamped_per_process() {
        let mut summary = TrimSummary::new(Local::now());
        summary.record(trimmed(1, 1000, Some(400)));
        // Regrew past its starting size
        summary.record(trimmed(2, 500, Some(900)));
        summary.record(trimmed(3, 800, Some(800)));

        assert_eq!(summary.trimmed, 3);
        assert_eq!(summary.bytes_reclaimed, 600);
        assert_eq!(summary.bytes_regrown, 400);
        assert!(summary.savings_measured);
    }

    #[test]
    fn test_total_never_negative_when_all_regrow() {
        let mut summary = TrimSummary::new(Local::now());
        summary.record(trimmed(1, 100, Some(5000)));
        summary.record(trimmed(2, 100, Some(7000)));
        assert_eq!(summary.bytes_reclaimed, 0);
    }

    #[test]
    fn test_counts_stay_consistent() {
        let mut summary = TrimSummary::new(Local::now());
        summary.record_skip(SkipReason::BelowThreshold);
        summary.record_skip(SkipReason::BelowThreshold);
        summary.record(TrimResult {
            pid: 3,
            name: "locked".into(),
            outcome: TrimOutcome::Skipped { reason: SkipReason::AccessDenied },
        });
        summary.record(TrimResult {
            pid: 4,
            name: "gone".into(),
            outcome: TrimOutcome::Failed { code: 87, message: "invalid parameter".into() },
        });
        summary.record(trimmed(5, 10, None));

        assert_eq!(summary.considered, 5);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.trimmed, 1);
        assert_eq!(summary.skip_reasons[&SkipReason::BelowThreshold], 2);
        assert_eq!(summary.skip_reasons[&SkipReason::AccessDenied], 1);
        assert!(!summary.savings_measured);
        assert!(summary.is_consistent());
    }

    #[test]
    fn test_suppressed_summary_is_empty() {
        let summary = TrimSummary::suppressed(Local::now());
        assert!(summary.suppressed);
        assert_eq!(summary.considered, 0);
        assert!(summary.results.is_empty());
    }

    #[test]
    fn test_available_delta() {
        let mut summary = TrimSummary::new(Local::now());
        assert_eq!(summary.available_delta(), None);
        summary.available_before = Some(4_000);
        summary.available_after = Some(3_500);
        assert_eq!(summary.available_delta(), Some(-500));
    }
}
