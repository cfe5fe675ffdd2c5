//! A single trimming pass
//!
//! gate → boost priority → resolve foreground and sessions → enumerate →
//! evaluate each process → execute → summarize. Per-process problems end up in
//! the summary; only environment facts the policy depends on can abort a pass.

use std::time::Instant;

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::config::Mode;
use super::executor::TrimExecutor;
use super::filter::{evaluate, FilterContext, Verdict};
use super::gate::{check_idle, resolve_foreground, ForegroundError, GateDecision};
use super::policy::{PolicyError, TrimPolicy};
use super::priority::PriorityBoost;
use super::summary::TrimSummary;
use super::units::format_bytes;
use crate::platform::{disconnected_sessions, Platform, PlatformError};

#[derive(Debug, Error)]
pub enum PassError {
    #[error("foreground exclusion requested but {0}")]
    Foreground(#[from] ForegroundError),

    #[error("cannot determine sessions: {0}")]
    Sessions(PlatformError),

    #[error(transparent)]
    Enumeration(PlatformError),
}

/// Rejects a policy whose session or foreground scoping the host cannot
/// provide at all, so it fails as a configuration error instead of on every
/// pass. Transient read failures are left to the pass.
pub fn preflight<P: Platform>(platform: &P, policy: &TrimPolicy) -> Result<(), PolicyError> {
    fn unsupported<T>(result: Result<T, PlatformError>, option: &str) -> Result<(), PolicyError> {
        match result {
            Err(PlatformError::NotSupported(_)) => Err(PolicyError::Unsupported(option.into())),
            _ => Ok(()),
        }
    }

    if policy.sessions.this_session_only {
        unsupported(platform.current_session_id(), "--this-session")?;
    }
    if policy.sessions.disconnected_only {
        unsupported(platform.list_sessions(), "--disconnected")?;
    }
    if policy.exclude_foreground {
        let option = if policy.foreground_required { "--not-foreground" } else { "--background" };
        unsupported(platform.foreground_pid(), option)?;
    }
    Ok(())
}

/// Runs passes for one policy. Reused across loop iterations so run-wide
/// warnings are only emitted once.
pub struct TrimPass<'a, P: Platform> {
    platform: &'a P,
    policy: &'a TrimPolicy,
    warned_unknown_owner: bool,
}

impl<'a, P: Platform> TrimPass<'a, P> {
    pub fn new(platform: &'a P, policy: &'a TrimPolicy) -> Self {
        Self { platform, policy, warned_unknown_owner: false }
    }

    pub fn policy(&self) -> &TrimPolicy {
        self.policy
    }

    pub fn run(&mut self) -> Result<TrimSummary, PassError> {
        let started = Local::now();
        let clock = Instant::now();
        let policy = self.policy;

        let idle_override = match check_idle(policy, self.platform) {
            GateDecision::Run { idle_override } => idle_override,
            GateDecision::Suppress { idle, threshold } => {
                info!(
                    "User active ({}s idle, need {}s), skipping pass",
                    idle.as_secs(),
                    threshold.as_secs()
                );
                let mut summary = TrimSummary::suppressed(started);
                summary.finish(clock.elapsed());
                return Ok(summary);
            }
        };

        let _boost = policy.boost_priority.then(|| PriorityBoost::acquire(self.platform));

        let foreground_pid = resolve_foreground(policy, idle_override, self.platform)?;
        let ctx = self.context(foreground_pid, idle_override)?;

        let mut summary = TrimSummary::new(started);
        if policy.savings {
            summary.available_before = self.platform.available_memory();
        }

        let processes = self
            .platform
            .list_processes(&policy.process_filter())
            .map_err(PassError::Enumeration)?;
        debug!("Enumerated {} processes", processes.len());

        let executor = TrimExecutor::new(self.platform, policy.mode, policy.limits, policy.savings);

        for mut snapshot in processes {
            snapshot.owns_foreground = foreground_pid == Some(snapshot.pid);

            if policy.has_user_filter() && snapshot.user.is_none() && !self.warned_unknown_owner {
                warn!(
                    "Owner of {} ({}) is unreadable; user filters are skipped for such processes",
                    snapshot.name, snapshot.pid
                );
                self.warned_unknown_owner = true;
            }

            match evaluate(&snapshot, policy, &ctx) {
                Verdict::Eligible => summary.record(executor.execute(&snapshot)),
                Verdict::Skipped(reason) => {
                    debug!(
                        "Skipping {} ({}, {:.1} MB): {}",
                        snapshot.name,
                        snapshot.pid,
                        snapshot.working_set_mb(),
                        reason
                    );
                    summary.record_skip(reason);
                }
            }
        }

        if policy.savings {
            summary.available_after = self.platform.available_memory();
        }
        summary.finish(clock.elapsed());

        match policy.mode {
            Mode::Trim => info!(
                "Pass complete: {} considered, {} trimmed, {} skipped, {} failed{} in {}ms",
                summary.considered,
                summary.trimmed,
                summary.skipped,
                summary.failed,
                if summary.savings_measured {
                    format!(", {} reclaimed", format_bytes(summary.bytes_reclaimed))
                } else {
                    String::new()
                },
                summary.duration_ms
            ),
            Mode::Report => info!(
                "Report complete: {} considered, {} reported, {} skipped",
                summary.considered, summary.reported, summary.skipped
            ),
        }

        Ok(summary)
    }

    fn context(&self, foreground_pid: Option<u32>, idle_override: bool) -> Result<FilterContext, PassError> {
        let scope = &self.policy.sessions;

        let caller_session = if scope.this_session_only {
            Some(self.platform.current_session_id().map_err(PassError::Sessions)?)
        } else {
            None
        };

        let disconnected = if scope.disconnected_only {
            let sessions = self.platform.list_sessions().map_err(PassError::Sessions)?;
            disconnected_sessions(&sessions)
        } else {
            Default::default()
        };

        Ok(FilterContext { caller_session, disconnected, foreground_pid, idle_override })
    }
}
