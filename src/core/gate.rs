//! Idle / foreground gate
//!
//! Decides whether a pass runs at all and which process, if any, owns the
//! foreground window and must be protected.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::policy::TrimPolicy;
use crate::platform::{ForegroundResolver, InputMonitor, PlatformError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Run the pass. `idle_override` is set when the user is idle, which
    /// lifts the foreground protection.
    Run { idle_override: bool },
    /// The user is active and this is not a background pass.
    Suppress { idle: Duration, threshold: Duration },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForegroundError {
    #[error("no foreground window")]
    NoWindow,
    #[error("cannot resolve the foreground window owner: {0}")]
    Unresolved(#[from] PlatformError),
}

/// Evaluate the idle gate for one pass.
pub fn check_idle(policy: &TrimPolicy, monitor: &dyn InputMonitor) -> GateDecision {
    let threshold = policy.idle_threshold;
    // Background passes only touch non-foreground processes, so user activity
    // is irrelevant to them and idling never lifts the protection
    if threshold.is_zero() || policy.background {
        return GateDecision::Run { idle_override: false };
    }

    let idle = match monitor.idle_time() {
        Ok(idle) => Some(idle),
        Err(err) => {
            warn!("Cannot read idle time, assuming user is active: {}", err);
            None
        }
    };

    match idle {
        Some(idle) if idle >= threshold => {
            debug!("User idle for {:?} (threshold {:?})", idle, threshold);
            GateDecision::Run { idle_override: true }
        }
        idle => GateDecision::Suppress { idle: idle.unwrap_or_default(), threshold },
    }
}

/// Resolve the foreground process when the policy needs it.
///
/// Returns `Ok(None)` when foreground exclusion is off or lifted by idling,
/// and when a background pass finds no foreground window (locked workstation,
/// disconnected session). Only an explicit exclusion needs a window.
pub fn resolve_foreground(
    policy: &TrimPolicy,
    idle_override: bool,
    resolver: &dyn ForegroundResolver,
) -> Result<Option<u32>, ForegroundError> {
    if !policy.exclude_foreground || idle_override {
        return Ok(None);
    }
    match resolver.foreground_pid()? {
        Some(pid) => {
            debug!("Foreground window owned by pid {}", pid);
            Ok(Some(pid))
        }
        None if policy.foreground_required => Err(ForegroundError::NoWindow),
        None => {
            debug!("No foreground window, nothing to protect");
            Ok(None)
        }
    }
}
