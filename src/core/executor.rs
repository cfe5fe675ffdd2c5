//! Trim executor: applies the policy's working-set bounds to one process

use tracing::{debug, warn};

use super::config::Mode;
use super::filter::SkipReason;
use super::policy::WorkingSetLimits;
use super::summary::{TrimOutcome, TrimResult};
use crate::platform::{
    BoundsRequest, PlatformError, ProcessHandle, ProcessSnapshot, WorkingSetBounds,
    WorkingSetControl,
};

/// Smallest minimum the native call accepts when only a maximum is given.
pub const MIN_WORKING_SET_FLOOR: u64 = 1;

/// Resolve configured limits into a concrete request.
///
/// `current` is only consulted when a minimum is given without a maximum.
pub fn plan_request<F>(limits: &WorkingSetLimits, current: F) -> Result<BoundsRequest, PlatformError>
where
    F: FnOnce() -> Result<WorkingSetBounds, PlatformError>,
{
    let request = match (limits.min, limits.max) {
        (None, None) => BoundsRequest::Empty,
        (None, Some(max)) => BoundsRequest::Set {
            min_bytes: MIN_WORKING_SET_FLOOR.min(max.bytes),
            max_bytes: max.bytes,
            min_hardness: None,
            max_hardness: Some(max.hardness),
        },
        (Some(min), None) => {
            let existing = current()?;
            BoundsRequest::Set {
                min_bytes: min.bytes,
                max_bytes: existing.max_bytes.max(min.bytes),
                min_hardness: Some(min.hardness),
                max_hardness: None,
            }
        }
        (Some(min), Some(max)) => BoundsRequest::Set {
            min_bytes: min.bytes,
            max_bytes: max.bytes,
            min_hardness: Some(min.hardness),
            max_hardness: Some(max.hardness),
        },
    };
    Ok(request)
}

fn open_failure(err: &PlatformError) -> SkipReason {
    match err {
        PlatformError::Exited { .. } => SkipReason::Exited,
        _ => SkipReason::AccessDenied,
    }
}

/// Runs trim or report operations against eligible processes.
pub struct TrimExecutor<'a> {
    control: &'a dyn WorkingSetControl,
    mode: Mode,
    limits: WorkingSetLimits,
    savings: bool,
}

impl<'a> TrimExecutor<'a> {
    pub fn new(control: &'a dyn WorkingSetControl, mode: Mode, limits: WorkingSetLimits, savings: bool) -> Self {
        Self { control, mode, limits, savings }
    }

    /// Handle one process. Never fails the pass.
    pub fn execute(&self, snapshot: &ProcessSnapshot) -> TrimResult {
        let outcome = match self.control.open(snapshot.pid) {
            Ok(handle) => match self.mode {
                Mode::Report => self.report(handle.as_ref()),
                Mode::Trim => self.trim(handle.as_ref(), snapshot),
            },
            Err(err) => {
                debug!("Cannot open {} ({}): {}", snapshot.name, snapshot.pid, err);
                TrimOutcome::Skipped { reason: open_failure(&err) }
            }
        };

        TrimResult { pid: snapshot.pid, name: snapshot.name.clone(), outcome }
    }

    fn report(&self, handle: &dyn ProcessHandle) -> TrimOutcome {
        match handle.bounds() {
            Ok(bounds) => TrimOutcome::Reported { bounds },
            Err(err) => {
                debug!("Cannot read bounds of {}: {}", handle.pid(), err);
                TrimOutcome::Skipped { reason: open_failure_or_unreadable(&err) }
            }
        }
    }

    fn trim(&self, handle: &dyn ProcessHandle, snapshot: &ProcessSnapshot) -> TrimOutcome {
        let before = handle.working_set_bytes().unwrap_or(snapshot.working_set_bytes);

        let request = match plan_request(&self.limits, || handle.bounds()) {
            Ok(request) => request,
            Err(err) => return failure(snapshot, err),
        };

        if let Err(err) = handle.set_bounds(&request) {
            return failure(snapshot, err);
        }

        let after = if self.savings {
            match handle.working_set_bytes() {
                Ok(after) => Some(after),
                Err(err) => {
                    debug!("Cannot re-read working set of {}: {}", snapshot.pid, err);
                    None
                }
            }
        } else {
            None
        };

        debug!(
            "Trimmed {} ({}): {} -> {:?} bytes",
            snapshot.name, snapshot.pid, before, after
        );
        TrimOutcome::Trimmed { before_bytes: before, after_bytes: after }
    }
}

fn open_failure_or_unreadable(err: &PlatformError) -> SkipReason {
    match err {
        PlatformError::Exited { .. } => SkipReason::Exited,
        _ => SkipReason::Unreadable,
    }
}

/// Any failure once the handle is open, including the process exiting
/// mid-call, is recorded with its error code.
fn failure(snapshot: &ProcessSnapshot, err: PlatformError) -> TrimOutcome {
    warn!("Failed to trim {} ({}): {}", snapshot.name, snapshot.pid, err);
    TrimOutcome::Failed { code: err.code(), message: err.to_string() }
}
