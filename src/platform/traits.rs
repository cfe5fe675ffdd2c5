//! Platform Abstraction Traits for Working-Set Trimming
//!
//! The trimming core never talks to the operating system directly. Every
//! native facility it needs is described here as a trait and injected:
//!
//! ```text
//! +----------------------+
//! |  core (filter, pass) |
//! +----------------------+
//!            |
//! +----------v-----------+
//! |  Platform traits     |  <- This module
//! +----------------------+
//!            |
//!     +------+------+
//!     |             |
//! +---v---+    +----v----+
//! | Win32 |    | generic |  <- Platform-specific implementations
//! +-------+    +---------+
//! ```

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Error returned by a platform collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// The caller lacks the rights to open or modify the process
    #[error("access denied to process {pid}")]
    AccessDenied { pid: u32 },

    /// The process exited between enumeration and the operation
    #[error("process {pid} has exited")]
    Exited { pid: u32 },

    /// A system call failed with a native error code
    #[error("system error ({code}): {message}")]
    Os { code: u32, message: String },

    /// The facility does not exist on this platform
    #[error("not supported: {0}")]
    NotSupported(String),

    /// The process table could not be read
    #[error("process enumeration failed: {0}")]
    Enumeration(String),
}

impl PlatformError {
    pub fn os(code: u32, message: impl Into<String>) -> Self {
        Self::Os { code, message: message.into() }
    }

    /// Native error code carried by this error, 0 when there is none.
    pub fn code(&self) -> u32 {
        match self {
            PlatformError::Os { code, .. } => *code,
            PlatformError::AccessDenied { .. } => 5,
            _ => 0,
        }
    }
}

/// Result type alias for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

// ============================================================================
// Process Types
// ============================================================================

/// A running process captured at one point in time.
///
/// Snapshots are taken fresh on every pass and are never shared between
/// passes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    /// Owning user, `None` when the caller may not read it
    pub user: Option<String>,
    pub session_id: Option<u32>,
    pub working_set_bytes: u64,
    /// Whether this process owns the current foreground window
    pub owns_foreground: bool,
    pub start_time: Option<DateTime<Local>>,
}

impl ProcessSnapshot {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            user: None,
            session_id: None,
            working_set_bytes: 0,
            owns_foreground: false,
            start_time: None,
        }
    }

    pub fn working_set_mb(&self) -> f64 {
        crate::core::units::bytes_to_mb(self.working_set_bytes)
    }
}

/// Optional pre-filter applied by the enumerator itself.
#[derive(Debug, Clone, Default)]
pub struct ProcessFilter {
    /// Only these pids, when non-empty
    pub pids: Vec<u32>,
    /// Only these exact names (case-insensitive), when non-empty
    pub names: Vec<String>,
}

impl ProcessFilter {
    pub fn pids(pids: &[u32]) -> Self {
        Self { pids: pids.to_vec(), names: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty() && self.names.is_empty()
    }

    pub fn accepts(&self, pid: u32, name: &str) -> bool {
        if !self.pids.is_empty() && !self.pids.contains(&pid) {
            return false;
        }
        if !self.names.is_empty() {
            let name = name.to_lowercase();
            let stem = name.strip_suffix(".exe").unwrap_or(&name);
            return self.names.iter().any(|n| {
                let n = n.to_lowercase();
                n == name || n == stem
            });
        }
        true
    }
}

// ============================================================================
// Working-Set Types
// ============================================================================

/// Whether a working-set bound is enforced by the OS or merely suggested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hardness {
    Soft,
    Hard,
}

impl Hardness {
    pub fn from_flag(hard: bool) -> Self {
        if hard { Hardness::Hard } else { Hardness::Soft }
    }
}

/// Current working-set bounds of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkingSetBounds {
    pub min_bytes: u64,
    pub max_bytes: u64,
    pub min_hardness: Hardness,
    pub max_hardness: Hardness,
}

/// The native "set working set" call, fully resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsRequest {
    /// Remove as many pages as possible from the working set
    Empty,
    /// Set an explicit `[min, max]` pair. `None` hardness leaves the current
    /// hardness of that bound unchanged.
    Set {
        min_bytes: u64,
        max_bytes: u64,
        min_hardness: Option<Hardness>,
        max_hardness: Option<Hardness>,
    },
}

/// An open handle on a target process.
///
/// Implementations release the native handle on drop.
pub trait ProcessHandle {
    fn pid(&self) -> u32;

    /// Read the current bounds without modifying anything.
    fn bounds(&self) -> PlatformResult<WorkingSetBounds>;

    fn set_bounds(&self, request: &BoundsRequest) -> PlatformResult<()>;

    /// Current resident working-set size.
    fn working_set_bytes(&self) -> PlatformResult<u64>;
}

// ============================================================================
// Session Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Disconnected,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: u32,
    pub name: String,
    pub state: SessionState,
}

/// Ids of the sessions that are currently disconnected.
pub fn disconnected_sessions(sessions: &[SessionInfo]) -> HashSet<u32> {
    sessions
        .iter()
        .filter(|s| s.state == SessionState::Disconnected)
        .map(|s| s.id)
        .collect()
}

/// Scheduling priority class of the running tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriorityClass {
    Idle,
    BelowNormal,
    Normal,
    AboveNormal,
    High,
    /// A class this crate does not model, kept so it can be restored
    Other(u32),
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Reads the live process table.
pub trait ProcessEnumerator {
    fn list_processes(&self, filter: &ProcessFilter) -> PlatformResult<Vec<ProcessSnapshot>>;
}

/// Opens processes for working-set queries and changes.
pub trait WorkingSetControl {
    fn open(&self, pid: u32) -> PlatformResult<Box<dyn ProcessHandle>>;
}

/// Reports how long the interactive session has gone without input.
pub trait InputMonitor {
    fn idle_time(&self) -> PlatformResult<Duration>;
}

/// Resolves the process owning the foreground window.
pub trait ForegroundResolver {
    /// `None` when there is no foreground window.
    fn foreground_pid(&self) -> PlatformResult<Option<u32>>;
}

pub trait SessionEnumerator {
    fn current_session_id(&self) -> PlatformResult<u32>;

    fn list_sessions(&self) -> PlatformResult<Vec<SessionInfo>>;
}

/// Controls the scheduling priority of the tool's own process.
pub trait PriorityControl {
    fn priority(&self) -> PlatformResult<PriorityClass>;

    fn set_priority(&self, class: PriorityClass) -> PlatformResult<()>;
}

/// Everything a trimming pass needs from the host.
pub trait Platform:
    ProcessEnumerator
    + WorkingSetControl
    + InputMonitor
    + ForegroundResolver
    + SessionEnumerator
    + PriorityControl
{
    fn platform_name(&self) -> &'static str;

    /// Whether working sets can actually be changed on this host.
    fn is_supported(&self) -> bool;

    /// Available physical memory, used to show the system-wide effect.
    fn available_memory(&self) -> Option<u64> {
        Some(crate::monitor::memory_status().available_bytes)
    }
}
