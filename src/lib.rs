//! wstrim: working-set trimmer
//!
//! Trims or caps the physical memory (working set) of running processes.
//!
//! ## Features
//!
//! - **Predicate chain**: name, owner, session, foreground, size and age filters
//! - **Bounds**: empty the working set, or set soft/hard minimum and maximum
//! - **Idle gate**: only act after the user has been idle long enough
//! - **Looping**: repeat passes on an interval until the targets exit
//! - **Reporting**: per-pass summaries as tables or JSON lines
//!
//! ## Safety
//!
//! - Policies are validated before any process is touched
//! - Per-process failures never abort a pass
//! - Report mode reads bounds without changing anything

pub mod core;
pub mod monitor;
pub mod platform;
pub mod report;
pub mod security;

#[cfg(windows)]
pub mod windows;

// Re-exports
pub use crate::core::config::{Mode, TrimConfig};
pub use crate::core::error::TrimError;
pub use crate::core::pass::TrimPass;
pub use crate::core::policy::TrimPolicy;
pub use crate::core::scheduler::{Schedule, Scheduler};
pub use crate::core::summary::TrimSummary;
pub use crate::platform::{create_platform, HostPlatform, Platform, PlatformError, PlatformResult};
pub use crate::report::{open_sink, OutputFormat, ReportSink};
pub use crate::security::privileges::PrivilegeManager;
