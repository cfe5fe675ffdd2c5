//! Trimming core: policy, predicate chain, executor and pass/loop control

pub mod config;
pub mod error;
pub mod executor;
pub mod filter;
pub mod gate;
pub mod pass;
pub mod policy;
pub mod priority;
pub mod scheduler;
pub mod summary;
pub mod units;

pub use config::{Mode, TrimConfig};
pub use error::TrimError;
pub use pass::{preflight, PassError, TrimPass};
pub use policy::{NamePattern, PolicyError, TrimPolicy};
pub use scheduler::{RunReport, Schedule, Scheduler, StopReason};
pub use summary::{TrimOutcome, TrimResult, TrimSummary};
