//! Trim policy: the validated, immutable form of a `TrimConfig`

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use regex::{Regex, RegexBuilder};
use thiserror::Error;

use super::config::{Mode, TrimConfig};
use crate::platform::{Hardness, ProcessFilter};

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("minimum working set ({min} bytes) is larger than maximum ({max} bytes)")]
    ContradictoryBounds { min: u64, max: u64 },

    #[error("maximum working set must be at least 1 byte")]
    ZeroMaximum,

    #[error("conflicting options: {0}")]
    Conflict(String),

    #[error("{0} is not available on this host")]
    Unsupported(String),
}

const REGEX_META: &[char] = &['.', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '^', '$', '\\'];

/// A name or user pattern.
///
/// Plain text is compared exactly, ignoring case. Anything containing regex
/// metacharacters is a case-insensitive regex that must match the whole value.
#[derive(Clone)]
pub enum NamePattern {
    Exact(String),
    Regex(Regex),
}

impl NamePattern {
    pub fn parse(pattern: &str) -> Result<Self, PolicyError> {
        if pattern.contains(REGEX_META) {
            let regex = RegexBuilder::new(&format!("^(?:{})$", pattern))
                .case_insensitive(true)
                .build()
                .map_err(|source| PolicyError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
            Ok(NamePattern::Regex(regex))
        } else {
            Ok(NamePattern::Exact(pattern.to_lowercase()))
        }
    }

    pub fn is_match(&self, value: &str) -> bool {
        match self {
            NamePattern::Exact(text) => value.to_lowercase() == *text,
            NamePattern::Regex(regex) => regex.is_match(value),
        }
    }

    /// Process names match with or without their `.exe` suffix.
    pub fn matches_process(&self, name: &str) -> bool {
        if self.is_match(name) {
            return true;
        }
        let lower = name.to_lowercase();
        match lower.strip_suffix(".exe") {
            Some(stem) => self.is_match(stem),
            None => false,
        }
    }

    fn exact(&self) -> Option<&str> {
        match self {
            NamePattern::Exact(text) => Some(text),
            NamePattern::Regex(_) => None,
        }
    }
}

impl fmt::Debug for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePattern::Exact(text) => write!(f, "Exact({:?})", text),
            NamePattern::Regex(regex) => write!(f, "Regex({:?})", regex.as_str()),
        }
    }
}

fn compile(patterns: &[String]) -> Result<Vec<NamePattern>, PolicyError> {
    patterns.iter().map(|p| NamePattern::parse(p)).collect()
}

/// Which sessions a pass may touch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionScope {
    pub this_session_only: bool,
    pub allow: HashSet<u32>,
    pub deny: HashSet<u32>,
    pub disconnected_only: bool,
}

impl SessionScope {
    pub fn is_unrestricted(&self) -> bool {
        !self.this_session_only
            && self.allow.is_empty()
            && self.deny.is_empty()
            && !self.disconnected_only
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound {
    pub bytes: u64,
    pub hardness: Hardness,
}

/// Working-set bounds to apply. Both `None` means "empty the working set".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkingSetLimits {
    pub min: Option<Bound>,
    pub max: Option<Bound>,
}

impl WorkingSetLimits {
    pub fn new(min: Option<Bound>, max: Option<Bound>) -> Result<Self, PolicyError> {
        if let Some(max) = max {
            if max.bytes == 0 {
                return Err(PolicyError::ZeroMaximum);
            }
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min.bytes > max.bytes {
                return Err(PolicyError::ContradictoryBounds { min: min.bytes, max: max.bytes });
            }
        }
        Ok(Self { min, max })
    }

    pub fn is_empty_request(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Everything one pass needs to decide what to do. Immutable once built.
#[derive(Debug, Clone)]
pub struct TrimPolicy {
    pub include: Vec<NamePattern>,
    pub exclude: Vec<NamePattern>,
    pub include_users: Vec<NamePattern>,
    pub exclude_users: Vec<NamePattern>,
    pub pids: Vec<u32>,
    pub sessions: SessionScope,
    pub exclude_foreground: bool,
    /// Foreground exclusion was asked for directly, not implied by `background`
    pub foreground_required: bool,
    pub background: bool,
    pub above_bytes: u64,
    pub limits: WorkingSetLimits,
    pub idle_threshold: Duration,
    pub new_only: bool,
    pub monitoring_start: DateTime<Local>,
    pub mode: Mode,
    pub savings: bool,
    pub boost_priority: bool,
}

impl TrimPolicy {
    /// Validate a config. Nothing is touched when this fails.
    pub fn from_config(config: &TrimConfig) -> Result<Self, PolicyError> {
        Self::from_config_at(config, Local::now())
    }

    pub fn from_config_at(
        config: &TrimConfig,
        monitoring_start: DateTime<Local>,
    ) -> Result<Self, PolicyError> {
        let min = config.min_working_set.map(|bytes| Bound {
            bytes,
            hardness: Hardness::from_flag(config.hard_min),
        });
        let max = config.max_working_set.map(|bytes| Bound {
            bytes,
            hardness: Hardness::from_flag(config.hard_max),
        });
        if config.hard_min && min.is_none() {
            return Err(PolicyError::Conflict("--hard-min needs a minimum working set".into()));
        }
        if config.hard_max && max.is_none() {
            return Err(PolicyError::Conflict("--hard-max needs a maximum working set".into()));
        }
        let limits = WorkingSetLimits::new(min, max)?;

        if config.mode == Mode::Report {
            if config.repeat {
                return Err(PolicyError::Conflict("report mode cannot loop".into()));
            }
            if !limits.is_empty_request() {
                return Err(PolicyError::Conflict(
                    "report mode does not set working-set limits".into(),
                ));
            }
            if config.savings {
                return Err(PolicyError::Conflict("report mode has no savings to measure".into()));
            }
        }
        if config.repeat && config.interval_secs == 0 {
            return Err(PolicyError::Conflict("loop interval must be at least 1 second".into()));
        }

        let allow: HashSet<u32> = config.sessions.iter().copied().collect();
        let deny: HashSet<u32> = config.not_sessions.iter().copied().collect();
        if let Some(id) = allow.intersection(&deny).next() {
            return Err(PolicyError::Conflict(format!(
                "session {} is both allowed and denied",
                id
            )));
        }

        Ok(Self {
            include: compile(&config.include)?,
            exclude: compile(&config.exclude)?,
            include_users: compile(&config.include_users)?,
            exclude_users: compile(&config.exclude_users)?,
            pids: config.pids.clone(),
            sessions: SessionScope {
                this_session_only: config.this_session,
                allow,
                deny,
                disconnected_only: config.disconnected_only,
            },
            exclude_foreground: config.exclude_foreground || config.background,
            foreground_required: config.exclude_foreground,
            background: config.background,
            above_bytes: config.above_bytes,
            limits,
            idle_threshold: Duration::from_secs(config.idle_secs),
            new_only: config.new_only,
            monitoring_start,
            mode: config.mode,
            savings: config.savings,
            boost_priority: config.boost_priority,
        })
    }

    pub fn has_user_filter(&self) -> bool {
        !self.include_users.is_empty() || !self.exclude_users.is_empty()
    }

    /// Pre-filter handed to the enumerator. Only exact include names can be
    /// pushed down; regex includes are left to the predicate chain.
    pub fn process_filter(&self) -> ProcessFilter {
        let names = if self.include.iter().all(|p| p.exact().is_some()) {
            self.include.iter().filter_map(|p| p.exact().map(str::to_string)).collect()
        } else {
            Vec::new()
        };
        ProcessFilter { pids: self.pids.clone(), names }
    }
}
