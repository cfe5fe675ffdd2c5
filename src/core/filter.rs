//! Predicate chain deciding which processes a pass may touch
//!
//! `evaluate` is a pure function: the same snapshot, policy and context always
//! give the same verdict. Predicates run in a fixed order and the first one
//! that fails names the skip reason.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::policy::{NamePattern, TrimPolicy};
use crate::platform::ProcessSnapshot;

/// Why a process was not trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NameNotIncluded,
    NameExcluded,
    UserNotIncluded,
    UserExcluded,
    SessionNotCurrent,
    SessionNotAllowed,
    SessionDenied,
    SessionNotDisconnected,
    Foreground,
    BelowThreshold,
    NotNew,
    /// The process could not be opened
    AccessDenied,
    /// The process exited before it could be handled
    Exited,
    /// Bounds could not be read in report mode
    Unreadable,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NameNotIncluded => "name not included",
            SkipReason::NameExcluded => "name excluded",
            SkipReason::UserNotIncluded => "user not included",
            SkipReason::UserExcluded => "user excluded",
            SkipReason::SessionNotCurrent => "not in this session",
            SkipReason::SessionNotAllowed => "session not allowed",
            SkipReason::SessionDenied => "session denied",
            SkipReason::SessionNotDisconnected => "session not disconnected",
            SkipReason::Foreground => "foreground process",
            SkipReason::BelowThreshold => "below threshold",
            SkipReason::NotNew => "started before monitoring",
            SkipReason::AccessDenied => "access denied",
            SkipReason::Exited => "exited",
            SkipReason::Unreadable => "bounds unreadable",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Eligible,
    Skipped(SkipReason),
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Eligible)
    }
}

/// Facts about the environment gathered once per pass.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    /// Session id of the tool itself
    pub caller_session: Option<u32>,
    /// Sessions currently disconnected
    pub disconnected: HashSet<u32>,
    /// Pid owning the foreground window
    pub foreground_pid: Option<u32>,
    /// The user is idle, so the foreground process need not be protected
    pub idle_override: bool,
}

fn any_match(patterns: &[NamePattern], value: &str, process: bool) -> bool {
    patterns.iter().any(|p| {
        if process {
            p.matches_process(value)
        } else {
            p.is_match(value)
        }
    })
}

fn check(ok: bool, reason: SkipReason) -> Result<(), SkipReason> {
    if ok { Ok(()) } else { Err(reason) }
}

fn names(snapshot: &ProcessSnapshot, policy: &TrimPolicy) -> Result<(), SkipReason> {
    if !policy.include.is_empty() {
        check(any_match(&policy.include, &snapshot.name, true), SkipReason::NameNotIncluded)?;
    }
    check(!any_match(&policy.exclude, &snapshot.name, true), SkipReason::NameExcluded)
}

fn users(snapshot: &ProcessSnapshot, policy: &TrimPolicy) -> Result<(), SkipReason> {
    // Unknown owner: vacuously true, the caller warns about it
    let Some(user) = snapshot.user.as_deref() else {
        return Ok(());
    };
    if !policy.include_users.is_empty() {
        check(any_match(&policy.include_users, user, false), SkipReason::UserNotIncluded)?;
    }
    check(!any_match(&policy.exclude_users, user, false), SkipReason::UserExcluded)
}

fn sessions(
    snapshot: &ProcessSnapshot,
    policy: &TrimPolicy,
    ctx: &FilterContext,
) -> Result<(), SkipReason> {
    let scope = &policy.sessions;
    if scope.is_unrestricted() {
        return Ok(());
    }
    let session = snapshot.session_id;

    if scope.this_session_only {
        check(
            session.is_some() && session == ctx.caller_session,
            SkipReason::SessionNotCurrent,
        )?;
    }
    if !scope.allow.is_empty() {
        check(
            session.is_some_and(|id| scope.allow.contains(&id)),
            SkipReason::SessionNotAllowed,
        )?;
    }
    if !scope.deny.is_empty() {
        check(
            !session.is_some_and(|id| scope.deny.contains(&id)),
            SkipReason::SessionDenied,
        )?;
    }
    if scope.disconnected_only {
        check(
            session.is_some_and(|id| ctx.disconnected.contains(&id)),
            SkipReason::SessionNotDisconnected,
        )?;
    }
    Ok(())
}

fn foreground(
    snapshot: &ProcessSnapshot,
    policy: &TrimPolicy,
    ctx: &FilterContext,
) -> Result<(), SkipReason> {
    if !policy.exclude_foreground || ctx.idle_override {
        return Ok(());
    }
    let owns = snapshot.owns_foreground || ctx.foreground_pid == Some(snapshot.pid);
    check(!owns, SkipReason::Foreground)
}

fn freshness(snapshot: &ProcessSnapshot, policy: &TrimPolicy) -> Result<(), SkipReason> {
    if !policy.new_only {
        return Ok(());
    }
    check(
        snapshot.start_time.is_some_and(|t| t >= policy.monitoring_start),
        SkipReason::NotNew,
    )
}

/// Run the whole predicate chain for one process.
pub fn evaluate(snapshot: &ProcessSnapshot, policy: &TrimPolicy, ctx: &FilterContext) -> Verdict {
    let outcome = names(snapshot, policy)
        .and_then(|_| users(snapshot, policy))
        .and_then(|_| sessions(snapshot, policy, ctx))
        .and_then(|_| foreground(snapshot, policy, ctx))
        .and_then(|_| check(snapshot.working_set_bytes > policy.above_bytes, SkipReason::BelowThreshold))
        .and_then(|_| freshness(snapshot, policy));

    match outcome {
        Ok(()) => Verdict::Eligible,
        Err(reason) => Verdict::Skipped(reason),
    }
}
