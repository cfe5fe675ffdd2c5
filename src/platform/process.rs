//! Process table enumeration backed by sysinfo

use chrono::{DateTime, Local, TimeZone};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users};
use tracing::debug;

use super::traits::{PlatformError, PlatformResult, ProcessFilter, ProcessSnapshot};

/// Snapshot the live process table. A fresh `System` is used per call so no
/// state leaks between passes.
pub fn list_processes(filter: &ProcessFilter) -> PlatformResult<Vec<ProcessSnapshot>> {
    let mut sys = System::new();
    let refresh = ProcessRefreshKind::new()
        .with_memory()
        .with_user(UpdateKind::OnlyIfNotSet);

    if filter.pids.is_empty() {
        sys.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh);
    } else {
        let pids: Vec<Pid> = filter.pids.iter().map(|pid| Pid::from_u32(*pid)).collect();
        sys.refresh_processes_specifics(ProcessesToUpdate::Some(&pids), true, refresh);
    }

    if sys.processes().is_empty() && filter.pids.is_empty() {
        return Err(PlatformError::Enumeration("process table is empty".into()));
    }

    let users = Users::new_with_refreshed_list();
    let mut snapshots: Vec<ProcessSnapshot> = sys
        .processes()
        .iter()
        .filter_map(|(pid, process)| {
            let pid = pid.as_u32();
            let name = process.name().to_string_lossy().to_string();
            if !filter.accepts(pid, &name) {
                return None;
            }

            let user = process
                .user_id()
                .and_then(|uid| users.get_user_by_id(uid))
                .map(|u| u.name().to_string());

            Some(ProcessSnapshot {
                user,
                session_id: session_of(pid, process),
                working_set_bytes: process.memory(),
                start_time: start_time(process.start_time()),
                ..ProcessSnapshot::new(pid, name)
            })
        })
        .collect();

    snapshots.sort_by_key(|s| s.pid);
    debug!("sysinfo returned {} processes", snapshots.len());
    Ok(snapshots)
}

fn start_time(secs: u64) -> Option<DateTime<Local>> {
    if secs == 0 {
        return None;
    }
    Local.timestamp_opt(secs as i64, 0).single()
}

#[cfg(windows)]
fn session_of(pid: u32, _process: &sysinfo::Process) -> Option<u32> {
    crate::windows::session::session_of(pid).ok()
}

#[cfg(not(windows))]
fn session_of(_pid: u32, process: &sysinfo::Process) -> Option<u32> {
    process.session_id().map(|sid| sid.as_u32())
}
