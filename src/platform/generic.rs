//! Fallback platform for hosts without working-set quotas
//!
//! Processes can be listed and filtered, so `--report` style dry runs and the
//! status screen work, but nothing is ever modified.

#![cfg(not(windows))]

use std::time::Duration;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use super::process;
use super::traits::*;

pub struct GenericPlatform;

impl GenericPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenericPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn unsupported<T>(what: &str) -> PlatformResult<T> {
    Err(PlatformError::NotSupported(format!("{} on {}", what, std::env::consts::OS)))
}

impl ProcessEnumerator for GenericPlatform {
    fn list_processes(&self, filter: &ProcessFilter) -> PlatformResult<Vec<ProcessSnapshot>> {
        process::list_processes(filter)
    }
}

impl WorkingSetControl for GenericPlatform {
    fn open(&self, _pid: u32) -> PlatformResult<Box<dyn ProcessHandle>> {
        unsupported("working-set quotas")
    }
}

impl InputMonitor for GenericPlatform {
    fn idle_time(&self) -> PlatformResult<Duration> {
        unsupported("input idle time")
    }
}

impl ForegroundResolver for GenericPlatform {
    fn foreground_pid(&self) -> PlatformResult<Option<u32>> {
        unsupported("foreground window lookup")
    }
}

impl SessionEnumerator for GenericPlatform {
    /// Unix session of the running tool.
    fn current_session_id(&self) -> PlatformResult<u32> {
        let me = Pid::from_u32(std::process::id());
        let mut sys = System::new();
        sys.refresh_processes_specifics(ProcessesToUpdate::Some(&[me]), true, ProcessRefreshKind::new());
        sys.process(me)
            .and_then(|p| p.session_id())
            .map(|sid| sid.as_u32())
            .ok_or_else(|| PlatformError::os(0, "session id of own process unavailable"))
    }

    fn list_sessions(&self) -> PlatformResult<Vec<SessionInfo>> {
        unsupported("session enumeration")
    }
}

impl PriorityControl for GenericPlatform {
    fn priority(&self) -> PlatformResult<PriorityClass> {
        unsupported("priority classes")
    }

    fn set_priority(&self, _class: PriorityClass) -> PlatformResult<()> {
        unsupported("priority classes")
    }
}

impl Platform for GenericPlatform {
    fn platform_name(&self) -> &'static str {
        std::env::consts::OS
    }

    fn is_supported(&self) -> bool {
        false
    }
}
