//! Windows platform implementation
//!
//! Implements the platform traits by wrapping the Win32 modules in
//! `src/windows/`.

#![cfg(target_os = "windows")]

use std::time::Duration;

use super::process;
use super::traits::*;
use crate::windows::memory::WinProcessHandle;
use crate::windows::{input, priority, session};

/// Windows platform implementation
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessEnumerator for WindowsPlatform {
    fn list_processes(&self, filter: &ProcessFilter) -> PlatformResult<Vec<ProcessSnapshot>> {
        process::list_processes(filter)
    }
}

impl WorkingSetControl for WindowsPlatform {
    fn open(&self, pid: u32) -> PlatformResult<Box<dyn ProcessHandle>> {
        Ok(Box::new(WinProcessHandle::open(pid)?))
    }
}

impl InputMonitor for WindowsPlatform {
    fn idle_time(&self) -> PlatformResult<Duration> {
        input::idle_time()
    }
}

impl ForegroundResolver for WindowsPlatform {
    fn foreground_pid(&self) -> PlatformResult<Option<u32>> {
        input::foreground_pid()
    }
}

impl SessionEnumerator for WindowsPlatform {
    fn current_session_id(&self) -> PlatformResult<u32> {
        session::current_session()
    }

    fn list_sessions(&self) -> PlatformResult<Vec<SessionInfo>> {
        session::list_sessions()
    }
}

impl PriorityControl for WindowsPlatform {
    fn priority(&self) -> PlatformResult<PriorityClass> {
        priority::current()
    }

    fn set_priority(&self, class: PriorityClass) -> PlatformResult<()> {
        priority::set(class)
    }
}

impl Platform for WindowsPlatform {
    fn platform_name(&self) -> &'static str {
        "windows"
    }

    fn is_supported(&self) -> bool {
        true
    }
}
