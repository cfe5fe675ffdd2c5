//! Text rendering for the `status` command

use std::fmt::Write as _;
use std::time::Duration;

use super::memory::MemoryStatus;
use crate::core::units::format_bytes;
use crate::platform::SessionInfo;
use crate::security::privileges::PrivilegeLevel;

/// Everything the status screen shows. Unreadable facts are `Err` strings.
#[derive(Debug, Clone)]
pub struct HostStatus {
    pub platform: &'static str,
    pub privilege: PrivilegeLevel,
    pub memory: MemoryStatus,
    pub idle: Result<Duration, String>,
    pub foreground_pid: Result<Option<u32>, String>,
    pub session_id: Result<u32, String>,
    pub sessions: Result<Vec<SessionInfo>, String>,
}

fn or_error<T>(value: &Result<T, String>, render: impl Fn(&T) -> String) -> String {
    match value {
        Ok(v) => render(v),
        Err(e) => format!("unavailable ({})", e),
    }
}

pub fn render_status(status: &HostStatus) -> String {
    let bar_width = 40;
    let filled = (status.memory.memory_load_percent as usize * bar_width / 100).min(bar_width);
    let bar = format!("[{}{}]", "#".repeat(filled), "-".repeat(bar_width - filled));

    let mut out = String::new();
    let _ = writeln!(out, "================ wstrim status ================");
    let _ = writeln!(out, "Platform:    {} ({:?})", status.platform, status.privilege);
    let _ = writeln!(out, "Memory:      {} {}%", bar, status.memory.memory_load_percent);
    let _ = writeln!(out, "Total:       {}", format_bytes(status.memory.total_bytes));
    let _ = writeln!(out, "Available:   {}", format_bytes(status.memory.available_bytes));
    let _ = writeln!(out, "Used:        {}", format_bytes(status.memory.used_bytes()));
    let _ = writeln!(
        out,
        "Pressure:    {}",
        if status.memory.is_critical() {
            "CRITICAL"
        } else if status.memory.is_high_pressure() {
            "HIGH"
        } else {
            "Normal"
        }
    );
    let _ = writeln!(out, "Idle:        {}", or_error(&status.idle, |d| format!("{} s", d.as_secs())));
    let _ = writeln!(
        out,
        "Foreground:  {}",
        or_error(&status.foreground_pid, |pid| match pid {
            Some(pid) => format!("pid {}", pid),
            None => "none".to_string(),
        })
    );
    let _ = writeln!(out, "Session:     {}", or_error(&status.session_id, |id| id.to_string()));

    if let Ok(sessions) = &status.sessions {
        let _ = writeln!(out, "Sessions:");
        for session in sessions {
            let _ = writeln!(out, "  {:>4}  {:<20} {:?}", session.id, session.name, session.state);
        }
    } else {
        let _ = writeln!(out, "Sessions:    {}", or_error(&status.sessions, |_| String::new()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::SessionState;

    #[test]
    fn test_render_status() {
        let status = HostStatus {
            platform: "mock",
            privilege: PrivilegeLevel::Standard,
            memory: MemoryStatus::from_parts(8 * 1024 * 1024 * 1024, 2 * 1024 * 1024 * 1024, 0, 0),
            idle: Ok(Duration::from_secs(42)),
            foreground_pid: Ok(Some(1234)),
            session_id: Err("not supported".into()),
            sessions: Ok(vec![SessionInfo { id: 2, name: "RDP-Tcp#3".into(), state: SessionState::Disconnected }]),
        };

        let text = render_status(&status);
        assert!(text.contains("Idle:        42 s"));
        assert!(text.contains("Foreground:  pid 1234"));
        assert!(text.contains("Session:     unavailable (not supported)"));
        assert!(text.contains("RDP-Tcp#3"));
        assert!(text.contains("75%"));
    }
}
