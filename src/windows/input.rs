//! User input idle time and the foreground window owner

use std::mem::size_of;
use std::time::Duration;

use windows::Win32::System::SystemInformation::GetTickCount;
use windows::Win32::UI::Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO};
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId};

use crate::platform::{PlatformError, PlatformResult};

/// Milliseconds between two tick counts. GetTickCount wraps every ~49.7 days.
pub fn tick_delta(now: u32, last: u32) -> u32 {
    now.wrapping_sub(last)
}

pub fn idle_time() -> PlatformResult<Duration> {
    let mut info = LASTINPUTINFO {
        cbSize: size_of::<LASTINPUTINFO>() as u32,
        dwTime: 0,
    };
    let ok = unsafe { GetLastInputInfo(&mut info) };
    if !ok.as_bool() {
        return Err(PlatformError::os(0, "GetLastInputInfo failed"));
    }
    let now = unsafe { GetTickCount() };
    Ok(Duration::from_millis(tick_delta(now, info.dwTime) as u64))
}

pub fn foreground_pid() -> PlatformResult<Option<u32>> {
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.is_invalid() {
        return Ok(None);
    }
    let mut pid = 0u32;
    unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
    if pid == 0 {
        return Err(PlatformError::os(0, "foreground window has no owning process"));
    }
    Ok(Some(pid))
}
