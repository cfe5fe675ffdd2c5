//! Terminal Services session queries

use windows::Win32::System::RemoteDesktop::{
    ProcessIdToSessionId, WTSActive, WTSDisconnected, WTSEnumerateSessionsW, WTSFreeMemory,
    WTS_CURRENT_SERVER_HANDLE, WTS_SESSION_INFOW,
};

use super::{os_error, process_error};
use crate::platform::{PlatformResult, SessionInfo, SessionState};

pub fn session_of(pid: u32) -> PlatformResult<u32> {
    let mut session = 0u32;
    unsafe { ProcessIdToSessionId(pid, &mut session) }.map_err(|e| process_error(pid, e))?;
    Ok(session)
}

pub fn current_session() -> PlatformResult<u32> {
    session_of(std::process::id())
}

pub fn list_sessions() -> PlatformResult<Vec<SessionInfo>> {
    let mut info: *mut WTS_SESSION_INFOW = std::ptr::null_mut();
    let mut count = 0u32;

    unsafe {
        WTSEnumerateSessionsW(WTS_CURRENT_SERVER_HANDLE, 0, 1, &mut info, &mut count).map_err(os_error)?;

        let sessions = std::slice::from_raw_parts(info, count as usize)
            .iter()
            .map(|s| SessionInfo {
                id: s.SessionId,
                name: s.pWinStationName.to_string().unwrap_or_default(),
                state: if s.State == WTSActive {
                    SessionState::Active
                } else if s.State == WTSDisconnected {
                    SessionState::Disconnected
                } else {
                    SessionState::Other
                },
            })
            .collect();

        WTSFreeMemory(info as *mut _);
        Ok(sessions)
    }
}
