//! Privilege detection

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeLevel {
    /// Standard user - only own processes can be trimmed, owners unreadable
    Standard,
    /// Elevated admin - every process the token can open
    Admin,
}

pub struct PrivilegeManager {
    level: PrivilegeLevel,
}

impl PrivilegeManager {
    pub fn new() -> Self {
        let level = if is_elevated() { PrivilegeLevel::Admin } else { PrivilegeLevel::Standard };
        info!("Running with privilege level: {:?}", level);
        Self { level }
    }

    pub fn level(&self) -> PrivilegeLevel {
        self.level
    }

    /// Owners of other users' processes can only be read when elevated.
    pub fn can_read_owners(&self) -> bool {
        self.level == PrivilegeLevel::Admin
    }

    pub fn can_trim_other_sessions(&self) -> bool {
        self.level == PrivilegeLevel::Admin
    }

    /// Warn once about filters that a standard user cannot fully honour.
    pub fn warn_limitations(&self, user_filter: bool, cross_session: bool) {
        if user_filter && !self.can_read_owners() {
            warn!("Not elevated: process owners may be unreadable, user filters will not apply to those processes");
        }
        if cross_session && !self.can_trim_other_sessions() {
            warn!("Not elevated: processes in other sessions will likely be skipped (access denied)");
        }
    }
}

impl Default for PrivilegeManager {
    fn default() -> Self { Self::new() }
}

#[cfg(windows)]
pub fn is_elevated() -> bool {
    use std::mem::size_of;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::Security::{GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY};
    use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    unsafe {
        let mut token = HANDLE::default();
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token).is_err() {
            return false;
        }

        let mut elevation = TOKEN_ELEVATION::default();
        let mut size = 0u32;
        let result = GetTokenInformation(
            token,
            TokenElevation,
            Some(&mut elevation as *mut _ as *mut _),
            size_of::<TOKEN_ELEVATION>() as u32,
            &mut size,
        );
        let _ = CloseHandle(token);
        result.is_ok() && elevation.TokenIsElevated != 0
    }
}

#[cfg(not(windows))]
pub fn is_elevated() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_follow_level() {
        let standard = PrivilegeManager { level: PrivilegeLevel::Standard };
        assert!(!standard.can_read_owners());
        assert!(!standard.can_trim_other_sessions());

        let admin = PrivilegeManager { level: PrivilegeLevel::Admin };
        assert!(admin.can_read_owners());
        assert!(admin.can_trim_other_sessions());
    }
}
