//! Win32 bindings for working-set quotas, sessions, input and priority

pub mod input;
pub mod memory;
pub mod priority;
pub mod session;

use crate::platform::PlatformError;

pub(crate) const ERROR_ACCESS_DENIED: u32 = 5;
pub(crate) const ERROR_INVALID_PARAMETER: u32 = 87;

/// Low word of the HRESULT, i.e. the Win32 error code.
pub(crate) fn win32_code(err: &windows::core::Error) -> u32 {
    (err.code().0 & 0xFFFF) as u32
}

/// Map a failed call on process `pid` to a platform error. OpenProcess
/// reports ERROR_INVALID_PARAMETER for a pid that no longer exists.
pub(crate) fn process_error(pid: u32, err: windows::core::Error) -> PlatformError {
    match win32_code(&err) {
        ERROR_ACCESS_DENIED => PlatformError::AccessDenied { pid },
        ERROR_INVALID_PARAMETER => PlatformError::Exited { pid },
        code => PlatformError::os(code, err.message().to_string()),
    }
}

pub(crate) fn os_error(err: windows::core::Error) -> PlatformError {
    PlatformError::os(win32_code(&err), err.message().to_string())
}
