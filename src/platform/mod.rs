//! Platform Abstraction Layer
//!
//! ```text
//! src/platform/
//! +-- mod.rs           <- This file (module definitions, host selection)
//! +-- traits.rs        <- Platform-agnostic trait definitions
//! +-- process.rs       <- sysinfo process table, shared by all hosts
//! +-- windows.rs       <- Win32 implementation (cfg(windows))
//! +-- generic.rs       <- Read-only fallback (cfg(not(windows)))
//! ```
//!
//! Import `HostPlatform` and it resolves to the implementation for the
//! target platform:
//!
//! ```ignore
//! use wstrim::platform::create_platform;
//!
//! let platform = create_platform();
//! let idle = platform.idle_time()?;
//! ```

pub mod process;
pub mod traits;

#[cfg(windows)]
pub mod windows;

#[cfg(not(windows))]
pub mod generic;

#[cfg(test)]
pub mod mock;

pub use traits::{
    disconnected_sessions, BoundsRequest, ForegroundResolver, Hardness, InputMonitor, Platform,
    PlatformError, PlatformResult, PriorityClass, PriorityControl, ProcessEnumerator,
    ProcessFilter, ProcessHandle, ProcessSnapshot, SessionEnumerator, SessionInfo, SessionState,
    WorkingSetBounds, WorkingSetControl,
};

/// Platform implementation for the current build target.
#[cfg(windows)]
pub type HostPlatform = windows::WindowsPlatform;

#[cfg(not(windows))]
pub type HostPlatform = generic::GenericPlatform;

pub fn create_platform() -> HostPlatform {
    HostPlatform::new()
}
