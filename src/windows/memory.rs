//! Working-set quota calls on other processes

use std::mem::size_of;

use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Memory::{
    GetProcessWorkingSetSizeEx, SetProcessWorkingSetSizeEx, SETPROCESSWORKINGSETSIZEEX_FLAGS,
};
use windows::Win32::System::ProcessStatus::{GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS};
use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_SET_QUOTA};

use super::{os_error, process_error};
use crate::platform::{BoundsRequest, Hardness, PlatformResult, ProcessHandle, WorkingSetBounds};

// QUOTA_LIMITS_HARDWS_* bits
const MIN_ENABLE: u32 = 0x1;
const MIN_DISABLE: u32 = 0x2;
const MAX_ENABLE: u32 = 0x4;
const MAX_DISABLE: u32 = 0x8;

fn hardness_bits(hardness: Option<Hardness>, enable: u32, disable: u32) -> u32 {
    match hardness {
        Some(Hardness::Hard) => enable,
        Some(Hardness::Soft) => disable,
        None => 0,
    }
}

/// Flag word for SetProcessWorkingSetSizeEx. An unspecified hardness leaves
/// the current setting alone.
pub fn quota_flags(request: &BoundsRequest) -> u32 {
    match *request {
        BoundsRequest::Empty => 0,
        BoundsRequest::Set { min_hardness, max_hardness, .. } => {
            hardness_bits(min_hardness, MIN_ENABLE, MIN_DISABLE)
                | hardness_bits(max_hardness, MAX_ENABLE, MAX_DISABLE)
        }
    }
}

/// Decode the flag word returned by GetProcessWorkingSetSizeEx.
pub fn decode_flags(flags: u32) -> (Hardness, Hardness) {
    (
        Hardness::from_flag(flags & MIN_ENABLE != 0),
        Hardness::from_flag(flags & MAX_ENABLE != 0),
    )
}

/// Open process handle, closed on drop.
pub struct WinProcessHandle {
    pid: u32,
    handle: HANDLE,
}

impl WinProcessHandle {
    pub fn open(pid: u32) -> PlatformResult<Self> {
        let handle = unsafe { OpenProcess(PROCESS_SET_QUOTA | PROCESS_QUERY_INFORMATION, false, pid) }
            .map_err(|e| process_error(pid, e))?;
        Ok(Self { pid, handle })
    }
}

impl Drop for WinProcessHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}

impl ProcessHandle for WinProcessHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn bounds(&self) -> PlatformResult<WorkingSetBounds> {
        let mut min = 0usize;
        let mut max = 0usize;
        let mut flags = 0u32;
        unsafe { GetProcessWorkingSetSizeEx(self.handle, &mut min, &mut max, &mut flags) }
            .map_err(|e| process_error(self.pid, e))?;

        let (min_hardness, max_hardness) = decode_flags(flags);
        Ok(WorkingSetBounds {
            min_bytes: min as u64,
            max_bytes: max as u64,
            min_hardness,
            max_hardness,
        })
    }

    fn set_bounds(&self, request: &BoundsRequest) -> PlatformResult<()> {
        let (min, max) = match *request {
            BoundsRequest::Empty => (usize::MAX, usize::MAX),
            BoundsRequest::Set { min_bytes, max_bytes, .. } => (min_bytes as usize, max_bytes as usize),
        };
        let flags = SETPROCESSWORKINGSETSIZEEX_FLAGS(quota_flags(request));

        // Raw codes here: 87 means a bad size pair, not a vanished process
        unsafe { SetProcessWorkingSetSizeEx(self.handle, min, max, flags) }.map_err(os_error)
    }

    fn working_set_bytes(&self) -> PlatformResult<u64> {
        let mut counters = PROCESS_MEMORY_COUNTERS {
            cb: size_of::<PROCESS_MEMORY_COUNTERS>() as u32,
            ..Default::default()
        };
        unsafe { GetProcessMemoryInfo(self.handle, &mut counters, size_of::<PROCESS_MEMORY_COUNTERS>() as u32) }
            .map_err(|e| process_error(self.pid, e))?;
        Ok(counters.WorkingSetSize as u64)
    }
}
