//! Priority class of the running process

use windows::Win32::System::Threading::{
    GetCurrentProcess, GetPriorityClass, SetPriorityClass, ABOVE_NORMAL_PRIORITY_CLASS,
    BELOW_NORMAL_PRIORITY_CLASS, HIGH_PRIORITY_CLASS, IDLE_PRIORITY_CLASS, NORMAL_PRIORITY_CLASS,
    PROCESS_CREATION_FLAGS,
};

use super::os_error;
use crate::platform::{PlatformError, PlatformResult, PriorityClass};

pub fn from_raw(raw: u32) -> PriorityClass {
    match PROCESS_CREATION_FLAGS(raw) {
        IDLE_PRIORITY_CLASS => PriorityClass::Idle,
        BELOW_NORMAL_PRIORITY_CLASS => PriorityClass::BelowNormal,
        NORMAL_PRIORITY_CLASS => PriorityClass::Normal,
        ABOVE_NORMAL_PRIORITY_CLASS => PriorityClass::AboveNormal,
        HIGH_PRIORITY_CLASS => PriorityClass::High,
        _ => PriorityClass::Other(raw),
    }
}

pub fn to_raw(class: PriorityClass) -> PROCESS_CREATION_FLAGS {
    match class {
        PriorityClass::Idle => IDLE_PRIORITY_CLASS,
        PriorityClass::BelowNormal => BELOW_NORMAL_PRIORITY_CLASS,
        PriorityClass::Normal => NORMAL_PRIORITY_CLASS,
        PriorityClass::AboveNormal => ABOVE_NORMAL_PRIORITY_CLASS,
        PriorityClass::High => HIGH_PRIORITY_CLASS,
        PriorityClass::Other(raw) => PROCESS_CREATION_FLAGS(raw),
    }
}

pub fn current() -> PlatformResult<PriorityClass> {
    let raw = unsafe { GetPriorityClass(GetCurrentProcess()) };
    if raw == 0 {
        return Err(PlatformError::os(0, "GetPriorityClass failed"));
    }
    Ok(from_raw(raw))
}

pub fn set(class: PriorityClass) -> PlatformResult<()> {
    unsafe { SetPriorityClass(GetCurrentProcess(), to_raw(class)) }.map_err(os_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_classes() {
        for class in [PriorityClass::Idle, PriorityClass::Normal, PriorityClass::AboveNormal] {
            assert_eq!(from_raw(to_raw(class).0), class);
        }
        assert_eq!(from_raw(0x1234), PriorityClass::Other(0x1234));
    }
}
