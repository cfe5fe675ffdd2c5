//! System memory status

use sysinfo::System;

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStatus {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub memory_load_percent: u32,
    pub total_swap_bytes: u64,
    pub free_swap_bytes: u64,
}

impl MemoryStatus {
    pub fn from_parts(total: u64, available: u64, total_swap: u64, free_swap: u64) -> Self {
        let load = if total > 0 {
            ((total.saturating_sub(available) as f64 / total as f64) * 100.0) as u32
        } else {
            0
        };
        Self {
            total_bytes: total,
            available_bytes: available,
            memory_load_percent: load,
            total_swap_bytes: total_swap,
            free_swap_bytes: free_swap,
        }
    }

    pub fn used_bytes(&self) -> u64 { self.total_bytes.saturating_sub(self.available_bytes) }
    pub fn is_high_pressure(&self) -> bool { self.memory_load_percent > 80 }
    pub fn is_critical(&self) -> bool { self.memory_load_percent > 95 }
}

pub fn memory_status() -> MemoryStatus {
    let mut sys = System::new();
    sys.refresh_memory();
    MemoryStatus::from_parts(
        sys.total_memory(),
        sys.available_memory(),
        sys.total_swap(),
        sys.free_swap(),
    )
}
