//! Host monitoring: memory status and the status screen

pub mod dashboard;
pub mod memory;

pub use dashboard::{render_status, HostStatus};
pub use memory::{memory_status, MemoryStatus};
