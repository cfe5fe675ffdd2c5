//! Privilege detection

pub mod privileges;

pub use privileges::{PrivilegeLevel, PrivilegeManager};
