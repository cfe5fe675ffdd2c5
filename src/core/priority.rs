//! Scoped priority boost for the tool's own process

use tracing::{debug, warn};

use crate::platform::{PriorityClass, PriorityControl};

/// Priority the tool runs at while a pass is in progress.
pub const BOOSTED_PRIORITY: PriorityClass = PriorityClass::AboveNormal;

/// Raises the tool's priority and restores the previous class on drop.
pub struct PriorityBoost<'a> {
    control: &'a dyn PriorityControl,
    previous: Option<PriorityClass>,
}

impl<'a> PriorityBoost<'a> {
    /// Never fails: if the priority cannot be changed the pass simply runs
    /// at its normal priority.
    pub fn acquire(control: &'a dyn PriorityControl) -> Self {
        let previous = match control.priority() {
            Ok(previous) if previous == BOOSTED_PRIORITY => None,
            Ok(previous) => match control.set_priority(BOOSTED_PRIORITY) {
                Ok(()) => {
                    debug!("Raised own priority from {:?} to {:?}", previous, BOOSTED_PRIORITY);
                    Some(previous)
                }
                Err(err) => {
                    warn!("Cannot raise own priority: {}", err);
                    None
                }
            },
            Err(err) => {
                debug!("Cannot read own priority: {}", err);
                None
            }
        };
        Self { control, previous }
    }

    pub fn is_active(&self) -> bool {
        self.previous.is_some()
    }
}

impl Drop for PriorityBoost<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            match self.control.set_priority(previous) {
                Ok(()) => debug!("Restored own priority to {:?}", previous),
                Err(err) => warn!("Cannot restore own priority to {:?}: {}", previous, err),
            }
        }
    }
}
