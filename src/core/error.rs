//! Crate-level error type

use std::path::PathBuf;
use thiserror::Error;

use super::pass::PassError;
use super::policy::PolicyError;
use crate::platform::PlatformError;

#[derive(Debug, Error)]
pub enum TrimError {
    #[error("invalid configuration: {0}")]
    Policy(#[from] PolicyError),

    #[error("failed to read {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("pass aborted: {0}")]
    Pass(#[from] PassError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

impl TrimError {
    /// Configuration errors are detected before any process is touched.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TrimError::Policy(_)
                | TrimError::ConfigIo { .. }
                | TrimError::ConfigParse { .. }
                | TrimError::ConfigSerialize(_)
        )
    }
}
