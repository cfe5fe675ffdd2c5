//! Configuration for the working-set trimmer
//!
//! A `TrimConfig` is the raw, serializable form of every option. It is read
//! from a TOML file, overridden by command-line flags and then turned into a
//! validated [`TrimPolicy`](super::policy::TrimPolicy).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::TrimError;

/// Whether a pass changes working sets or only reads their bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Trim,
    Report,
}

/// Main trimmer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Process name patterns to include (empty = all)
    pub include: Vec<String>,

    /// Process name patterns to exclude
    pub exclude: Vec<String>,

    /// Owning user patterns to include (empty = all)
    pub include_users: Vec<String>,

    /// Owning user patterns to exclude
    pub exclude_users: Vec<String>,

    /// Explicit target process ids (empty = all)
    pub pids: Vec<u32>,

    /// Only processes in the caller's own session
    pub this_session: bool,

    /// Only processes in these sessions
    pub sessions: Vec<u32>,

    /// Never processes in these sessions
    pub not_sessions: Vec<u32>,

    /// Only processes in disconnected sessions
    pub disconnected_only: bool,

    /// Skip the process owning the foreground window
    pub exclude_foreground: bool,

    /// Background pass: never gated by idle time, always skips the foreground
    pub background: bool,

    /// Skip processes whose working set is not above this (bytes)
    pub above_bytes: u64,

    /// Working-set minimum to set (bytes)
    pub min_working_set: Option<u64>,

    /// Working-set maximum to set (bytes)
    pub max_working_set: Option<u64>,

    /// Make the minimum a hard limit
    pub hard_min: bool,

    /// Make the maximum a hard limit
    pub hard_max: bool,

    /// Only run when the user has been idle this long (seconds, 0 = always)
    pub idle_secs: u64,

    /// Only processes started after the tool started
    pub new_only: bool,

    pub mode: Mode,

    /// Re-read working sets after trimming and report memory reclaimed
    pub savings: bool,

    /// Repeat passes until interrupted
    pub repeat: bool,

    /// Seconds between passes when repeating
    pub interval_secs: u64,

    /// Wait for a process with one of these names before the first pass
    pub wait_for: Vec<String>,

    /// Raise the tool's own priority while a pass runs
    pub boost_priority: bool,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            include_users: Vec::new(),
            exclude_users: Vec::new(),
            pids: Vec::new(),
            this_session: false,
            sessions: Vec::new(),
            not_sessions: Vec::new(),
            disconnected_only: false,
            exclude_foreground: false,
            background: false,
            above_bytes: 0,
            min_working_set: None,
            max_working_set: None,
            hard_min: false,
            hard_max: false,
            idle_secs: 0,
            new_only: false,
            mode: Mode::Trim,
            savings: false,
            repeat: false,
            interval_secs: 60,
            wait_for: Vec::new(),
            boost_priority: true,
        }
    }
}

impl TrimConfig {
    /// Load config from TOML file
    pub fn load(path: &Path) -> Result<Self, TrimError> {
        let content = std::fs::read_to_string(path).map_err(|source| TrimError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| TrimError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save config to TOML file
    pub fn save(&self, path: &Path) -> Result<(), TrimError> {
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|source| TrimError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String, TrimError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// `<config dir>/wstrim/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wstrim").join("config.toml"))
    }

    /// Load the default config file if it exists, otherwise defaults.
    pub fn load_default() -> Result<Self, TrimError> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TrimConfig = toml::from_str(
            r#"
            exclude = ["explorer", "dwm"]
            above_bytes = 52428800
            mode = "report"
            "#,
        )
        .unwrap();

        assert_eq!(config.exclude, vec!["explorer", "dwm"]);
        assert_eq!(config.above_bytes, 50 * 1024 * 1024);
        assert_eq!(config.mode, Mode::Report);
        assert_eq!(config.interval_secs, 60);
        assert!(config.boost_priority);
        assert!(config.max_working_set.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = TrimConfig {
            include: vec!["chrome.*".into()],
            max_working_set: Some(100 * 1024 * 1024),
            hard_max: true,
            idle_secs: 600,
            ..Default::default()
        };

        config.save(&path).unwrap();
        let loaded = TrimConfig::load(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = TrimConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, TrimError::ConfigIo { .. }));
    }
}
