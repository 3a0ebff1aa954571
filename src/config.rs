//! Responder configuration.
//!
//! Loaded from JSON (all fields optional) or built in code:
//!
//! ```
//! use std::time::Duration;
//! use composer_cmd::config::ResponderConfig;
//!
//! let config = ResponderConfig::from_json_str(r#"{ "transferTimeoutMs": 250 }"#).unwrap();
//! assert_eq!(config.transfer_timeout(), Duration::from_millis(250));
//! assert_eq!(config.init_element_count, 32 * 1024);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default wait for a transport read or write.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_millis(100);

/// Default reply queue size in elements.
pub const DEFAULT_INIT_ELEMENT_COUNT: usize = 32 * 1024;

/// Default directory for buffer dumps.
pub const DEFAULT_DUMP_DIR: &str = "/data/local/traces/";

/// Default wait for a layer fence before dumping.
pub const DEFAULT_FENCE_TIMEOUT: Duration = Duration::from_millis(3000);

/// Environment switch for buffer dumps; dumping is on when it equals `on`.
pub const DUMP_SWITCH_ENV: &str = "COMPOSER_DUMP_BUFFER";

/// Environment override for the dump directory.
pub const DUMP_DIR_ENV: &str = "COMPOSER_DUMP_DIR";

/// Configuration for [`DisplayCmdResponder`](crate::handler::DisplayCmdResponder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponderConfig {
    /// Transport wait in milliseconds.
    pub transfer_timeout_ms: u64,
    /// Reply queue size in elements.
    pub init_element_count: usize,
    /// Debug buffer dump.
    pub dump: DumpConfig,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            transfer_timeout_ms: DEFAULT_TRANSFER_TIMEOUT.as_millis() as u64,
            init_element_count: DEFAULT_INIT_ELEMENT_COUNT,
            dump: DumpConfig::default(),
        }
    }
}

impl ResponderConfig {
    /// Defaults, with the dump section taken from the environment.
    pub fn from_env() -> Self {
        Self {
            dump: DumpConfig::from_env(),
            ..Self::default()
        }
    }

    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Transport wait as a `Duration`.
    #[inline]
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }

    /// Set the transport wait.
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the reply queue size in elements.
    pub fn with_init_element_count(mut self, count: usize) -> Self {
        self.init_element_count = count;
        self
    }

    /// Replace the dump section.
    pub fn with_dump(mut self, dump: DumpConfig) -> Self {
        self.dump = dump;
        self
    }
}

/// Debug buffer dump settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DumpConfig {
    /// Write consumed layer buffers to `dir`.
    pub enabled: bool,
    /// Output directory.
    pub dir: PathBuf,
    /// Fence wait in milliseconds.
    pub fence_timeout_ms: u64,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from(DEFAULT_DUMP_DIR),
            fence_timeout_ms: DEFAULT_FENCE_TIMEOUT.as_millis() as u64,
        }
    }
}

impl DumpConfig {
    /// Read the dump switch and directory from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        config.enabled = lookup(DUMP_SWITCH_ENV).is_some_and(|v| v == "on");
        if let Some(dir) = lookup(DUMP_DIR_ENV).filter(|d| !d.is_empty()) {
            config.dir = PathBuf::from(dir);
        }
        config
    }

    /// Enabled dump into `dir`.
    pub fn enabled_in(dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Fence wait as a `Duration`.
    #[inline]
    pub fn fence_timeout(&self) -> Duration {
        Duration::from_millis(self.fence_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ResponderConfig::default();
        assert_eq!(config.transfer_timeout(), Duration::from_millis(100));
        assert_eq!(config.init_element_count, 32 * 1024);
        assert!(!config.dump.enabled);
        assert_eq!(config.dump.dir, PathBuf::from("/data/local/traces/"));
        assert_eq!(config.dump.fence_timeout(), Duration::from_millis(3000));
    }

    #[test]
    fn test_builder() {
        let config = ResponderConfig::default()
            .with_transfer_timeout(Duration::from_millis(5))
            .with_init_element_count(64)
            .with_dump(DumpConfig::enabled_in("/tmp/dumps"));
        assert_eq!(config.transfer_timeout_ms, 5);
        assert_eq!(config.init_element_count, 64);
        assert!(config.dump.enabled);
    }

    #[test]
    fn test_partial_json() {
        let config =
            ResponderConfig::from_json_str(r#"{ "dump": { "enabled": true, "dir": "/tmp/x" } }"#)
                .unwrap();
        assert!(config.dump.enabled);
        assert_eq!(config.dump.dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.dump.fence_timeout_ms, 3000);
        assert_eq!(config.transfer_timeout_ms, 100);
    }

    #[test]
    fn test_invalid_json() {
        assert!(ResponderConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "initElementCount": 1024 }}"#).unwrap();
        let config = ResponderConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.init_element_count, 1024);
    }

    #[test]
    fn test_missing_file() {
        let err = ResponderConfig::from_json_file("/nonexistent/composer.json").unwrap_err();
        assert!(matches!(err, crate::error::ComposerError::Io(_)));
    }

    #[test]
    fn test_dump_switch_lookup() {
        let env: HashMap<&str, &str> = [(DUMP_SWITCH_ENV, "on"), (DUMP_DIR_ENV, "/tmp/d")]
            .into_iter()
            .collect();
        let config = DumpConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert!(config.enabled);
        assert_eq!(config.dir, PathBuf::from("/tmp/d"));

        let config = DumpConfig::from_lookup(|k| (k == DUMP_SWITCH_ENV).then(|| "off".into()));
        assert!(!config.enabled);
        assert_eq!(config.dir, PathBuf::from(DEFAULT_DUMP_DIR));
    }
}
