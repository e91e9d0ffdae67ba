//! Configuration for the stress signal agent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default capacity of the pointer event buffer.
pub const DEFAULT_POINTER_MAX_EVENTS: usize = 1000;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-modality buffer bounds
    pub buffers: BufferLimits,

    /// Which input sources to record
    pub sources: SourceConfig,

    /// How often the host publishes a feature snapshot
    #[serde(with = "duration_millis")]
    pub snapshot_interval: Duration,

    /// Fill click pressure from the stress feedback when the device has none
    pub simulate_pressure: bool,

    /// Remote classifier base URL (gateway feature)
    pub classifier_url: Option<String>,

    /// Port for the HTTP surface (server feature)
    pub server_port: u16,

    /// Default tracing filter, overridden by RUST_LOG
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffers: BufferLimits::default(),
            sources: SourceConfig::default(),
            snapshot_interval: Duration::from_millis(1000),
            simulate_pressure: true,
            classifier_url: None,
            server_port: 8765,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stress-signal-agent")
            .join("config.json")
    }
}

/// Capacity bounds for each modality's event buffer. `None` is unbounded.
///
/// The pointer buffer is capped because moves arrive at high rate; the
/// keyboard buffer grows until the session is reset or restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferLimits {
    pub keyboard_max_events: Option<usize>,
    pub pointer_max_events: Option<usize>,
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self {
            keyboard_max_events: None,
            pointer_max_events: Some(DEFAULT_POINTER_MAX_EVENTS),
        }
    }
}

/// Configuration for which input sources to record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub keyboard: bool,
    pub mouse: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            keyboard: true,
            mouse: true,
        }
    }
}

impl SourceConfig {
    /// Parse source configuration from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sources: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();

        Self {
            keyboard: sources.iter().any(|s| s == "keyboard" || s == "all"),
            mouse: sources
                .iter()
                .any(|s| s == "mouse" || s == "pointer" || s == "all"),
        }
    }

    /// Check if at least one source is enabled.
    pub fn any_enabled(&self) -> bool {
        self.keyboard || self.mouse
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Serde support for Duration as whole milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_parsing() {
        let config = SourceConfig::from_csv("keyboard,mouse");
        assert!(config.keyboard);
        assert!(config.mouse);

        let config = SourceConfig::from_csv("keyboard");
        assert!(config.keyboard);
        assert!(!config.mouse);

        let config = SourceConfig::from_csv(" Pointer ");
        assert!(!config.keyboard);
        assert!(config.mouse);

        let config = SourceConfig::from_csv("all");
        assert!(config.keyboard);
        assert!(config.mouse);

        assert!(!SourceConfig::from_csv("trackpad").any_enabled());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.buffers.keyboard_max_events, None);
        assert_eq!(config.buffers.pointer_max_events, Some(1000));
        assert_eq!(config.snapshot_interval, Duration::from_millis(1000));
        assert!(config.simulate_pressure);
        assert!(config.sources.keyboard);
        assert!(config.sources.mouse);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"snapshot_interval": 250, "simulate_pressure": false}"#)
                .unwrap();
        assert_eq!(config.snapshot_interval, Duration::from_millis(250));
        assert!(!config.simulate_pressure);
        assert_eq!(config.buffers, BufferLimits::default());
    }

    #[test]
    fn test_save_and_load_roundtrip_path() {
        let dir =
            std::env::temp_dir().join(format!("stress-signal-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");

        let mut config = Config::default();
        config.server_port = 9100;
        config.buffers.keyboard_max_events = Some(500);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server_port, 9100);
        assert_eq!(loaded.buffers.keyboard_max_events, Some(500));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("stress-signal-does-not-exist.json");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server_port, 8765);
    }
}
