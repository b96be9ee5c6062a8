//! Freeze-tag configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bus::BusConfig;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Movement, heartbeat and polling cadence
    pub timing: TimingConfig,

    /// In-process bus sizing and loss injection
    pub bus: BusConfig,

    /// Board view
    pub render: RenderConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// RNG seed for reproducible games
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Config {
    /// Reject values the game cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.bus.drop_rate) {
            return Err(eyre::eyre!("bus.drop-rate must be in [0, 1), got {}", self.bus.drop_rate));
        }
        if self.bus.channel_buffer == 0 || self.bus.inbox_buffer == 0 {
            return Err(eyre::eyre!("bus.channel-buffer and bus.inbox-buffer must be positive"));
        }
        let t = &self.timing;
        for (name, value) in [
            ("timing.hider-move-ms", t.hider_move_ms),
            ("timing.seeker-move-ms", t.seeker_move_ms),
            ("timing.coordinator-poll-ms", t.coordinator_poll_ms),
        ] {
            if value == 0 {
                return Err(eyre::eyre!("{} must be positive", name));
            }
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // Explicit path must load
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .freezetag.yml
        let local_config = PathBuf::from(".freezetag.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/freezetag/freezetag.yml
        if let Some(user_config) = user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Log level from the config file, read before logging is initialized
    ///
    /// Errors are swallowed: the full load reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".freezetag.yml")];
                paths.extend(user_config_path());
                paths
            }
        };
        candidates
            .into_iter()
            .filter(|path| path.exists())
            .find_map(|path| Self::load_from_file(path).ok())
            .and_then(|config| config.log_level)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Effective configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("freezetag").join("freezetag.yml"))
}

/// Movement, heartbeat and polling cadence in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    #[serde(rename = "hider-move-ms")]
    pub hider_move_ms: u64,

    #[serde(rename = "seeker-move-ms")]
    pub seeker_move_ms: u64,

    /// Minimum gap between STATUS heartbeats
    #[serde(rename = "sync-ms")]
    pub sync_ms: u64,

    #[serde(rename = "coordinator-poll-ms")]
    pub coordinator_poll_ms: u64,

    /// Minimum gap between board redraws
    #[serde(rename = "render-interval-ms")]
    pub render_interval_ms: u64,

    /// How long agents get to exit after the coordinator finishes
    #[serde(rename = "shutdown-grace-ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            hider_move_ms: 1000,
            seeker_move_ms: 500,
            sync_ms: 2000,
            coordinator_poll_ms: 50,
            render_interval_ms: 200,
            shutdown_grace_ms: 2000,
        }
    }
}

impl TimingConfig {
    pub fn hider_move(&self) -> Duration {
        Duration::from_millis(self.hider_move_ms)
    }

    pub fn seeker_move(&self) -> Duration {
        Duration::from_millis(self.seeker_move_ms)
    }

    pub fn sync(&self) -> Duration {
        Duration::from_millis(self.sync_ms)
    }

    pub fn coordinator_poll(&self) -> Duration {
        Duration::from_millis(self.coordinator_poll_ms)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Board view configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Draw the board in the terminal while the game runs
    pub enabled: bool,

    /// Use ANSI colors
    pub color: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            color: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timing.hider_move_ms, 1000);
        assert_eq!(config.timing.seeker_move_ms, 500);
        assert_eq!(config.timing.sync_ms, 2000);
        assert_eq!(config.timing.coordinator_poll(), Duration::from_millis(50));
        assert_eq!(config.bus.inbox_buffer, 256);
        assert!(config.render.enabled);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
timing:
  seeker-move-ms: 100
bus:
  drop-rate: 0.25
log-level: debug
seed: 7
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.timing.seeker_move_ms, 100);
        assert_eq!(config.timing.hider_move_ms, 1000);
        assert_eq!(config.bus.drop_rate, 0.25);
        assert_eq!(config.bus.channel_buffer, 1024);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.seed, Some(7));
        assert!(config.render.color);
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ft.yml");
        fs::write(&path, "render:\n  enabled: false\nlog-level: WARN\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(!config.render.enabled);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("WARN"));
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.bus.drop_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timing.coordinator_poll_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip_uses_kebab_case() {
        let yaml = Config::default().to_yaml().unwrap();
        assert!(yaml.contains("hider-move-ms: 1000"));
        assert!(yaml.contains("drop-rate: 0.0"));
        assert!(!yaml.contains("seed"));
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.timing, TimingConfig::default());
    }
}
