//! Persistent configuration for droidtouch.
//!
//! Stores user settings in `~/.droidtouch/config.json`: where the Appium
//! server lives, which device and app to open a session on, and the timing
//! knobs used when performing gestures. Command-line flags and environment
//! variables override these values at the call site.
//!
//! Setting `DROIDTOUCH_HOME` relocates the whole `~/.droidtouch` directory.
//!
//! # Example
//!
//! ```no_run
//! use droidtouch_core::config::DroidtouchConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = DroidtouchConfig::load();
//! println!("Appium server: {}", config.server_url);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capabilities::Capabilities;

const CONFIG_FILENAME: &str = "config.json";

/// Default Appium 2 endpoint.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:4723";

/// Returns the droidtouch data directory (`~/.droidtouch/`, or
/// `$DROIDTOUCH_HOME`), creating it if needed.
pub fn droidtouch_dir() -> PathBuf {
    let dir = match std::env::var_os("DROIDTOUCH_HOME") {
        Some(home) => PathBuf::from(home),
        None => dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(".droidtouch"),
    };
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Returns the logs directory path (`~/.droidtouch/logs/`).
///
/// Creates the directory if it doesn't exist.
pub fn logs_dir() -> PathBuf {
    let dir = droidtouch_dir().join("logs");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_implicit_wait_ms() -> u64 {
    1000
}

fn default_move_duration_ms() -> u64 {
    50
}

/// Persistent droidtouch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroidtouchConfig {
    /// Base URL of the Appium server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Capabilities for new sessions.
    #[serde(default)]
    pub capabilities: Capabilities,

    /// How long element lookups retry before failing.
    #[serde(default = "default_implicit_wait_ms")]
    pub implicit_wait_ms: u64,

    /// Duration of each pointer move inside a gesture.
    #[serde(default = "default_move_duration_ms")]
    pub move_duration_ms: u64,

    /// Pause between repeated submissions of the same gesture.
    #[serde(default)]
    pub repeat_pause_ms: u64,

    /// Start a local `appium` process when no server answers.
    #[serde(default)]
    pub launch_server: bool,

    /// Path to the `appium` executable; looked up on `PATH` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appium_binary: Option<PathBuf>,
}

impl Default for DroidtouchConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            capabilities: Capabilities::default(),
            implicit_wait_ms: default_implicit_wait_ms(),
            move_duration_ms: default_move_duration_ms(),
            repeat_pause_ms: 0,
            launch_server: false,
            appium_binary: None,
        }
    }
}

impl DroidtouchConfig {
    /// Path of the config file.
    pub fn path() -> PathBuf {
        droidtouch_dir().join(CONFIG_FILENAME)
    }

    /// Load config from `~/.droidtouch/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to `~/.droidtouch/config.json`.
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::path())
    }

    /// Save config as pretty JSON to an explicit path.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_local_appium() {
        let config = DroidtouchConfig::default();
        assert_eq!(config.server_url, "http://127.0.0.1:4723");
        assert_eq!(config.implicit_wait_ms, 1000);
        assert_eq!(config.move_duration_ms, 50);
        assert!(!config.launch_server);
    }

    #[test]
    fn deserialize_empty_json() {
        let loaded: DroidtouchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(loaded.server_url, DEFAULT_SERVER_URL);
        assert_eq!(loaded.capabilities, Capabilities::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("droidtouch-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut config = DroidtouchConfig::default();
        config.server_url = "http://10.0.0.2:4723/wd/hub".into();
        config.capabilities.device_name = Some("emulator-5554".into());
        config.repeat_pause_ms = 250;
        config.save_to(&path).unwrap();

        let loaded = DroidtouchConfig::load_from(&path);
        assert_eq!(loaded.server_url, config.server_url);
        assert_eq!(loaded.capabilities.device_name.as_deref(), Some("emulator-5554"));
        assert_eq!(loaded.repeat_pause_ms, 250);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_returns_default_for_missing_file() {
        let config = DroidtouchConfig::load_from(Path::new("/nonexistent/droidtouch/config.json"));
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    }
}
