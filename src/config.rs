use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;

use crate::cards::CardConfig;
use crate::models::WeightUnit;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub hass: HassConfig,
    pub network: NetworkConfig,
    pub window: WindowConfig,
    pub refresh: RefreshConfig,
    pub display: DisplayConfig,
    #[serde(default)]
    pub cards: Vec<CardConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HassConfig {
    pub base_url: String,
    pub access_token: String,
    /// Home Assistant user whose default profile is shown. Resolved through
    /// `auth/current_user` when unset.
    pub user_id: Option<String>,
    /// Profile to open instead of the user's default.
    pub profile_entity_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: f32,
    pub height: f32,
    pub sidebar_width: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Calorie Tracker".to_string(),
            width: 1200.0,
            height: 850.0,
            sidebar_width: 300.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    /// Clock tick that rolls "today" over at midnight and refreshes the
    /// in-progress BMR share.
    pub ui_interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            ui_interval_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DisplayConfig {
    /// Unit used when a profile does not specify one.
    pub weight_unit: WeightUnit,
}

impl AppConfig {
    /// Load from `./config.toml`, the user config directory and the
    /// environment.
    pub fn load() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calorie-panel");

        let builder = Self::defaults()?
            // 2. Load from local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))
            // 3. Load from user config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))
            // 4. Load from Environment variables (CALORIE_PANEL__HASS__BASE_URL=...)
            .add_source(Environment::with_prefix("CALORIE_PANEL").separator("__"));

        Self::finish(builder)
    }

    /// Load from one specific file on top of the defaults and the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let builder = Self::defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .add_source(Environment::with_prefix("CALORIE_PANEL").separator("__"));

        Self::finish(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        // Load .env file (silently ignore if not present - production uses env vars directly)
        let _ = dotenvy::dotenv();

        let token = std::env::var("HASS_TOKEN").unwrap_or_default();

        Ok(Config::builder()
            // 1. Load default values
            // Home Assistant
            .set_default("hass.base_url", "http://homeassistant.local:8123")?
            .set_default("hass.access_token", token)?
            .set_default("hass.user_id", None::<String>)?
            .set_default("hass.profile_entity_id", None::<String>)?
            // Network
            .set_default("network.request_timeout_secs", 30)?
            .set_default("network.connect_timeout_secs", 10)?
            // Window
            .set_default("window.title", "Calorie Tracker")?
            .set_default("window.width", 1200.0)?
            .set_default("window.height", 850.0)?
            .set_default("window.sidebar_width", 300.0)?
            // Refresh
            .set_default("refresh.ui_interval_secs", 60)?
            // Display
            .set_default("display.weight_unit", "lbs")?)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: AppConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        if config.hass.access_token.trim().is_empty() {
            anyhow::bail!(
                "HASS_TOKEN must be set (via .env file, environment variable or hass.access_token)"
            );
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::cards::CardKind;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    // ==================== Default Value Tests ====================

    #[test]
    fn test_network_config_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_window_config_defaults() {
        let config = WindowConfig::default();
        assert_eq!(config.title, "Calorie Tracker");
        assert_eq!(config.width, 1200.0);
        assert_eq!(config.height, 850.0);
    }

    #[test]
    fn test_display_defaults_to_lbs() {
        assert_eq!(DisplayConfig::default().weight_unit, WeightUnit::Lbs);
    }

    // ==================== Config Loading Tests ====================

    #[test]
    fn test_load_from_file_with_cards() {
        let file = write_config(
            r#"
[hass]
base_url = "http://ha.test:8123"
access_token = "abc"
user_id = "user-1"

[display]
weight_unit = "kg"

[[cards]]
kind = "gauge"
title = "Today"
max_height = 150
min = 0
max = 3000

[[cards]]
kind = "weekly"
profile_entity_id = "sensor.calorie_tracker_sam"
"#,
        );

        let config = AppConfig::load_from(file.path()).expect("Config should load");
        assert_eq!(config.hass.base_url, "http://ha.test:8123");
        assert_eq!(config.hass.access_token, "abc");
        assert_eq!(config.hass.user_id.as_deref(), Some("user-1"));
        assert_eq!(config.display.weight_unit, WeightUnit::Kg);
        assert!(config.network.request_timeout_secs > 0);

        assert_eq!(config.cards.len(), 2);
        assert_eq!(config.cards[0].kind, CardKind::Gauge);
        assert_eq!(config.cards[0].max, Some(3000.0));
        assert_eq!(config.cards[0].max_height, Some(150.0));
        assert_eq!(
            config.cards[1].profile_entity_id.as_deref(),
            Some("sensor.calorie_tracker_sam")
        );
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = AppConfig::load_from(Path::new("/definitely/not/here.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_token_is_rejected() {
        let file = write_config(
            r#"
[hass]
access_token = "   "
"#,
        );
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("HASS_TOKEN"));
    }

    #[test]
    fn test_config_structs_are_debug() {
        let config = NetworkConfig::default();
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("NetworkConfig"));
        assert!(debug_str.contains("request_timeout_secs"));
    }

    // ==================== Environment Variable Override Tests ====================

    /// Helper to set an environment variable for the duration of `f`.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        // SAFETY: Test environment, the key is not read by other tests
        unsafe {
            std::env::set_var(key, value);
        }
        let result = f();
        unsafe {
            std::env::remove_var(key);
        }
        result
    }

    #[test]
    fn test_env_var_overrides_window_title() {
        let file = write_config("[hass]\naccess_token = \"abc\"\n");
        let config = with_env_var("CALORIE_PANEL__WINDOW__TITLE", "Sam's Calories", || {
            AppConfig::load_from(file.path()).expect("Config should load")
        });
        assert_eq!(config.window.title, "Sam's Calories");
    }
}
