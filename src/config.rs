//! Configuration for the composer.
//!
//! Two layers: [`ComposerConfig`] describes one composer session (which
//! route, which LSA to focus, which dataset) and is built from a query string
//! or CLI flags. [`AppSettings`] is the persistent settings file with the
//! backend connection and log level.

use std::time::Duration;

use composer_api::{EntityId, RouteId, parse_query};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BACKEND_URL, DEFAULT_MAP_DATA_LABEL, DEFAULT_REQUEST_TIMEOUT};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Settings for one composer session.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposerConfig {
    /// Route being bound
    pub route_id: RouteId,
    /// LSA to focus once the bindings are loaded
    pub lsa_id: Option<EntityId>,
    /// Include bindings already present on other routes
    pub show_duplicates: bool,
    /// Dataset selector echoed on submit and health checks
    pub map_data: Option<String>,
}

impl ComposerConfig {
    /// Config for `route_id` with every option at its default.
    pub fn new(route_id: impl Into<RouteId>) -> Self {
        Self {
            route_id: route_id.into(),
            lsa_id: None,
            show_duplicates: true,
            map_data: None,
        }
    }

    /// Set the LSA to focus. An empty id means none.
    pub fn with_lsa_id(mut self, lsa_id: Option<&str>) -> Self {
        self.lsa_id = non_empty(lsa_id).map(EntityId::from);
        self
    }

    /// Set the duplicates flag from its textual form.
    pub fn with_show_duplicates(mut self, value: Option<&str>) -> Self {
        self.show_duplicates = parse_show_duplicates(value);
        self
    }

    /// Set the dataset selector. An empty value means none.
    pub fn with_map_data(mut self, map_data: Option<&str>) -> Self {
        self.map_data = non_empty(map_data).map(str::to_string);
        self
    }

    /// Parse a query string such as `?route_id=12&lsa_id=7&show_duplicates=false`.
    ///
    /// `route_id` is required. Unknown keys are ignored; for repeated keys the
    /// first occurrence wins.
    pub fn from_query(query: &str) -> Result<Self, ConfigError> {
        let pairs = parse_query(query);
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let route_id = non_empty(get("route_id")).ok_or(ConfigError::MissingRouteId)?;
        let config = Self::new(route_id)
            .with_lsa_id(get("lsa_id"))
            .with_show_duplicates(get("show_duplicates"))
            .with_map_data(get("map_data"));
        log::debug!("Parsed composer config {:?}", config);
        Ok(config)
    }

    /// Dataset label for display, `osm` when none is configured.
    pub fn map_data_label(&self) -> &str {
        self.map_data.as_deref().unwrap_or(DEFAULT_MAP_DATA_LABEL)
    }
}

/// Anything but the literal `false` enables duplicates, including a missing
/// value.
pub fn parse_show_duplicates(value: Option<&str>) -> bool {
    value != Some("false")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Current settings file format version.
/// Increment this when making breaking changes to the format.
pub const SETTINGS_VERSION: u32 = 1;

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Version of the settings file format
    pub version: u32,

    /// Backend base URL, e.g. `http://localhost:8000`
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Timeout of every backend request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

impl AppSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self {
            version: SETTINGS_VERSION,
            backend_url: default_backend_url(),
            request_timeout_secs: default_timeout_secs(),
            log_level: LogLevel::default(),
        }
    }

    /// Request timeout as a duration. Zero falls back to the default.
    pub fn request_timeout(&self) -> Duration {
        if self.request_timeout_secs == 0 {
            DEFAULT_REQUEST_TIMEOUT
        } else {
            Duration::from_secs(self.request_timeout_secs)
        }
    }

    /// Serialize the settings to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize settings from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;

        if settings.version > SETTINGS_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: settings.version,
                supported_version: SETTINGS_VERSION,
            });
        }

        Ok(settings)
    }

    /// Default filename of the settings file.
    pub fn default_filename() -> &'static str {
        "settings.json"
    }

    /// Default settings file path.
    pub fn default_path() -> Option<std::path::PathBuf> {
        // XDG config directory, falling back to ~/.config
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("lsa-composer").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home| {
                home.join(".config")
                    .join("lsa-composer")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load settings from `path`.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Load settings from the default path, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            log::debug!("No settings file found at {:?}", path);
            return Self::default();
        }
        match Self::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring settings file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save settings to `path`, creating parent directories.
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Save settings to the default path.
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save(&path)
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when building configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Settings version is newer than supported
    #[error(
        "Settings file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing settings
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The query did not name a route
    #[error("Missing route_id")]
    MissingRouteId,
}
