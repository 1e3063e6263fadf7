use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

use pulse_core::{ConfigError, PageConfig};
use pulse_engine::SourceSettings;
use pulse_logging::pulse_info;

/// Environment variable naming the settings file.
pub const SETTINGS_ENV: &str = "PAGEPULSE_SETTINGS";
pub const DEFAULT_SETTINGS_PATH: &str = "./pagepulse.ron";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid page behavior: {0}")]
    Behavior(#[from] ConfigError),
    #[error("{0} must be positive")]
    NotPositive(&'static str),
    #[error("unknown log level {0:?}")]
    LogLevel(String),
}

/// Where the loaded settings came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsOrigin {
    File(PathBuf),
    /// No file at this path.
    Defaults(PathBuf),
}

impl fmt::Display for SettingsOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "settings from {path:?}"),
            Self::Defaults(path) => write!(f, "default settings (no file at {path:?})"),
        }
    }
}

/// Host settings, read from a RON file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// HTML page to load; the bundled landing page when unset.
    pub page: Option<PathBuf>,
    pub status_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_body_bytes: u64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub scroll_speed_px_per_sec: f64,
    /// Seconds the visitor lingers at the top and bottom of the page.
    pub dwell_secs: f64,
    pub render_interval_ms: u64,
    /// Stop on its own after this long; otherwise run until ctrl-c.
    pub run_for_ms: Option<u64>,
    pub log_level: String,
    pub behavior: PageConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        let source = SourceSettings::default();
        Self {
            page: None,
            status_url: source.endpoint,
            connect_timeout_ms: source.connect_timeout.as_millis() as u64,
            request_timeout_ms: source.request_timeout.as_millis() as u64,
            max_body_bytes: source.max_bytes,
            viewport_width: 1280.0,
            viewport_height: 720.0,
            scroll_speed_px_per_sec: 400.0,
            dwell_secs: 3.0,
            render_interval_ms: 1000,
            run_for_ms: None,
            log_level: "info".to_string(),
            behavior: PageConfig::default(),
        }
    }
}

impl AppSettings {
    /// Loads from `$PAGEPULSE_SETTINGS`, falling back to `./pagepulse.ron`.
    ///
    /// Runs before the logger exists, so nothing is logged here; callers
    /// report the returned origin once logging is up.
    pub fn load() -> Result<(Self, SettingsOrigin), SettingsError> {
        let path = std::env::var_os(SETTINGS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));
        Self::load_from(&path)
    }

    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub fn load_from(path: &Path) -> Result<(Self, SettingsOrigin), SettingsError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok((Self::default(), SettingsOrigin::Defaults(path.to_path_buf())));
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings: Self = ron::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok((settings, SettingsOrigin::File(path.to_path_buf())))
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.behavior.validate()?;
        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(SettingsError::LogLevel(self.log_level.clone()));
        }
        let positive = [
            ("viewport_width", self.viewport_width),
            ("viewport_height", self.viewport_height),
            ("scroll_speed_px_per_sec", self.scroll_speed_px_per_sec),
            ("render_interval_ms", self.render_interval_ms as f64),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SettingsError::NotPositive(name));
            }
        }
        Ok(())
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            endpoint: self.status_url.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_bytes: self.max_body_bytes,
        }
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }

    pub fn dwell(&self) -> Duration {
        Duration::try_from_secs_f64(self.dwell_secs).unwrap_or_default()
    }

    pub fn run_for(&self) -> Option<Duration> {
        self.run_for_ms.map(Duration::from_millis)
    }

    /// Validated settings always parse; anything else falls back to info.
    pub fn level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }

    /// Logs the effective settings. Call after the logger is initialised.
    pub fn log_summary(&self, origin: &SettingsOrigin) {
        pulse_info!("Using {}", origin);
        pulse_info!(
            "Status endpoint {}, viewport {}x{}, log level {}",
            self.status_url,
            self.viewport_width,
            self.viewport_height,
            self.level()
        );
    }
}
