//! Engine configuration, stored as TOML.
//!
//! ```toml
//! strict_mode = false
//! tick_interval_ms = 10
//! max_ticks = 5000
//! log_format = "compact"
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading or writing an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// Format requested through `CANOPY_LOG_FORMAT`, if any.
    pub fn from_env() -> Option<Self> {
        match std::env::var("CANOPY_LOG_FORMAT").ok()?.to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Settings for [`TreeDriver`](crate::driver::TreeDriver) and tracing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Panic on status anomalies instead of failing the offending node.
    #[serde(default)]
    pub strict_mode: bool,

    /// Longest wait between two ticks of a running tree.  A wake-up signal
    /// cuts the wait short.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Stop driving after this many ticks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ticks: Option<u64>,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_tick_interval_ms() -> u64 {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: None,
            log_format: LogFormat::default(),
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Load the config at `path`.  Returns `Ok(None)` if the file does not
/// exist.  Environment overrides are applied to a loaded config.
pub fn load_from(path: &Path) -> Result<Option<EngineConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut cfg: EngineConfig = toml::from_str(&raw)?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Write `cfg` to `path`, creating parent directories.
pub fn save_to(cfg: &EngineConfig, path: &Path) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let raw = toml::to_string_pretty(cfg)?;
    fs::write(path, raw).map_err(io_error)
}

/// Apply `CANOPY_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `CANOPY_STRICT_MODE` | `strict_mode` (`true`/`false`/`1`/`0`) |
/// | `CANOPY_TICK_INTERVAL_MS` | `tick_interval_ms` |
/// | `CANOPY_MAX_TICKS` | `max_ticks` |
/// | `CANOPY_LOG_FORMAT` | `log_format` |
///
/// Unparsable values are ignored.
pub fn apply_env_overrides(cfg: &mut EngineConfig) {
    if let Ok(v) = std::env::var("CANOPY_STRICT_MODE") {
        match v.trim() {
            "1" | "true" => cfg.strict_mode = true,
            "0" | "false" => cfg.strict_mode = false,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("CANOPY_TICK_INTERVAL_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.tick_interval_ms = ms;
    }
    if let Ok(v) = std::env::var("CANOPY_MAX_TICKS")
        && let Ok(max) = v.trim().parse::<u64>()
    {
        cfg.max_ticks = Some(max);
    }
    if let Some(format) = LogFormat::from_env() {
        cfg.log_format = format;
    }
}
