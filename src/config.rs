//! Application configuration, read from a JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "LOOPCUT_CONFIG";
/// Config file looked up in the working directory when the variable is unset.
const DEFAULT_CONFIG_FILE: &str = "loopcut.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long a notification stays visible.
    pub notification_timeout_ms: u64,
    /// Arrow-key seek distance in seconds.
    pub seek_step_secs: f64,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
    pub cutter: CutterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            notification_timeout_ms: 4000,
            seek_step_secs: 5.0,
            log_filter: "loopcut=info".to_string(),
            cutter: CutterConfig::default(),
        }
    }
}

/// Settings handed to the cut worker when it is spawned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutterConfig {
    pub ffmpeg_path: PathBuf,
    /// Directory finished clips are written to.
    pub output_dir: PathBuf,
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for CutterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            output_dir: PathBuf::from("clips"),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

impl Config {
    /// Load from `$LOOPCUT_CONFIG`, else `./loopcut.json` if it exists, else defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn notification_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.notification_timeout_ms)
    }
}
