use crate::store::DEFAULT_LOG_RETENTION;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Hosted backend used by release builds.
pub const PRODUCTION_API_URL: &str = "https://bolt-hackathon-backend-adityakulkarnis-projects.vercel.app";

/// Local backend used by debug builds.
pub const DEVELOPMENT_API_URL: &str = "http://localhost:3000";

/// Optional overrides file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Backend base URL for this build profile.
pub fn default_api_base_url() -> &'static str {
    if cfg!(debug_assertions) {
        DEVELOPMENT_API_URL
    } else {
        PRODUCTION_API_URL
    }
}

/// Client configuration: defaults, then `config.toml`, then `MEMORIE_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the store and `config.toml`.
    pub data_dir: PathBuf,
    /// Path to the SQLite store.
    pub db_path: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Frames discarded after opening the camera (auto-exposure settling).
    pub warmup_frames: usize,
    /// Recognition log entries kept; 0 keeps everything.
    pub log_retention: usize,
    /// Backend base URL, without trailing slash.
    pub api_base_url: String,
}

/// Keys accepted in `config.toml`. All optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    camera_device: Option<String>,
    warmup_frames: Option<usize>,
    log_retention: Option<usize>,
    api_base_url: Option<String>,
}

impl Config {
    /// Load configuration from the process environment and the data directory.
    pub fn from_env() -> Self {
        let env = |key: &str| std::env::var(key).ok();
        let data_dir = env("MEMORIE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let file = match std::fs::read_to_string(data_dir.join(CONFIG_FILE_NAME)) {
            Ok(src) => Some(src),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(error = %e, "could not read {CONFIG_FILE_NAME}; using defaults");
                None
            }
        };

        Self::from_sources(data_dir, file.as_deref(), env)
    }

    /// Resolve every field from an optional TOML document and a variable lookup.
    pub fn from_sources(
        data_dir: PathBuf,
        file: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let file = file
            .map(|src| {
                toml::from_str::<FileConfig>(src).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "bad {CONFIG_FILE_NAME}; ignoring it");
                    FileConfig::default()
                })
            })
            .unwrap_or_default();

        let env_usize = |key: &str| {
            let value = env(key)?;
            match value.trim().parse::<usize>() {
                Ok(n) => Some(n),
                Err(e) => {
                    tracing::warn!(key, value = %value, error = %e, "invalid {key}; ignoring it");
                    None
                }
            }
        };

        let db_path = env("MEMORIE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("memorie.db"));

        let api_base_url = env("MEMORIE_API_BASE_URL")
            .or(file.api_base_url)
            .unwrap_or_else(|| default_api_base_url().to_string());

        Self {
            db_path,
            camera_device: env("MEMORIE_CAMERA_DEVICE")
                .or(file.camera_device)
                .unwrap_or_else(|| "/dev/video0".to_string()),
            warmup_frames: env_usize("MEMORIE_WARMUP_FRAMES")
                .or(file.warmup_frames)
                .unwrap_or(4),
            log_retention: env_usize("MEMORIE_LOG_RETENTION")
                .or(file.log_retention)
                .unwrap_or(DEFAULT_LOG_RETENTION),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            data_dir,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE_NAME)
    }
}

fn default_data_dir() -> PathBuf {
    data_dir_under(
        std::env::var("XDG_DATA_HOME").ok().as_deref(),
        std::env::var("HOME").ok().as_deref(),
    )
}

fn data_dir_under(xdg_data_home: Option<&str>, home: Option<&str>) -> PathBuf {
    xdg_data_home
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(home.unwrap_or("/tmp")).join(".local/share"))
        .join("memorie")
}
