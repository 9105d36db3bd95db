use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::http::HttpVersion;
use crate::policy::PolicyTemplate;

pub const CONFIG_PATH_ENV: &str = "CSPNET_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "cspnet.toml";
pub const ENV_MODE_ENV: &str = "CSPNET_ENV";

static CONFIG: OnceCell<ServerConfig> = OnceCell::new();

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("config already set")]
    AlreadySet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub buffer_size: usize,

    pub http_version: HttpVersion,
    pub max_path_size: usize,
    pub max_header_size: usize,
    pub max_body_size: usize,

    #[serde(deserialize_with = "deserialize_duration")]
    pub read_timeout: Duration,

    #[serde(deserialize_with = "deserialize_duration")]
    pub write_timeout: Duration,

    pub static_files_root: String,

    pub server_name: String,

    /// Appends the `csp.development` tokens to every rendered policy.
    pub development: bool,

    pub csp: PolicyTemplate,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 8080,
            buffer_size: 4096,

            http_version: HttpVersion::V1_1,
            max_path_size: 1024,
            max_header_size: 8192,
            max_body_size: 1024 * 1024, // 1 MB

            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),

            static_files_root: "./static".to_string(),

            server_name: "cspnet/0.1".to_string(),

            development: false,
            csp: PolicyTemplate::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str::<ServerConfig>(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Like [`load`](Self::load), falling back to the defaults when the
    /// file is missing or invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "falling back to default config");
                ServerConfig::default()
            }
        }
    }

    /// Loads the file named by `CSPNET_CONFIG` (or `cspnet.toml`) and applies
    /// `CSPNET_ENV=development`.
    pub fn from_env() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut cfg = Self::from_file(&path);
        if std::env::var(ENV_MODE_ENV).is_ok_and(|mode| mode == "development") {
            cfg.development = true;
        }
        cfg
    }
}

pub fn set_config(cfg: ServerConfig) -> Result<(), ConfigError> {
    CONFIG.set(cfg).map_err(|_| ConfigError::AlreadySet)
}

/// Process-wide config. Defaults are installed on first access if
/// [`set_config`] was never called.
pub fn config() -> &'static ServerConfig {
    CONFIG.get_or_init(ServerConfig::default)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(serde::de::Error::custom("duration must be a non-negative number of seconds"));
    }
    Ok(Duration::from_secs_f64(secs))
}
