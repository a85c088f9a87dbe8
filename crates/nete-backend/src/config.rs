//! Backend configuration.
//!
//! Values are layered: built-in defaults, then the JSON config file
//! (`<config dir>/nete/backend.json` or `--config`), then `NETE_*`
//! environment variables, then command-line flags.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use nete_core::NeteUrl;
use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "backend.json";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to read config at {path}: {message}")]
    File { path: PathBuf, message: String },
}

/// Command-line flags of `nete-backend`.
#[derive(Debug, Default, Parser)]
#[command(name = "nete-backend")]
#[command(author, version, about = "Serve a nete note store over HTTP", long_about = None)]
pub struct Args {
    /// Read configuration from this file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Ignore configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Enable debug logging
    #[arg(short = 'D', long)]
    pub debug: bool,

    /// Host to listen on
    #[arg(short = 'H', long)]
    pub api_host: Option<String>,

    /// Port to listen on
    #[arg(short = 'P', long)]
    pub api_port: Option<u16>,

    /// Listen on this Unix domain socket instead of TCP
    #[arg(short = 'S', long)]
    pub api_socket: Option<PathBuf>,

    /// Directory holding the notes
    #[arg(long)]
    pub storage_base_dir: Option<PathBuf>,

    /// Backend URL to synchronize with on `GET /notes/sync`
    #[arg(long)]
    pub sync_url: Option<String>,
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listen {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl Listen {
    pub fn tcp_addr(host: &str, port: u16) -> String {
        format!("{host}:{port}")
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub listen: Listen,
    pub storage_base_dir: PathBuf,
    pub sync_url: Option<NeteUrl>,
    pub sync_timeout: Duration,
    pub debug: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    debug: Option<bool>,
    api: ApiSection,
    storage: StorageSection,
    sync: SyncSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiSection {
    host: Option<String>,
    port: Option<u16>,
    socket: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StorageSection {
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SyncSection {
    url: Option<String>,
    timeout_secs: Option<u64>,
}

impl FileConfig {
    fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        if !path.exists() {
            if required {
                return Err(ConfigError::File {
                    path: path.to_path_buf(),
                    message: "file does not exist".to_string(),
                });
            }
            return Ok(Self::default());
        }

        tracing::info!("Reading config from file {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|error| ConfigError::File {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|error| ConfigError::File {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nete").join(CONFIG_FILE_NAME))
}

fn default_storage_base_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("nete").join("backend").join("storage"))
}

impl BackendConfig {
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        let lookup = |name: &str| values.get(name).cloned();

        let file = if args.no_config {
            FileConfig::default()
        } else if let Some(path) = args
            .config
            .clone()
            .or_else(|| optional_trimmed(lookup, "NETE_BACKEND_CONFIG").map(PathBuf::from))
        {
            FileConfig::load(&path, true)?
        } else if let Some(path) = default_config_path() {
            FileConfig::load(&path, false)?
        } else {
            FileConfig::default()
        };

        Self::resolve(file, lookup, args)
    }

    fn resolve(
        file: FileConfig,
        lookup: impl Fn(&str) -> Option<String>,
        args: &Args,
    ) -> Result<Self, ConfigError> {
        let debug = args.debug
            || parse_bool(&lookup, "NETE_DEBUG")?
                .or(file.debug)
                .unwrap_or(false);

        let socket = args
            .api_socket
            .clone()
            .or_else(|| optional_trimmed(&lookup, "NETE_API_SOCKET").map(PathBuf::from))
            .or(file.api.socket);
        let listen = if let Some(socket) = socket {
            Listen::Unix(socket)
        } else {
            let host = args
                .api_host
                .clone()
                .or_else(|| optional_trimmed(&lookup, "NETE_API_HOST"))
                .or(file.api.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string());
            let port = match args.api_port {
                Some(port) => port,
                None => parse_number(&lookup, "NETE_API_PORT")?
                    .or(file.api.port)
                    .unwrap_or(DEFAULT_PORT),
            };
            Listen::Tcp { host, port }
        };

        let storage_base_dir = args
            .storage_base_dir
            .clone()
            .or_else(|| optional_trimmed(&lookup, "NETE_STORAGE_BASE_DIR").map(PathBuf::from))
            .or(file.storage.base_dir)
            .or_else(default_storage_base_dir)
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "storage.base_dir is not set and no data directory is known".to_string(),
                )
            })?;

        let sync_url = args
            .sync_url
            .clone()
            .or_else(|| optional_trimmed(&lookup, "NETE_SYNC_URL"))
            .or(file.sync.url)
            .map(|raw| {
                raw.parse::<NeteUrl>()
                    .map_err(|error| ConfigError::Invalid(format!("sync.url: {error}")))
            })
            .transpose()?;

        let sync_timeout_secs = parse_number(&lookup, "NETE_SYNC_TIMEOUT_SECS")?
            .or(file.sync.timeout_secs)
            .unwrap_or(DEFAULT_SYNC_TIMEOUT_SECS);
        if sync_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "sync.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            listen,
            storage_base_dir,
            sync_url,
            sync_timeout: Duration::from_secs(sync_timeout_secs),
            debug,
        })
    }
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    nete_core::util::normalize_text_option(lookup(name))
}

fn parse_number<T: std::str::FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    optional_trimmed(lookup, name)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid(format!("{name} must be a positive integer")))
        })
        .transpose()
}

fn parse_bool(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<bool>, ConfigError> {
    optional_trimmed(lookup, name)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(format!("{name} must be a boolean"))),
        })
        .transpose()
}
