//! CLI configuration.
//!
//! Layered like the backend: defaults, then the JSON config file
//! (`--config`, `NETE_CONFIG_FILE` or `<config dir>/nete/cli.json`), then
//! `NETE_*` environment variables, then command-line flags.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nete_core::NeteUrl;
use serde::Deserialize;

use crate::cli::Cli;
use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "cli.json";
const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub backend_url: String,
    pub timeout: Duration,
    pub debug: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfigFile {
    debug: Option<bool>,
    backend: BackendSection,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendSection {
    url: Option<String>,
}

impl CliConfigFile {
    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        tracing::debug!("Reading config from file {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|error| {
            CliError::Config(format!(
                "Failed to read config at {}: {error}",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|error| {
            CliError::Config(format!(
                "Failed to parse config at {}: {error}",
                path.display()
            ))
        })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nete").join(CONFIG_FILE_NAME))
}

impl CliConfig {
    pub fn load(cli: &Cli) -> Result<Self, CliError> {
        let values: HashMap<String, String> = env::vars().collect();
        let lookup = |name: &str| values.get(name).cloned();

        let file = if let Some(path) = &cli.config {
            CliConfigFile::load_from_path(path)?
        } else {
            match optional_trimmed(lookup, "NETE_CONFIG_FILE")
                .map(PathBuf::from)
                .or_else(default_config_path)
            {
                Some(path) if path.exists() => CliConfigFile::load_from_path(&path)?,
                _ => CliConfigFile::default(),
            }
        };

        Self::resolve(file, lookup, cli.backend_url.clone(), cli.debug)
    }

    pub fn resolve(
        file: CliConfigFile,
        lookup: impl Fn(&str) -> Option<String>,
        backend_url: Option<String>,
        debug: bool,
    ) -> Result<Self, CliError> {
        let backend_url = nete_core::util::normalize_text_option(backend_url)
            .or_else(|| optional_trimmed(&lookup, "NETE_BACKEND_URL"))
            .or(file.backend.url)
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let timeout_secs = match optional_trimmed(&lookup, "NETE_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                CliError::Config("NETE_TIMEOUT_SECS must be a positive integer".to_string())
            })?,
            None => file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(CliError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            backend_url,
            timeout: Duration::from_secs(timeout_secs),
            debug: debug || file.debug.unwrap_or(false),
        })
    }

    pub fn backend_url(&self) -> Result<NeteUrl, CliError> {
        Ok(self.backend_url.parse::<NeteUrl>()?)
    }
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    nete_core::util::normalize_text_option(lookup(name))
}
