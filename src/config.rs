//! File configuration for the proxy server.
//!
//! Values resolve in three layers: command-line flag, then config file, then
//! built-in default. The file is optional; a missing default-path file is not
//! an error, but an explicitly named one is.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

use crate::retrieval::{
    DEFAULT_BASE_URL, DEFAULT_BUDGET, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_PAYLOAD_BYTES,
    DEFAULT_REQUEST_TIMEOUT, HttpTimeouts, RetrievalSettings, normalize_base_url,
};

/// Default listen address for `serve`.
pub const DEFAULT_BIND: &str = "127.0.0.1:8787";

const MIN_PAYLOAD_BYTES: u64 = 1024;
const MAX_PAYLOAD_BYTES: u64 = 1024 * 1024 * 1024;

/// TOML-backed file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Listen address, e.g. `127.0.0.1:8787`.
    pub bind: Option<String>,
    /// Upstream base URL.
    pub base_url: Option<String>,
    /// Connect timeout per upstream call.
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout per upstream call.
    pub request_timeout_secs: Option<u64>,
    /// Budget covering all strategies of one request.
    pub budget_secs: Option<u64>,
    /// Maximum accepted payload size in bytes.
    pub max_payload_bytes: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(bind) = &self.bind
            && bind.parse::<SocketAddr>().is_err()
        {
            bail!("Invalid config value for `bind`: '{bind}'. Expected host:port, e.g. {DEFAULT_BIND}");
        }
        if let Some(base_url) = &self.base_url {
            normalize_base_url(base_url)
                .with_context(|| "Invalid config value for `base_url`".to_string())?;
        }
        validate_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_secs("request_timeout_secs", self.request_timeout_secs)?;
        validate_secs("budget_secs", self.budget_secs)?;
        validate_payload_cap(self.max_payload_bytes)?;
        Ok(())
    }
}

fn validate_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

fn validate_payload_cap(value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(MIN_PAYLOAD_BYTES..=MAX_PAYLOAD_BYTES).contains(&value) {
        bail!(
            "Invalid config value for `max_payload_bytes`: {value}. Expected range: {MIN_PAYLOAD_BYTES}..={MAX_PAYLOAD_BYTES}"
        );
    }
    Ok(())
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/docproxy/config.toml`
/// 2. `$HOME/.config/docproxy/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("docproxy")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("docproxy")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// With `explicit` set the file must exist. Otherwise the default path is
/// tried and a missing file yields `None`.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return read_file_config(path).map(Some);
    }

    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        debug!(path = %path.display(), "no config file at default path");
        return Ok(None);
    }
    read_file_config(&path).map(Some)
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config = parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Parses and validates a TOML config document.
pub fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeOverrides {
    /// `--bind`
    pub bind: Option<SocketAddr>,
    /// `--base-url`
    pub base_url: Option<String>,
    /// `--connect-timeout-secs`
    pub connect_timeout_secs: Option<u64>,
    /// `--request-timeout-secs`
    pub request_timeout_secs: Option<u64>,
    /// `--budget-secs`
    pub budget_secs: Option<u64>,
    /// `--max-payload-bytes`
    pub max_payload_bytes: Option<u64>,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: SocketAddr,
    /// Retrieval stack settings.
    pub retrieval: RetrievalSettings,
}

/// Merges CLI overrides over file values over defaults, then validates.
pub fn resolve_server_config(
    overrides: &ServeOverrides,
    file: Option<&FileConfig>,
) -> Result<ServerConfig> {
    let file = file.cloned().unwrap_or_default();

    let bind = match overrides.bind {
        Some(bind) => bind,
        None => file
            .bind
            .as_deref()
            .unwrap_or(DEFAULT_BIND)
            .parse()
            .with_context(|| "Invalid bind address".to_string())?,
    };

    let merged = FileConfig {
        bind: None,
        base_url: overrides.base_url.clone().or(file.base_url),
        connect_timeout_secs: overrides.connect_timeout_secs.or(file.connect_timeout_secs),
        request_timeout_secs: overrides.request_timeout_secs.or(file.request_timeout_secs),
        budget_secs: overrides.budget_secs.or(file.budget_secs),
        max_payload_bytes: overrides.max_payload_bytes.or(file.max_payload_bytes),
    };
    merged.validate()?;

    let retrieval = RetrievalSettings {
        base_url: merged
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        timeouts: HttpTimeouts {
            connect: merged
                .connect_timeout_secs
                .map_or(DEFAULT_CONNECT_TIMEOUT, Duration::from_secs),
            request: merged
                .request_timeout_secs
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
        },
        budget: merged.budget_secs.map_or(DEFAULT_BUDGET, Duration::from_secs),
        max_payload_bytes: merged.max_payload_bytes.unwrap_or(DEFAULT_MAX_PAYLOAD_BYTES),
    };

    Ok(ServerConfig { bind, retrieval })
}
