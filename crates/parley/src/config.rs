//! Relay configuration.
//!
//! Sources, later ones winning: built-in defaults, the TOML config file,
//! then `PARLEY_<SECTION>__<KEY>` environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, ensure};
use config::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};

use crate::relay::{DEFAULT_CONNECTION_BUFFER, TrustPolicy};

pub const APP_NAME: &str = "parley";

/// Wildcard entry in `cors.allowed_origins`.
pub const ANY_ORIGIN: &str = "*";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub relay: RelayConfig,
    pub ws: WsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Cross-origin policy, applied to HTTP routes and WebSocket upgrades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins, or `"*"` for any. Empty denies cross-origin requests.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![ANY_ORIGIN.to_string()],
        }
    }
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allowed_origins
            .iter()
            .any(|origin| origin.trim() == ANY_ORIGIN)
    }

    /// Exact match, the same comparison the HTTP CORS layer applies.
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allows_any()
            || self
                .allowed_origins
                .iter()
                .any(|allowed| allowed.trim() == origin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Drop signals whose `from` is not the sender's own id.
    pub verify_sender: bool,
    /// Require explicit rooms in announce/requestIdentityFor to be the sender's room.
    pub enforce_membership: bool,
    /// Per-connection outbound queue size.
    pub connection_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            verify_sender: false,
            enforce_membership: false,
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
        }
    }
}

impl From<&RelayConfig> for TrustPolicy {
    fn from(cfg: &RelayConfig) -> Self {
        TrustPolicy {
            verify_sender: cfg.verify_sender,
            enforce_membership: cfg.enforce_membership,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsConfig {
    pub ping_interval_secs: u64,
    pub max_message_bytes: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: 25,
            max_message_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.relay.connection_buffer >= 1,
            "relay.connection_buffer must be at least 1"
        );
        ensure!(
            self.ws.ping_interval_secs >= 1,
            "ws.ping_interval_secs must be at least 1"
        );
        ensure!(
            self.ws.max_message_bytes >= 1024,
            "ws.max_message_bytes must be at least 1024"
        );
        ensure!(
            !self.server.host.trim().is_empty(),
            "server.host must not be empty"
        );
        Ok(())
    }

    pub fn trust_policy(&self) -> TrustPolicy {
        TrustPolicy::from(&self.relay)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Where the config file lives.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_file: PathBuf,
}

impl AppPaths {
    /// Resolve the config file from an override (file or directory) or the
    /// platform config directory.
    pub fn discover(override_path: Option<PathBuf>) -> Result<Self> {
        let config_file = match override_path {
            Some(path) => {
                let expanded = expand_path(path)?;
                if expanded.is_dir() {
                    expanded.join("config.toml")
                } else {
                    expanded
                }
            }
            None => default_config_dir()?.join("config.toml"),
        };

        if config_file.parent().is_none() {
            return Err(anyhow!("invalid config file path: {config_file:?}"));
        }

        Ok(Self { config_file })
    }
}

/// Build the effective configuration. A missing file is not an error.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    load_config_from(path, None)
}

/// Like [`load_config`], reading environment overrides from `env_source`
/// instead of the process environment when given.
fn load_config_from(path: &Path, env_source: Option<Map<String, String>>) -> Result<AppConfig> {
    let defaults = AppConfig::default();
    let built = Config::builder()
        .set_default("server.host", defaults.server.host.clone())?
        .set_default("server.port", i64::from(defaults.server.port))?
        .set_default("logging.level", defaults.logging.level.clone())?
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix(&env_prefix())
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins")
                .try_parsing(true)
                .source(env_source),
        )
        .build()
        .with_context(|| format!("loading configuration from {}", path.display()))?;

    let config: AppConfig = built
        .try_deserialize()
        .context("parsing configuration")?;
    Ok(config)
}

/// Write the default config unless the file exists and `force` is unset.
///
/// Returns whether a file was written.
pub fn write_default_config(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let toml = toml::to_string_pretty(&AppConfig::default())
        .context("serializing default config to TOML")?;
    let mut body = default_config_header(path);
    body.push_str(&toml);
    fs::write(path, body)
        .with_context(|| format!("writing config file to {}", path.display()))?;
    Ok(true)
}

fn default_config_header(path: &Path) -> String {
    let mut buffer = String::new();
    buffer.push_str("# Configuration for ");
    buffer.push_str(APP_NAME);
    buffer.push('\n');
    buffer.push_str("# File: ");
    buffer.push_str(&path.display().to_string());
    buffer.push('\n');
    buffer.push_str("# Environment overrides: ");
    buffer.push_str(&env_prefix());
    buffer.push_str("_<SECTION>__<KEY>\n");
    buffer.push('\n');
    buffer
}

fn expand_path(path: PathBuf) -> Result<PathBuf> {
    if let Some(text) = path.to_str() {
        expand_str_path(text)
    } else {
        Ok(path)
    }
}

fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}

fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        let mut path = PathBuf::from(dir);
        path.push(APP_NAME);
        return Ok(path);
    }

    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
