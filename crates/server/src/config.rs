//! Gateway configuration via `docgate.toml`
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working in-memory gateway on `127.0.0.1:5000`. Values are validated
//! eagerly on load; a bad file fails boot with a message naming it.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use docgate_backend::ArangoOptions;
use docgate_executor::ExecutorOptions;
use docgate_security::TokenTable;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "docgate.toml";

/// Errors raised while reading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("failed to access config file '{}': {source}", path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or has fields of the wrong type.
    #[error("failed to parse config file '{origin}': {reason}")]
    Parse {
        /// Where the content came from.
        origin: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value '{field}': {reason}")]
    Invalid {
        /// Dotted field name, e.g. `cursor.page_size`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Which storage adapter the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process collections; contents are lost on restart.
    #[default]
    Memory,
    /// An ArangoDB server over HTTP.
    Arango,
}

/// `[cursor]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorConfig {
    /// Rows per page when a request gives no `batch_size`.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Largest `batch_size` a request may ask for.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    /// Idle seconds before a cursor expires.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Seconds between expiry sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_page_size() -> usize {
    100
}

fn default_max_page_size() -> usize {
    1000
}

fn default_ttl_secs() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    5
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// `[backend]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// `"memory"` (default) or `"arango"`.
    #[serde(default)]
    pub kind: BackendKind,
    /// ArangoDB server root.
    #[serde(default = "default_url")]
    pub url: String,
    /// ArangoDB database name.
    #[serde(default = "default_database")]
    pub database: String,
    /// Basic-auth user.
    #[serde(default = "default_username")]
    pub username: String,
    /// Basic-auth password.
    #[serde(default)]
    pub password: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_url() -> String {
    "http://localhost:8529".to_string()
}

fn default_database() -> String {
    "_system".to_string()
}

fn default_username() -> String {
    "root".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            url: default_url(),
            database: default_database(),
            username: default_username(),
            password: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// `[auth]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer tokens granted the admin role.
    #[serde(default)]
    pub admin_tokens: Vec<String>,
    /// Bearer tokens granted the user role.
    #[serde(default)]
    pub user_tokens: Vec<String>,
}

/// Gateway configuration loaded from `docgate.toml`.
///
/// # Example
///
/// ```toml
/// listen = "127.0.0.1:5000"
/// spec_dir = "specs"
///
/// [backend]
/// kind = "arango"
/// url = "http://localhost:8529"
///
/// [auth]
/// admin_tokens = ["admin_token"]
/// user_tokens = ["user_token"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Socket address to bind.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Directory holding `schemas/` and `views/`.
    #[serde(default = "default_spec_dir")]
    pub spec_dir: PathBuf,
    /// Paging and cursor expiry.
    #[serde(default)]
    pub cursor: CursorConfig,
    /// Storage adapter.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Token table.
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_listen() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_spec_dir() -> PathBuf {
    PathBuf::from("specs")
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            spec_dir: default_spec_dir(),
            cursor: CursorConfig::default(),
            backend: BackendConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Docgate gateway configuration

# Address the HTTP server binds to.
listen = "127.0.0.1:5000"

# Directory holding schemas/vertices/*.json, schemas/edges/*.json and views/*.aql.
spec_dir = "specs"

[cursor]
# Rows per page when a request gives no batch_size.
page_size = 100
# Upper bound for a requested batch_size.
max_page_size = 1000
# Idle seconds before an open cursor expires.
ttl_secs = 30
# Seconds between expiry sweeps.
sweep_interval_secs = 5

[backend]
# "memory" keeps collections in-process; "arango" talks to an ArangoDB server.
kind = "memory"
url = "http://localhost:8529"
database = "_system"
username = "root"
password = ""
timeout_ms = 5000

[auth]
# Bearer tokens. Admin tokens may write and run ad-hoc queries.
admin_tokens = []
user_tokens = []
"#
    }

    /// Parse and validate config text. `origin` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or a value is out of range.
    pub fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    /// Check value ranges. Warns about settings that are accepted but inert.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        let cursor = &self.cursor;
        if cursor.page_size == 0 {
            return Err(invalid("cursor.page_size", "must be at least 1"));
        }
        if cursor.max_page_size < cursor.page_size {
            return Err(invalid(
                "cursor.max_page_size",
                format!("must be at least page_size ({})", cursor.page_size),
            ));
        }
        if cursor.ttl_secs == 0 {
            return Err(invalid("cursor.ttl_secs", "must be at least 1"));
        }
        if cursor.sweep_interval_secs == 0 {
            return Err(invalid("cursor.sweep_interval_secs", "must be at least 1"));
        }
        if self.backend.kind == BackendKind::Arango && self.backend.url.trim().is_empty() {
            return Err(invalid("backend.url", "required when kind = \"arango\""));
        }
        if self.backend.timeout_ms == 0 {
            return Err(invalid("backend.timeout_ms", "must be at least 1"));
        }

        if self.backend.kind == BackendKind::Memory && !self.backend.password.is_empty() {
            warn!("backend.password is ignored by the memory backend");
        }
        if self.auth.admin_tokens.is_empty() && self.auth.user_tokens.is_empty() {
            warn!("no tokens configured; protected endpoints will refuse every request");
        }
        Ok(())
    }

    /// Parsed `listen` address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `listen` is not `host:port`.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|e| invalid("listen", format!("'{}': {}", self.listen, e)))
    }

    /// Paging settings for the executor.
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            page_size: self.cursor.page_size,
            max_page_size: self.cursor.max_page_size,
            cursor_ttl: Duration::from_secs(self.cursor.ttl_secs),
        }
    }

    /// Interval between cursor expiry sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cursor.sweep_interval_secs)
    }

    /// Connection settings for the ArangoDB adapter.
    pub fn arango_options(&self) -> ArangoOptions {
        ArangoOptions {
            url: self.backend.url.clone(),
            database: self.backend.database.clone(),
            username: self.backend.username.clone(),
            password: self.backend.password.clone(),
            timeout: Duration::from_millis(self.backend.timeout_ms),
        }
    }

    /// Token table built from `[auth]`.
    pub fn token_table(&self) -> TokenTable {
        TokenTable::from_lists(
            self.auth.admin_tokens.iter().cloned(),
            self.auth.user_tokens.iter().cloned(),
        )
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
