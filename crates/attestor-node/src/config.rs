//! Node configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Full configuration for the Attestor node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AttestorConfig {
    /// HTTP API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Identity record storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Agent settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Defaults for registration requests that omit them.
    #[serde(default)]
    pub registration: RegistrationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

/// Where the identity record is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// `<data_dir>/identity.json`, replaced by rename.
    File,
    /// RocksDB database under `<data_dir>/identity-db`.
    Rocksdb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the data directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_label")]
    pub label: String,
    /// DID method used to qualify imported identifiers.
    #[serde(default = "default_did_method")]
    pub did_method: String,
    #[serde(default = "default_did_namespace")]
    pub did_namespace: String,
    /// Upper bound for any single agent call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    #[serde(default = "default_schema_name")]
    pub schema_name: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default = "default_attribute_names")]
    pub attribute_names: Vec<String>,
    #[serde(default = "default_credential_definition_tag")]
    pub credential_definition_tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    3000
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_backend() -> StorageBackend {
    StorageBackend::File
}
fn default_label() -> String {
    "attestor-issuer".into()
}
fn default_did_method() -> String {
    "indy".into()
}
fn default_did_namespace() -> String {
    "bcovrin:test".into()
}
fn default_call_timeout_secs() -> u64 {
    30
}
fn default_event_channel_capacity() -> usize {
    256
}
fn default_schema_name() -> String {
    "Conference Ticket".into()
}
fn default_schema_version() -> String {
    "1.0.1".into()
}
fn default_attribute_names() -> Vec<String> {
    ["Name", "Surname", "Date of Birth", "Event Name", "Event Year"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_credential_definition_tag() -> String {
    "default".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: default_backend(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            did_method: default_did_method(),
            did_namespace: default_did_namespace(),
            call_timeout_secs: default_call_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            schema_name: default_schema_name(),
            schema_version: default_schema_version(),
            attribute_names: default_attribute_names(),
            credential_definition_tag: default_credential_definition_tag(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AgentConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs.max(1))
    }
}

impl AttestorConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: AttestorConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Socket address string for the HTTP API.
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.listen_addr, self.api.port)
    }
}
