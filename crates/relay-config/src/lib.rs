//! Configuration for the tap relay service.
//!
//! Configuration loads from a single TOML file. `${ENV_VAR}` placeholders
//! are substituted from the environment before parsing, which is how the
//! relayer signing key reaches the process without ever touching disk.
//! A placeholder with no matching environment variable substitutes to an
//! empty string and logs a warning, so a missing relayer key degrades to
//! a per-request configuration error instead of refusing to start.

use regex::Regex;
use relay_types::{AuthDomain, NetworkConfig, SecretString};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration for the relay service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Relay identity and signing-domain settings.
	pub relay: RelayConfig,
	/// Active network and contract addresses.
	pub network: NetworkConfig,
	/// Storage backend selection.
	pub storage: StorageConfig,
	/// Relayer account settings.
	#[serde(default)]
	pub account: AccountConfig,
	/// HTTP API server settings.
	#[serde(default)]
	pub api: ApiConfig,
}

/// Relay identity and the EIP-712 signing domain.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
	/// Instance identifier used in logs.
	pub id: String,
	/// EIP-712 domain name the settlement contract verifies against.
	pub domain_name: String,
	/// EIP-712 domain version.
	#[serde(default = "default_domain_version")]
	pub domain_version: String,
	/// Time-to-live for payment requests, in seconds.
	#[serde(default = "default_request_ttl_seconds")]
	pub request_ttl_seconds: u64,
	/// Base URL used when building settle links for payment requests.
	#[serde(default = "default_public_base_url")]
	pub public_base_url: String,
}

fn default_domain_version() -> String {
	"1".to_string()
}

/// Payment requests live for 24 hours by default.
fn default_request_ttl_seconds() -> u64 {
	86_400
}

fn default_public_base_url() -> String {
	"http://localhost:3000".to_string()
}

/// Storage backend selection.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
	/// Which backend to use: "memory" or "file".
	pub backend: String,
	/// Data directory for the file backend.
	#[serde(default)]
	pub path: Option<String>,
}

/// Relayer account settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountConfig {
	/// The relayer's hot-wallet private key, normally supplied as
	/// `"${RELAYER_PRIVATE_KEY}"`. Empty or absent means unconfigured.
	#[serde(default)]
	pub private_key: Option<SecretString>,
}

impl AccountConfig {
	/// The configured signing key, if a non-empty one was provided.
	pub fn signing_key(&self) -> Option<&SecretString> {
		self.private_key.as_ref().filter(|key| !key.is_empty())
	}
}

/// HTTP API server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
	/// Bind host.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Bind port.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			host: default_api_host(),
			port: default_api_port(),
		}
	}
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

impl Config {
	/// Loads configuration from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path)?;
		Self::from_toml_str(&raw)
	}

	/// Parses configuration from TOML text after environment substitution.
	pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
		let substituted = substitute_env_vars(raw);
		let config: Config = toml::from_str(&substituted)?;
		config.validate()?;
		Ok(config)
	}

	/// The signing domain all authorizations are bound to.
	pub fn auth_domain(&self) -> AuthDomain {
		AuthDomain {
			name: self.relay.domain_name.clone(),
			version: self.relay.domain_version.clone(),
			chain_id: self.network.chain_id,
			verifying_contract: self.network.settlement_address,
		}
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.relay.id.is_empty() {
			return Err(ConfigError::Validation("relay.id must not be empty".into()));
		}
		if self.relay.domain_name.is_empty() {
			return Err(ConfigError::Validation(
				"relay.domain_name must not be empty".into(),
			));
		}
		if self.network.rpc_url.is_empty() {
			return Err(ConfigError::Validation(
				"network.rpc_url must not be empty".into(),
			));
		}
		if self.network.chain_id == 0 {
			return Err(ConfigError::Validation(
				"network.chain_id must be nonzero".into(),
			));
		}
		if self.relay.request_ttl_seconds == 0 {
			return Err(ConfigError::Validation(
				"relay.request_ttl_seconds must be positive".into(),
			));
		}
		match self.storage.backend.as_str() {
			"memory" => {}
			"file" => {
				if self.storage.path.as_deref().unwrap_or("").is_empty() {
					return Err(ConfigError::Validation(
						"storage.path is required for the file backend".into(),
					));
				}
			}
			other => {
				return Err(ConfigError::Validation(format!(
					"unknown storage backend: {}",
					other
				)));
			}
		}
		Ok(())
	}
}

/// Replaces `${VAR}` placeholders with environment values.
///
/// Unset variables substitute to an empty string so the config still
/// parses; downstream code treats the empty value as unconfigured.
fn substitute_env_vars(raw: &str) -> String {
	let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static pattern");
	pattern
		.replace_all(raw, |caps: &regex::Captures| {
			let name = &caps[1];
			match std::env::var(name) {
				Ok(value) => value,
				Err(_) => {
					tracing::warn!(var = name, "environment variable not set, substituting empty");
					String::new()
				}
			}
		})
		.into_owned()
}
