//! Configuration module for the quest dispatcher.
//!
//! This module loads the dispatcher configuration from TOML, resolves
//! environment variables, validates every section, and exposes the chain
//! configuration registry the dispatcher routes by.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["chains.toml", "managers.toml"]` to include other files
//! - Each top-level section must be unique across all files

pub mod builders;
mod loader;
pub mod registry;

pub use builders::config::ConfigBuilder;
pub use registry::{ChainOverride, ChainRegistry, RegistryError};

use quest_types::SecretString;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
	#[error("Registry error: {0}")]
	Registry(#[from] RegistryError),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the quest dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Dispatcher identity and timing.
	pub dispatcher: DispatcherConfig,
	/// Overrides for built-in chain metadata, keyed by chain id.
	#[serde(default)]
	pub chains: HashMap<String, ChainOverride>,
	/// Per-chain manager tables, keyed by chain id. Each table carries an
	/// `implementation` key plus implementation-specific settings.
	#[serde(default)]
	pub managers: HashMap<String, toml::Value>,
	/// Wallet key material.
	#[serde(default)]
	pub wallet: WalletConfig,
}

/// Dispatcher identity and timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatcherConfig {
	/// Identifier used in logs.
	pub id: String,
	/// Upper bound on waiting for a transaction to confirm.
	#[serde(default = "default_confirmation_timeout_seconds")]
	pub confirmation_timeout_seconds: u64,
	/// Interval between confirmation polls.
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
	/// Buffered progress events per subscriber.
	#[serde(default = "default_event_capacity")]
	pub event_capacity: usize,
}

impl DispatcherConfig {
	pub fn confirmation_timeout(&self) -> Duration {
		Duration::from_secs(self.confirmation_timeout_seconds)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_seconds)
	}
}

fn default_confirmation_timeout_seconds() -> u64 {
	120
}

fn default_poll_interval_seconds() -> u64 {
	2
}

fn default_event_capacity() -> usize {
	256
}

/// Wallet key material. Either key may be absent, in which case the
/// corresponding chain family reports "no wallet connected".
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WalletConfig {
	/// Hex encoded secp256k1 private key for EVM chains.
	pub evm_private_key: Option<SecretString>,
	/// Base58 encoded 64 byte ed25519 keypair for Solana clusters.
	pub solana_secret_key: Option<SecretString>,
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME` and supports defaults
/// with `${VAR_NAME:-default}`. Input is capped at 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Builds the chain registry with this configuration's overrides applied.
	pub fn registry(&self) -> Result<ChainRegistry, ConfigError> {
		Ok(ChainRegistry::builtin().with_overrides(&self.chains)?)
	}

	/// Validates every section.
	///
	/// - Dispatcher id is not empty and timing values are in range
	/// - Chain overrides and manager tables only reference registered chains
	/// - Manager tables name an implementation
	/// - Wallet keys, when present, are not blank
	fn validate(&self) -> Result<(), ConfigError> {
		if self.dispatcher.id.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Dispatcher id cannot be empty".into(),
			));
		}

		let timeout = self.dispatcher.confirmation_timeout_seconds;
		if timeout == 0 || timeout > 3600 {
			return Err(ConfigError::Validation(
				"confirmation_timeout_seconds must be between 1 and 3600".into(),
			));
		}
		let poll = self.dispatcher.poll_interval_seconds;
		if poll == 0 || poll > timeout {
			return Err(ConfigError::Validation(format!(
				"poll_interval_seconds must be between 1 and confirmation_timeout_seconds ({})",
				timeout
			)));
		}
		if self.dispatcher.event_capacity == 0 {
			return Err(ConfigError::Validation(
				"event_capacity must be at least 1".into(),
			));
		}

		let registry = self.registry()?;

		for (chain_id, manager) in &self.managers {
			if !registry.contains(chain_id) {
				return Err(ConfigError::Validation(format!(
					"Manager configured for unknown chain '{}'",
					chain_id
				)));
			}
			let implementation = manager
				.get("implementation")
				.and_then(|v| v.as_str())
				.ok_or_else(|| {
					ConfigError::Validation(format!(
						"Manager for chain '{}' missing 'implementation' field",
						chain_id
					))
				})?;
			if implementation.trim().is_empty() {
				return Err(ConfigError::Validation(format!(
					"Manager for chain '{}' has an empty implementation name",
					chain_id
				)));
			}
		}

		if self
			.wallet
			.evm_private_key
			.as_ref()
			.is_some_and(|k| k.is_empty())
		{
			return Err(ConfigError::Validation(
				"wallet.evm_private_key is set but empty".into(),
			));
		}
		if self
			.wallet
			.solana_secret_key
			.as_ref()
			.is_some_and(|k| k.is_empty())
		{
			return Err(ConfigError::Validation(
				"wallet.solana_secret_key is set but empty".into(),
			));
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string, resolving environment variables
/// and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
