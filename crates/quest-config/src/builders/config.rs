//! Configuration builder for tests and local development.
//!
//! Produces a `Config` without touching the filesystem. Manager tables are
//! added per chain the same way they would appear under `[managers.<id>]`.

use crate::{ChainOverride, Config, DispatcherConfig, WalletConfig};
use quest_types::SecretString;
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	dispatcher_id: String,
	confirmation_timeout_seconds: u64,
	poll_interval_seconds: u64,
	event_capacity: usize,
	chains: HashMap<String, ChainOverride>,
	managers: HashMap<String, toml::Value>,
	wallet: WalletConfig,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a builder with short timings suited to tests.
	pub fn new() -> Self {
		Self {
			dispatcher_id: "test-dispatcher".to_string(),
			confirmation_timeout_seconds: 30,
			poll_interval_seconds: 1,
			event_capacity: 64,
			chains: HashMap::new(),
			managers: HashMap::new(),
			wallet: WalletConfig::default(),
		}
	}

	pub fn dispatcher_id(mut self, id: impl Into<String>) -> Self {
		self.dispatcher_id = id.into();
		self
	}

	pub fn confirmation_timeout_seconds(mut self, seconds: u64) -> Self {
		self.confirmation_timeout_seconds = seconds;
		self
	}

	pub fn poll_interval_seconds(mut self, seconds: u64) -> Self {
		self.poll_interval_seconds = seconds;
		self
	}

	pub fn event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}

	/// Points a registered chain at a different RPC endpoint.
	pub fn rpc_url(mut self, chain_id: impl Into<String>, url: impl Into<String>) -> Self {
		self.chains.entry(chain_id.into()).or_default().rpc_url = Some(url.into());
		self
	}

	/// Adds a manager table for a chain. `settings` must be a TOML table;
	/// its `implementation` key is overwritten with `implementation`.
	pub fn manager(
		mut self,
		chain_id: impl Into<String>,
		implementation: &str,
		settings: toml::Value,
	) -> Self {
		let mut table = match settings {
			toml::Value::Table(table) => table,
			_ => toml::Table::new(),
		};
		table.insert(
			"implementation".to_string(),
			toml::Value::String(implementation.to_string()),
		);
		self.managers
			.insert(chain_id.into(), toml::Value::Table(table));
		self
	}

	pub fn evm_private_key(mut self, key: impl Into<SecretString>) -> Self {
		self.wallet.evm_private_key = Some(key.into());
		self
	}

	pub fn solana_secret_key(mut self, key: impl Into<SecretString>) -> Self {
		self.wallet.solana_secret_key = Some(key.into());
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		Config {
			dispatcher: DispatcherConfig {
				id: self.dispatcher_id,
				confirmation_timeout_seconds: self.confirmation_timeout_seconds,
				poll_interval_seconds: self.poll_interval_seconds,
				event_capacity: self.event_capacity,
			},
			chains: self.chains,
			managers: self.managers,
			wallet: self.wallet,
		}
	}
}
