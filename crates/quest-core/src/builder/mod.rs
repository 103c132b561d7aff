//! Builder for constructing the quest dispatcher.
//!
//! Resolves every registered chain to a manager using the factory named by
//! its `[managers.<chain>]` table. Chains without a table are served as
//! "coming soon" so the dispatcher never assumes a registered chain is
//! operational.

use crate::{EventBus, QuestDispatcher};
use quest_account::WalletSession;
use quest_config::Config;
use quest_delivery::ConfirmationPolicy;
use quest_manager::{ChainManager, ManagerContext, ManagerError};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during dispatcher construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Builder for constructing a QuestDispatcher with pluggable managers.
pub struct DispatcherBuilder {
	config: Config,
}

impl DispatcherBuilder {
	/// Creates a new DispatcherBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the dispatcher, creating one manager per registered chain.
	pub fn build<MF>(
		self,
		manager_factories: &HashMap<String, MF>,
	) -> Result<QuestDispatcher, BuilderError>
	where
		MF: Fn(&toml::Value, &ManagerContext<'_>) -> Result<ChainManager, ManagerError>,
	{
		let registry = self
			.config
			.registry()
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		let wallet = WalletSession::from_keys(
			self.config.wallet.evm_private_key.as_ref(),
			self.config.wallet.solana_secret_key.as_ref(),
		)
		.map_err(|e| BuilderError::Config(format!("Failed to load wallet: {}", e)))?;

		let policy = ConfirmationPolicy {
			poll_interval: self.config.dispatcher.poll_interval(),
			timeout: self.config.dispatcher.confirmation_timeout(),
		};

		let mut managers = HashMap::new();
		for chain in registry.available_chains() {
			let Some(table) = self.config.managers.get(&chain.id) else {
				tracing::info!(
					component = "manager",
					chain_id = %chain.id,
					implementation = "unimplemented",
					"Loaded"
				);
				managers.insert(chain.id.clone(), ChainManager::coming_soon(chain));
				continue;
			};

			let name = table
				.get("implementation")
				.and_then(|v| v.as_str())
				.ok_or_else(|| {
					BuilderError::MissingComponent(format!(
						"implementation for chain '{}'",
						chain.id
					))
				})?;
			let factory = manager_factories.get(name).ok_or_else(|| {
				BuilderError::Config(format!(
					"Unknown manager implementation '{}' for chain '{}'",
					name, chain.id
				))
			})?;

			let context = ManagerContext {
				chain,
				wallet: &wallet,
				policy,
			};
			match factory(table, &context) {
				Ok(manager) => {
					tracing::info!(
						component = "manager",
						chain_id = %chain.id,
						implementation = %name,
						wallet_connected = wallet.is_connected(chain.chain_type),
						"Loaded"
					);
					managers.insert(chain.id.clone(), manager);
				},
				Err(e) => {
					tracing::error!(
						component = "manager",
						chain_id = %chain.id,
						implementation = %name,
						error = %e,
						"Failed to create manager"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create manager '{}' for chain '{}': {}",
						name, chain.id, e
					)));
				},
			}
		}

		let event_bus = EventBus::new(self.config.dispatcher.event_capacity);
		Ok(QuestDispatcher::new(registry, managers, event_bus))
	}
}
