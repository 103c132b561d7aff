//! Chain configuration registry.
//!
//! Static lookup table from chain id to network metadata. The registry is
//! built once at startup and is read-only afterwards, so lookups never do
//! network I/O and are safe from any task.

use quest_types::{ChainConfig, ChainType, NativeCurrency};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised by registry construction and lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
	/// No chain is registered under the requested id.
	#[error("Chain '{0}' not found")]
	NotFound(String),
	/// An override carries an unusable value.
	#[error("Invalid override for chain '{chain}': {message}")]
	InvalidOverride { chain: String, message: String },
}

/// Per-chain overrides accepted from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChainOverride {
	pub rpc_url: Option<String>,
	pub explorer_url: Option<String>,
}

/// Ordered, immutable set of supported chains.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
	chains: Vec<ChainConfig>,
}

impl Default for ChainRegistry {
	fn default() -> Self {
		Self::builtin()
	}
}

fn evm_chain(
	id: &str,
	name: &str,
	evm_chain_id: u64,
	symbol: &str,
	rpc_url: &str,
	explorer_url: &str,
) -> ChainConfig {
	ChainConfig {
		id: id.to_string(),
		name: name.to_string(),
		chain_type: ChainType::Evm,
		native_currency: NativeCurrency::new(symbol, 18),
		is_testnet: false,
		rpc_url: rpc_url.to_string(),
		evm_chain_id: Some(evm_chain_id),
		explorer_url: Some(explorer_url.to_string()),
	}
}

fn solana_cluster(id: &str, name: &str, is_testnet: bool, rpc_url: &str) -> ChainConfig {
	ChainConfig {
		id: id.to_string(),
		name: name.to_string(),
		chain_type: ChainType::Solana,
		native_currency: NativeCurrency::new("SOL", 9),
		is_testnet,
		rpc_url: rpc_url.to_string(),
		evm_chain_id: None,
		explorer_url: Some("https://explorer.solana.com".to_string()),
	}
}

impl ChainRegistry {
	/// The chains supported out of the box, in chain-picker order.
	pub fn builtin() -> Self {
		Self {
			chains: vec![
				evm_chain(
					"base-mainnet",
					"Base",
					8453,
					"ETH",
					"https://mainnet.base.org",
					"https://basescan.org",
				),
				evm_chain(
					"ethereum-mainnet",
					"Ethereum",
					1,
					"ETH",
					"https://eth.llamarpc.com",
					"https://etherscan.io",
				),
				evm_chain(
					"polygon-mainnet",
					"Polygon",
					137,
					"POL",
					"https://polygon-rpc.com",
					"https://polygonscan.com",
				),
				solana_cluster(
					"solana-mainnet",
					"Solana",
					false,
					"https://api.mainnet-beta.solana.com",
				),
				solana_cluster(
					"solana-devnet",
					"Solana Devnet",
					true,
					"https://api.devnet.solana.com",
				),
			],
		}
	}

	/// Applies configuration overrides to existing entries.
	///
	/// Overrides may only target registered chains; they cannot add entries.
	pub fn with_overrides(
		mut self,
		overrides: &HashMap<String, ChainOverride>,
	) -> Result<Self, RegistryError> {
		for (chain_id, chain_override) in overrides {
			let chain = self
				.chains
				.iter_mut()
				.find(|c| &c.id == chain_id)
				.ok_or_else(|| RegistryError::NotFound(chain_id.clone()))?;

			if let Some(rpc_url) = &chain_override.rpc_url {
				if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
					return Err(RegistryError::InvalidOverride {
						chain: chain_id.clone(),
						message: format!("rpc_url must be an http(s) URL, got '{}'", rpc_url),
					});
				}
				chain.rpc_url = rpc_url.clone();
			}
			if let Some(explorer_url) = &chain_override.explorer_url {
				chain.explorer_url = Some(explorer_url.clone());
			}
			tracing::debug!(chain_id = %chain_id, "Applied chain override");
		}
		Ok(self)
	}

	/// All registered chains in stable order.
	pub fn available_chains(&self) -> &[ChainConfig] {
		&self.chains
	}

	/// Looks up a chain by id.
	pub fn chain_config(&self, chain_id: &str) -> Result<&ChainConfig, RegistryError> {
		self.chains
			.iter()
			.find(|c| c.id == chain_id)
			.ok_or_else(|| RegistryError::NotFound(chain_id.to_string()))
	}

	pub fn contains(&self, chain_id: &str) -> bool {
		self.chains.iter().any(|c| c.id == chain_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_every_registered_id_round_trips() {
		let registry = ChainRegistry::builtin();
		for chain in registry.available_chains() {
			let found = registry.chain_config(&chain.id).unwrap();
			assert_eq!(found.id, chain.id);
		}
	}

	#[test]
	fn test_unknown_chain_not_found() {
		let registry = ChainRegistry::builtin();
		assert_eq!(
			registry.chain_config("made-up-chain").unwrap_err(),
			RegistryError::NotFound("made-up-chain".to_string())
		);
		assert!(!registry.contains("made-up-chain"));
	}

	#[test]
	fn test_stable_order() {
		let ids: Vec<_> = ChainRegistry::builtin()
			.available_chains()
			.iter()
			.map(|c| c.id.clone())
			.collect();
		assert_eq!(
			ids,
			vec![
				"base-mainnet",
				"ethereum-mainnet",
				"polygon-mainnet",
				"solana-mainnet",
				"solana-devnet"
			]
		);
	}

	#[test]
	fn test_builtin_chain_families() {
		let registry = ChainRegistry::builtin();
		let base = registry.chain_config("base-mainnet").unwrap();
		assert_eq!(base.chain_type, ChainType::Evm);
		assert_eq!(base.evm_chain_id, Some(8453));

		let devnet = registry.chain_config("solana-devnet").unwrap();
		assert_eq!(devnet.chain_type, ChainType::Solana);
		assert!(devnet.is_testnet);
		assert_eq!(devnet.native_currency.decimals, 9);
	}

	#[test]
	fn test_override_rejects_non_http_url() {
		let mut overrides = HashMap::new();
		overrides.insert(
			"base-mainnet".to_string(),
			ChainOverride {
				rpc_url: Some("ws://localhost:8546".to_string()),
				explorer_url: None,
			},
		);
		let err = ChainRegistry::builtin()
			.with_overrides(&overrides)
			.unwrap_err();
		assert!(err.to_string().contains("http(s)"));
	}
}
