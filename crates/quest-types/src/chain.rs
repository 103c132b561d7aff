//! Chain metadata types.
//!
//! A `ChainConfig` identifies one deployable network. The set of configs is
//! fixed when the registry is built and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain family tag.
///
/// Every chain the dispatcher knows about belongs to exactly one family, and
/// the family decides which calling convention (approve-then-create or direct
/// transfer) is used for quest funding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainType {
	/// Ethereum Virtual Machine compatible chains (Base, Ethereum, Polygon).
	Evm,
	/// Solana clusters.
	Solana,
}

impl fmt::Display for ChainType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChainType::Evm => write!(f, "EVM"),
			ChainType::Solana => write!(f, "SOLANA"),
		}
	}
}

/// Native currency of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
	pub symbol: String,
	pub decimals: u8,
}

impl NativeCurrency {
	pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
		Self {
			symbol: symbol.into(),
			decimals,
		}
	}
}

/// Configuration for a single supported network.
///
/// # Fields
///
/// * `id` - Unique registry key, e.g. `base-mainnet`
/// * `name` - Human readable name shown in chain pickers
/// * `chain_type` - Chain family used for dispatch
/// * `native_currency` - Symbol and decimals of the gas token
/// * `is_testnet` - Whether the network holds no real value
/// * `rpc_url` - JSON-RPC (EVM) or Solana RPC endpoint
/// * `evm_chain_id` - EIP-155 chain id, only set for EVM networks
/// * `explorer_url` - Optional block explorer base URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
	pub id: String,
	pub name: String,
	#[serde(rename = "type")]
	pub chain_type: ChainType,
	pub native_currency: NativeCurrency,
	pub is_testnet: bool,
	pub rpc_url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub evm_chain_id: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub explorer_url: Option<String>,
}

impl ChainConfig {
	/// Builds an explorer link for a transaction hash or signature, if the
	/// chain has an explorer configured.
	pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
		let base = self.explorer_url.as_deref()?.trim_end_matches('/');
		match self.chain_type {
			ChainType::Evm => Some(format!("{}/tx/{}", base, tx_hash)),
			ChainType::Solana => {
				let cluster = if self.is_testnet { "?cluster=devnet" } else { "" };
				Some(format!("{}/tx/{}{}", base, tx_hash, cluster))
			},
		}
	}
}
