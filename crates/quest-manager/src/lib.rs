//! Per-chain quest managers for the quest dispatcher.
//!
//! A manager knows one chain family's quest program: which calls fund a
//! quest, how arguments are encoded, and how the program reports failure.
//! Managers report progress on the attempt's `StepReporter` and surface
//! revert reasons as the failing step's message.
//!
//! Which manager serves which chain is decided by configuration through the
//! implementation registry at the bottom of this module.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use quest_account::{AccountError, WalletSession};
use quest_delivery::{ConfirmationPolicy, DeliveryError};
use quest_types::{
	ChainConfig, ChainType, ConfigSchema, CreateQuestResult, Field, FieldType,
	ImplementationRegistry, StepKind, StepReporter,
};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm;
	pub mod solana;
	pub mod unimplemented;
}

pub use implementations::evm::EvmQuestManager;
pub use implementations::solana::{SolanaQuestManager, MAX_QUEST_ID_LENGTH};

/// Errors that can occur during quest manager operations.
#[derive(Debug, Error)]
pub enum ManagerError {
	/// Wallet missing or key material unusable.
	#[error(transparent)]
	Account(#[from] AccountError),
	/// Transport failure or confirmation timeout.
	#[error(transparent)]
	Delivery(DeliveryError),
	/// The quest program rejected the transaction.
	#[error("{reason}")]
	Reverted { code: Option<u32>, reason: String },
	/// The request cannot be encoded for this chain.
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	/// The chain returned data the manager cannot interpret.
	#[error("Unexpected response: {0}")]
	UnexpectedResponse(String),
	/// The manager table or chain metadata is unusable.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl From<DeliveryError> for ManagerError {
	fn from(err: DeliveryError) -> Self {
		match err {
			DeliveryError::Reverted { code, reason } => ManagerError::Reverted { code, reason },
			other => ManagerError::Delivery(other),
		}
	}
}

/// Request to create a quest on an EVM chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmQuestRequest {
	pub quest_id: String,
	pub token: Address,
	pub amount: U256,
	pub deadline: U256,
	pub max_winners: U256,
}

/// Request to create a quest on a Solana cluster, in the program's native
/// integer widths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolanaQuestRequest {
	pub quest_id: String,
	pub token_mint: Pubkey,
	pub amount: u64,
	pub deadline: i64,
	pub max_winners: u32,
}

/// Interface of an EVM quest manager: ERC-20 approval followed by a call to
/// the quest contract.
#[async_trait]
pub trait EvmQuestInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Whether the connected wallet has approved at least `amount` of
	/// `token` to the quest contract. Read only.
	async fn check_allowance(&self, token: Address, amount: U256) -> Result<bool, ManagerError>;

	/// Approves exactly `amount` of `token` to the quest contract and waits
	/// for confirmation. Reports the "Token Approval" step.
	async fn approve_tokens(
		&self,
		token: Address,
		amount: U256,
		reporter: &StepReporter,
	) -> Result<(), ManagerError>;

	/// Submits the quest creation call and waits for confirmation. Reports
	/// the "Quest Creation" step. Allowance must already be in place.
	async fn create_quest(
		&self,
		request: &EvmQuestRequest,
		reporter: &StepReporter,
	) -> Result<CreateQuestResult, ManagerError>;
}

/// Interface of a Solana quest manager: a single instruction that creates
/// the quest account and moves the reward into escrow.
#[async_trait]
pub trait SolanaQuestInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Submits the quest creation instruction and waits for confirmation.
	/// Reports the "Quest Creation" step.
	async fn create_quest(
		&self,
		request: &SolanaQuestRequest,
		reporter: &StepReporter,
	) -> Result<CreateQuestResult, ManagerError>;
}

/// The manager serving one chain.
#[derive(Clone)]
pub enum ChainManager {
	Evm(Arc<dyn EvmQuestInterface>),
	Solana(Arc<dyn SolanaQuestInterface>),
	/// The chain is registered but quests cannot be created on it yet.
	Unimplemented { reason: String },
}

impl std::fmt::Debug for ChainManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ChainManager::Evm(_) => f.write_str("ChainManager::Evm"),
			ChainManager::Solana(_) => f.write_str("ChainManager::Solana"),
			ChainManager::Unimplemented { reason } => f
				.debug_struct("ChainManager::Unimplemented")
				.field("reason", reason)
				.finish(),
		}
	}
}

impl ChainManager {
	/// Placeholder for a registered chain with no configured manager.
	pub fn coming_soon(chain: &ChainConfig) -> Self {
		ChainManager::Unimplemented {
			reason: format!("{} quests are coming soon", chain.name),
		}
	}

	/// Chain family served, or `None` for placeholders.
	pub fn chain_type(&self) -> Option<ChainType> {
		match self {
			ChainManager::Evm(_) => Some(ChainType::Evm),
			ChainManager::Solana(_) => Some(ChainType::Solana),
			ChainManager::Unimplemented { .. } => None,
		}
	}
}

/// What a factory needs besides its own configuration table.
pub struct ManagerContext<'a> {
	pub chain: &'a ChainConfig,
	pub wallet: &'a WalletSession,
	pub policy: ConfirmationPolicy,
}

/// Type alias for manager factory functions.
pub type ManagerFactory = fn(&toml::Value, &ManagerContext<'_>) -> Result<ChainManager, ManagerError>;

/// Registry trait for manager implementations.
pub trait ManagerRegistry: ImplementationRegistry<Factory = ManagerFactory> {}

/// Get all registered manager implementations.
///
/// Returns a vector of (name, factory) tuples used by the dispatcher builder
/// to resolve the `implementation` key of each `[managers.<chain>]` table.
pub fn get_all_implementations() -> Vec<(&'static str, ManagerFactory)> {
	use implementations::{evm, solana, unimplemented};

	vec![
		(evm::Registry::NAME, evm::Registry::factory()),
		(solana::Registry::NAME, solana::Registry::factory()),
		(unimplemented::Registry::NAME, unimplemented::Registry::factory()),
	]
}

/// Marks `kind` as failed with the error text and hands the error back.
pub(crate) fn fail<T>(
	reporter: &StepReporter,
	kind: StepKind,
	err: ManagerError,
) -> Result<T, ManagerError> {
	reporter.error(kind, err.to_string());
	Err(err)
}

/// Optional per-chain override of the dispatcher's confirmation timeout.
pub(crate) fn confirmation_timeout_field() -> Field {
	Field::new(
		"confirmation_timeout_seconds",
		FieldType::Integer {
			min: Some(1),
			max: Some(3600),
		},
	)
}

/// Confirmation policy for one manager: the dispatcher-wide policy with the
/// table's `confirmation_timeout_seconds` applied. The poll interval never
/// exceeds the timeout.
pub(crate) fn manager_policy(config: &toml::Value, ctx: &ManagerContext<'_>) -> ConfirmationPolicy {
	let mut policy = ctx.policy;
	if let Some(seconds) = config
		.get("confirmation_timeout_seconds")
		.and_then(|v| v.as_integer())
		.and_then(|v| u64::try_from(v).ok())
	{
		policy.timeout = Duration::from_secs(seconds);
		policy.poll_interval = policy.poll_interval.min(policy.timeout);
	}
	policy
}

/// Fails unless `chain` belongs to `expected`.
pub(crate) fn require_family(
	chain: &ChainConfig,
	expected: ChainType,
	implementation: &str,
) -> Result<(), ManagerError> {
	if chain.chain_type != expected {
		return Err(ManagerError::Configuration(format!(
			"Implementation '{}' only supports {} chains, but '{}' is {}",
			implementation, expected, chain.id, chain.chain_type
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_program_revert_becomes_manager_revert() {
		let err: ManagerError = DeliveryError::Reverted {
			code: Some(6001),
			reason: "x".into(),
		}
		.into();
		assert!(matches!(err, ManagerError::Reverted { code: Some(6001), .. }));

		let err: ManagerError = DeliveryError::Timeout {
			tx: "abc".into(),
			waited_secs: 5,
		}
		.into();
		assert!(matches!(err, ManagerError::Delivery(_)));
	}

	#[test]
	fn test_manager_policy_override() {
		let chain = base_chain();
		let wallet = WalletSession::default();
		let ctx = ManagerContext {
			chain: &chain,
			wallet: &wallet,
			policy: ConfirmationPolicy {
				poll_interval: Duration::from_secs(5),
				timeout: Duration::from_secs(120),
			},
		};

		let table: toml::Value = toml::from_str("implementation = \"evm_alloy\"").unwrap();
		assert_eq!(manager_policy(&table, &ctx), ctx.policy);

		let table: toml::Value = toml::from_str("confirmation_timeout_seconds = 3").unwrap();
		let policy = manager_policy(&table, &ctx);
		assert_eq!(policy.timeout, Duration::from_secs(3));
		assert_eq!(policy.poll_interval, Duration::from_secs(3));
	}

	fn base_chain() -> ChainConfig {
		ChainConfig {
			id: "base-mainnet".into(),
			name: "Base".into(),
			chain_type: ChainType::Evm,
			native_currency: quest_types::NativeCurrency::new("ETH", 18),
			is_testnet: false,
			rpc_url: "https://mainnet.base.org".into(),
			evm_chain_id: Some(8453),
			explorer_url: None,
		}
	}

	#[test]
	fn test_all_implementations_registered() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["evm_alloy", "solana_rpc", "unimplemented"]);
	}
}
