//! EVM quest manager.
//!
//! Funding a quest on an EVM chain takes two transactions: an ERC-20
//! `approve` of the reward to the quest contract, then `createQuest`, which
//! pulls the reward into the contract. Quest state lives in the contract
//! keyed by quest id, so results carry no account address.

use crate::{
	confirmation_timeout_field, fail, manager_policy, require_family, ChainManager,
	EvmQuestInterface, EvmQuestRequest, ManagerContext, ManagerError,
};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use async_trait::async_trait;
use quest_account::AccountError;
use quest_delivery::{AlloyEvmClient, EvmClient, EvmReceipt};
use quest_types::{
	without_0x_prefix, ChainConfig, ChainType, ConfigSchema, CreateQuestResult, Field, FieldType,
	ImplementationRegistry, Schema, StepKind, StepReporter, ValidationError,
};
use std::sync::Arc;

sol! {
	interface IERC20 {
		function approve(address spender, uint256 amount) external returns (bool);
		function allowance(address owner, address spender) external view returns (uint256);
	}

	interface IQuestManager {
		function createQuest(
			string questId,
			address token,
			uint256 amount,
			uint256 deadline,
			uint256 maxWinners
		) external;
	}
}

/// Quest manager for one EVM chain.
pub struct EvmQuestManager {
	chain: ChainConfig,
	quest_contract: Address,
	/// Absent when no EVM wallet is connected.
	client: Option<Arc<dyn EvmClient>>,
}

impl EvmQuestManager {
	pub fn new(
		chain: ChainConfig,
		quest_contract: Address,
		client: Option<Arc<dyn EvmClient>>,
	) -> Self {
		Self {
			chain,
			quest_contract,
			client,
		}
	}

	fn client(&self) -> Result<&Arc<dyn EvmClient>, ManagerError> {
		self.client
			.as_ref()
			.ok_or(ManagerError::Account(AccountError::NotConnected(ChainType::Evm)))
	}

	async fn send(
		&self,
		client: &Arc<dyn EvmClient>,
		to: Address,
		input: Vec<u8>,
	) -> Result<EvmReceipt, ManagerError> {
		let tx_hash = client.submit(to, Bytes::from(input)).await?;
		Ok(client.wait_for_receipt(tx_hash).await?)
	}

	fn confirmation_message(&self, receipt: &EvmReceipt) -> String {
		let hash = receipt.tx_hash.to_string();
		match self.chain.explorer_tx_url(&hash) {
			Some(url) => format!("Confirmed in block {}: {}", receipt.block_number, url),
			None => format!("Confirmed in block {}: {}", receipt.block_number, hash),
		}
	}
}

#[async_trait]
impl EvmQuestInterface for EvmQuestManager {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(EvmQuestSchema)
	}

	async fn check_allowance(&self, token: Address, amount: U256) -> Result<bool, ManagerError> {
		let client = self.client()?;
		let call = IERC20::allowanceCall {
			owner: client.account(),
			spender: self.quest_contract,
		};
		let data = client.call(token, Bytes::from(call.abi_encode())).await?;
		let allowance = IERC20::allowanceCall::abi_decode_returns(&data, true)
			.map_err(|e| ManagerError::UnexpectedResponse(format!("allowance(): {}", e)))?
			._0;

		tracing::debug!(
			chain_id = %self.chain.id,
			token = %token,
			allowance = %allowance,
			required = %amount,
			"Checked allowance"
		);
		Ok(allowance >= amount)
	}

	async fn approve_tokens(
		&self,
		token: Address,
		amount: U256,
		reporter: &StepReporter,
	) -> Result<(), ManagerError> {
		let client = match self.client() {
			Ok(client) => client,
			Err(e) => return fail(reporter, StepKind::TokenApproval, e),
		};

		reporter.processing(StepKind::TokenApproval);
		let call = IERC20::approveCall {
			spender: self.quest_contract,
			amount,
		};
		match self.send(client, token, call.abi_encode()).await {
			Ok(receipt) => {
				reporter.success(
					StepKind::TokenApproval,
					Some(self.confirmation_message(&receipt)),
				);
				Ok(())
			},
			Err(e) => fail(reporter, StepKind::TokenApproval, e),
		}
	}

	async fn create_quest(
		&self,
		request: &EvmQuestRequest,
		reporter: &StepReporter,
	) -> Result<CreateQuestResult, ManagerError> {
		let client = match self.client() {
			Ok(client) => client,
			Err(e) => return fail(reporter, StepKind::QuestCreation, e),
		};

		reporter.processing(StepKind::QuestCreation);
		let call = IQuestManager::createQuestCall {
			questId: request.quest_id.clone(),
			token: request.token,
			amount: request.amount,
			deadline: request.deadline,
			maxWinners: request.max_winners,
		};
		match self.send(client, self.quest_contract, call.abi_encode()).await {
			Ok(receipt) => {
				reporter.success(
					StepKind::QuestCreation,
					Some(self.confirmation_message(&receipt)),
				);
				Ok(CreateQuestResult {
					tx_hash: receipt.tx_hash.to_string(),
					quest_account_address: None,
				})
			},
			Err(e) => fail(reporter, StepKind::QuestCreation, e),
		}
	}
}

/// Configuration schema for the EVM manager.
///
/// ```toml
/// [managers.base-mainnet]
/// implementation = "evm_alloy"
/// quest_contract = "0x..."
/// ```
pub struct EvmQuestSchema;

impl EvmQuestSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for EvmQuestSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("quest_contract", FieldType::String).with_validator(|value| {
					let addr = value.as_str().unwrap_or_default();
					let hex = without_0x_prefix(addr);
					if addr.len() != hex.len() + 2 || hex.len() != 40 {
						return Err("quest_contract must be a 0x-prefixed 20 byte address".into());
					}
					if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
						return Err("quest_contract must be hex encoded".into());
					}
					Ok(())
				}),
			],
			vec![
				Field::new("implementation", FieldType::String),
				confirmation_timeout_field(),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create an EVM quest manager from configuration.
///
/// # Parameters
/// - `config`: the `[managers.<chain>]` table, requiring `quest_contract`
/// - `ctx`: chain metadata, wallet session and confirmation policy
///
/// Without a connected EVM wallet the manager is still built; every
/// operation then fails with "no wallet connected".
pub fn create_evm_manager(
	config: &toml::Value,
	ctx: &ManagerContext<'_>,
) -> Result<ChainManager, ManagerError> {
	EvmQuestSchema::validate_config(config)
		.map_err(|e| ManagerError::Configuration(format!("Invalid configuration: {}", e)))?;
	require_family(ctx.chain, ChainType::Evm, Registry::NAME)?;

	let evm_chain_id = ctx.chain.evm_chain_id.ok_or_else(|| {
		ManagerError::Configuration(format!("Chain '{}' has no EVM chain id", ctx.chain.id))
	})?;
	let quest_contract: Address = config
		.get("quest_contract")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ManagerError::Configuration("quest_contract is required".into()))?
		.parse()
		.map_err(|e| ManagerError::Configuration(format!("Invalid quest_contract: {}", e)))?;

	let client = match ctx.wallet.evm() {
		Ok(wallet) => Some(Arc::new(AlloyEvmClient::new(
			&ctx.chain.rpc_url,
			evm_chain_id,
			wallet,
			manager_policy(config, ctx),
		)?) as Arc<dyn EvmClient>),
		Err(_) => {
			tracing::warn!(
				chain_id = %ctx.chain.id,
				"No EVM wallet configured, quest operations will be rejected"
			);
			None
		},
	};

	Ok(ChainManager::Evm(Arc::new(EvmQuestManager::new(
		ctx.chain.clone(),
		quest_contract,
		client,
	))))
}

/// Registry for the alloy-backed EVM manager.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
	type Factory = crate::ManagerFactory;

	fn factory() -> Self::Factory {
		create_evm_manager
	}
}

impl crate::ManagerRegistry for Registry {}
