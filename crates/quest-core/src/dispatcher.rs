//! Routing of quest operations to per-chain managers.
//!
//! Every operation resolves the chain first, so an unknown id fails before
//! any step is reported or any transaction is attempted. The manager is then
//! matched exhaustively; chain families are never checked anywhere else.

use crate::event_bus::EventBus;
use crate::params::{parse_evm_token, to_evm_request, to_solana_request, validate};
use crate::DispatchError;
use alloy_primitives::U256;
use quest_config::ChainRegistry;
use quest_manager::ChainManager;
use quest_types::{
	truncate_id, ChainConfig, CreateQuestResult, QuestCreationParams, StepKind, StepReporter,
};
use std::collections::HashMap;

/// Message reported as the Solana "Token Approval" step.
pub const SOLANA_APPROVAL_MESSAGE: &str = "Solana doesn't require token approval";

/// Message reported when the wallet already approved enough tokens.
const EXISTING_ALLOWANCE_MESSAGE: &str = "Existing allowance covers the quest amount";

/// Chain-agnostic entry point for creating and funding quests.
pub struct QuestDispatcher {
	registry: ChainRegistry,
	managers: HashMap<String, ChainManager>,
	event_bus: EventBus,
}

impl QuestDispatcher {
	/// Creates a dispatcher. Registered chains missing from `managers` are
	/// served as "coming soon".
	pub fn new(
		registry: ChainRegistry,
		managers: HashMap<String, ChainManager>,
		event_bus: EventBus,
	) -> Self {
		Self {
			registry,
			managers,
			event_bus,
		}
	}

	/// All registered chains in registry order.
	pub fn available_chains(&self) -> &[ChainConfig] {
		self.registry.available_chains()
	}

	pub fn chain_config(&self, chain_id: &str) -> Result<&ChainConfig, DispatchError> {
		Ok(self.registry.chain_config(chain_id)?)
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Whether quests can currently be created on `chain_id`.
	pub fn is_operational(&self, chain_id: &str) -> bool {
		matches!(
			self.managers.get(chain_id),
			Some(ChainManager::Evm(_)) | Some(ChainManager::Solana(_))
		)
	}

	/// Creates the reporter for one attempt. Its updates are published on
	/// the dispatcher's event bus.
	pub fn reporter(&self, quest_id: &str, chain_id: &str) -> StepReporter {
		self.event_bus.reporter(quest_id, chain_id)
	}

	/// Creates and funds a quest on `chain_id`.
	///
	/// On EVM chains the allowance is checked first and tokens are approved
	/// only when it is insufficient; creation is attempted only after the
	/// approval step succeeded. On Solana the approval step is reported as
	/// success straight away since tokens move inside the creation
	/// instruction.
	pub async fn create_multi_chain_quest(
		&self,
		chain_id: &str,
		params: &QuestCreationParams,
		reporter: &StepReporter,
	) -> Result<CreateQuestResult, DispatchError> {
		let (chain, manager) = self.resolve(chain_id)?;
		validate(params)?;

		tracing::info!(
			quest_id = %truncate_id(&params.quest_id),
			chain_id = %chain.id,
			amount = %params.amount,
			"Creating quest"
		);

		let result = match manager {
			ChainManager::Evm(manager) => {
				let request = to_evm_request(params)?;
				let has_allowance = match manager
					.check_allowance(request.token, request.amount)
					.await
				{
					Ok(has_allowance) => has_allowance,
					Err(e) => {
						reporter.error(StepKind::TokenApproval, e.to_string());
						return Err(e.into());
					},
				};

				if has_allowance {
					tracing::debug!(quest_id = %params.quest_id, "Allowance already sufficient");
					reporter.success(
						StepKind::TokenApproval,
						Some(EXISTING_ALLOWANCE_MESSAGE.to_string()),
					);
				} else {
					manager
						.approve_tokens(request.token, request.amount, reporter)
						.await?;
				}

				manager.create_quest(&request, reporter).await?
			},
			ChainManager::Solana(manager) => {
				let request = to_solana_request(params)?;
				reporter.success(
					StepKind::TokenApproval,
					Some(SOLANA_APPROVAL_MESSAGE.to_string()),
				);
				manager.create_quest(&request, reporter).await?
			},
			ChainManager::Unimplemented { reason } => {
				return Err(not_implemented(chain, reason, reporter));
			},
		};

		tracing::info!(
			quest_id = %truncate_id(&params.quest_id),
			chain_id = %chain.id,
			tx_hash = %result.tx_hash,
			"Quest created"
		);
		Ok(result)
	}

	/// Approves `amount` of `token_address` to the chain's quest program.
	/// On Solana nothing is submitted.
	pub async fn approve_tokens(
		&self,
		chain_id: &str,
		token_address: &str,
		amount: U256,
		reporter: &StepReporter,
	) -> Result<(), DispatchError> {
		let (chain, manager) = self.resolve(chain_id)?;

		match manager {
			ChainManager::Evm(manager) => {
				let token = parse_evm_token(token_address)?;
				manager.approve_tokens(token, amount, reporter).await?;
			},
			ChainManager::Solana(_) => {
				reporter.success(
					StepKind::TokenApproval,
					Some(SOLANA_APPROVAL_MESSAGE.to_string()),
				);
			},
			ChainManager::Unimplemented { reason } => {
				return Err(not_implemented(chain, reason, reporter));
			},
		}
		Ok(())
	}

	/// Whether the connected wallet already approved at least `amount`.
	/// Always true on Solana, which has no allowance concept.
	pub async fn check_allowance(
		&self,
		chain_id: &str,
		token_address: &str,
		amount: U256,
	) -> Result<bool, DispatchError> {
		let (chain, manager) = self.resolve(chain_id)?;

		match manager {
			ChainManager::Evm(manager) => {
				let token = parse_evm_token(token_address)?;
				Ok(manager.check_allowance(token, amount).await?)
			},
			ChainManager::Solana(_) => Ok(true),
			ChainManager::Unimplemented { reason } => {
				tracing::warn!(chain_id = %chain.id, "{}", reason);
				Err(DispatchError::NotImplemented {
					chain_id: chain.id.clone(),
					reason,
				})
			},
		}
	}

	/// Looks up the chain and the manager serving it.
	fn resolve(&self, chain_id: &str) -> Result<(&ChainConfig, ChainManager), DispatchError> {
		let chain = self.registry.chain_config(chain_id)?;
		let manager = self
			.managers
			.get(&chain.id)
			.cloned()
			.unwrap_or_else(|| ChainManager::coming_soon(chain));

		if let Some(family) = manager.chain_type() {
			if family != chain.chain_type {
				return Err(DispatchError::UnsupportedChain {
					chain_id: chain.id.clone(),
					message: format!(
						"{} manager cannot serve a {} chain",
						family, chain.chain_type
					),
				});
			}
		}
		Ok((chain, manager))
	}
}

/// Publishes the placeholder notice and builds the matching error. No step
/// is touched, so the timeline stays pending.
fn not_implemented(chain: &ChainConfig, reason: String, reporter: &StepReporter) -> DispatchError {
	reporter.notice(reason.clone());
	DispatchError::NotImplemented {
		chain_id: chain.id.clone(),
		reason,
	}
}
