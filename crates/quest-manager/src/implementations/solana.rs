//! Solana quest manager.
//!
//! The quest program takes the reward directly from the creator's
//! associated token account in the `create_quest` instruction, so there is
//! no approval step. Each quest lives in a fresh account whose keypair is
//! generated per attempt and co-signs the transaction.

use crate::{
	confirmation_timeout_field, fail, manager_policy, require_family, ChainManager,
	ManagerContext, ManagerError, SolanaQuestInterface, SolanaQuestRequest,
};
use async_trait::async_trait;
use borsh::BorshSerialize;
use quest_account::{AccountError, SolanaWallet};
use quest_delivery::{DeliveryError, RpcSolanaClient, SolanaClient};
use quest_types::{
	ChainConfig, ChainType, ConfigSchema, CreateQuestResult, Field, FieldType,
	ImplementationRegistry, Schema, StepKind, StepReporter, ValidationError,
};
use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use solana_sdk::{pubkey, system_program, sysvar};
use std::str::FromStr;
use std::sync::Arc;

/// Deployed Dopamyn quest program.
pub const DEFAULT_PROGRAM_ID: Pubkey = pubkey!("43RRcJN1k3kVRDx4i3dNHtCEaY7NCZeaPJe7p7u6vcUd");
/// SPL Token program.
pub const TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
/// SPL Associated Token Account program.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
	pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Longest quest id the quest account has room for, in bytes.
pub const MAX_QUEST_ID_LENGTH: usize = 36;

const GLOBAL_STATE_SEED: &[u8] = b"global_state";
const ESCROW_SEED: &[u8] = b"escrow";

/// First error code of the quest program; codes are assigned in
/// declaration order from here.
const PROGRAM_ERROR_OFFSET: u32 = 6000;

const PROGRAM_ERRORS: &[&str] = &[
	"Contract is paused",
	"Token mint is not supported",
	"Only the quest creator can cancel this quest",
	"Quest is not active",
	"Quest is already cancelled",
	"Unauthorized status update",
	"Unauthorized token modification",
	"Token is already supported",
	"Token not found",
	"Unauthorized pause action",
	"Contract is already paused",
	"Contract is already unpaused",
	"Unauthorized reward action",
	"Insufficient reward balance",
	"Max winners limit reached",
	"Winner has already been rewarded",
	"Unauthorized withdrawal",
	"No tokens to withdraw",
	"Must wait 1 week after quest deadline",
];

/// Human readable message for a quest program error code.
pub fn program_error_message(code: u32) -> Option<&'static str> {
	let index = code.checked_sub(PROGRAM_ERROR_OFFSET)?;
	PROGRAM_ERRORS.get(index as usize).copied()
}

/// Anchor instruction discriminator: `sha256("global:<name>")[..8]`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
	let digest = Sha256::digest(format!("global:{}", name).as_bytes());
	let mut out = [0u8; 8];
	out.copy_from_slice(&digest[..8]);
	out
}

/// Associated token account of `wallet` for `mint`.
pub fn associated_token_address(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
	Pubkey::find_program_address(
		&[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
		&ASSOCIATED_TOKEN_PROGRAM_ID,
	)
	.0
}

#[derive(BorshSerialize)]
struct CreateQuestArgs {
	id: String,
	amount: u64,
	deadline: i64,
	max_winners: u32,
}

/// Builds the `create_quest` instruction.
pub fn create_quest_instruction(
	program_id: &Pubkey,
	creator: &Pubkey,
	quest: &Pubkey,
	request: &SolanaQuestRequest,
) -> Result<Instruction, ManagerError> {
	let (global_state, _) = Pubkey::find_program_address(&[GLOBAL_STATE_SEED], program_id);
	let (escrow, _) = Pubkey::find_program_address(&[ESCROW_SEED, quest.as_ref()], program_id);
	let creator_token_account = associated_token_address(creator, &request.token_mint);

	let args = CreateQuestArgs {
		id: request.quest_id.clone(),
		amount: request.amount,
		deadline: request.deadline,
		max_winners: request.max_winners,
	};
	let mut data = instruction_discriminator("create_quest").to_vec();
	data.extend(
		borsh::to_vec(&args)
			.map_err(|e| ManagerError::InvalidInput(format!("Failed to encode arguments: {}", e)))?,
	);

	Ok(Instruction {
		program_id: *program_id,
		accounts: vec![
			AccountMeta::new(*creator, true),
			AccountMeta::new(global_state, false),
			AccountMeta::new_readonly(request.token_mint, false),
			AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
			AccountMeta::new(escrow, false),
			AccountMeta::new(creator_token_account, false),
			AccountMeta::new(*quest, true),
			AccountMeta::new_readonly(system_program::ID, false),
			AccountMeta::new_readonly(sysvar::rent::ID, false),
		],
		data,
	})
}

/// Replaces raw custom program errors with the program's own messages.
fn program_error(err: DeliveryError) -> ManagerError {
	match err {
		DeliveryError::Reverted {
			code: Some(code),
			reason,
		} => ManagerError::Reverted {
			code: Some(code),
			reason: program_error_message(code)
				.map(str::to_string)
				.unwrap_or(reason),
		},
		other => other.into(),
	}
}

/// Quest manager for one Solana cluster.
pub struct SolanaQuestManager {
	chain: ChainConfig,
	program_id: Pubkey,
	client: Arc<dyn SolanaClient>,
	/// Absent when no Solana wallet is connected.
	wallet: Option<SolanaWallet>,
}

impl SolanaQuestManager {
	pub fn new(
		chain: ChainConfig,
		program_id: Pubkey,
		client: Arc<dyn SolanaClient>,
		wallet: Option<SolanaWallet>,
	) -> Self {
		Self {
			chain,
			program_id,
			client,
			wallet,
		}
	}

	fn wallet(&self) -> Result<&SolanaWallet, ManagerError> {
		self.wallet
			.as_ref()
			.ok_or(ManagerError::Account(AccountError::NotConnected(ChainType::Solana)))
	}

	async fn submit(
		&self,
		wallet: &SolanaWallet,
		request: &SolanaQuestRequest,
	) -> Result<CreateQuestResult, ManagerError> {
		let quest = Keypair::new();
		let creator = wallet.pubkey();
		let instruction =
			create_quest_instruction(&self.program_id, &creator, &quest.pubkey(), request)?;

		let blockhash = self.client.latest_blockhash().await?;
		let mut tx = Transaction::new_with_payer(&[instruction], Some(&creator));
		wallet.sign(&mut tx, &[&quest], blockhash)?;

		let signature = self
			.client
			.send_and_confirm(&tx)
			.await
			.map_err(program_error)?;

		tracing::info!(
			chain_id = %self.chain.id,
			quest_id = %request.quest_id,
			quest_account = %quest.pubkey(),
			tx_hash = %signature,
			"Quest created"
		);
		Ok(CreateQuestResult {
			tx_hash: signature.to_string(),
			quest_account_address: Some(quest.pubkey().to_string()),
		})
	}
}

#[async_trait]
impl SolanaQuestInterface for SolanaQuestManager {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SolanaQuestSchema)
	}

	async fn create_quest(
		&self,
		request: &SolanaQuestRequest,
		reporter: &StepReporter,
	) -> Result<CreateQuestResult, ManagerError> {
		let wallet = match self.wallet() {
			Ok(wallet) => wallet,
			Err(e) => return fail(reporter, StepKind::QuestCreation, e),
		};
		if request.quest_id.len() > MAX_QUEST_ID_LENGTH {
			let err = ManagerError::InvalidInput(format!(
				"Quest id is {} bytes, the maximum is {}",
				request.quest_id.len(),
				MAX_QUEST_ID_LENGTH
			));
			return fail(reporter, StepKind::QuestCreation, err);
		}

		reporter.processing(StepKind::QuestCreation);
		match self.submit(wallet, request).await {
			Ok(result) => {
				let message = self
					.chain
					.explorer_tx_url(&result.tx_hash)
					.unwrap_or_else(|| result.tx_hash.clone());
				reporter.success(StepKind::QuestCreation, Some(format!("Confirmed: {}", message)));
				Ok(result)
			},
			Err(e) => fail(reporter, StepKind::QuestCreation, e),
		}
	}
}

/// Configuration schema for the Solana manager.
///
/// ```toml
/// [managers.solana-devnet]
/// implementation = "solana_rpc"
/// program_id = "43RRcJN1k3kVRDx4i3dNHtCEaY7NCZeaPJe7p7u6vcUd"  # optional
/// ```
pub struct SolanaQuestSchema;

impl SolanaQuestSchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for SolanaQuestSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("implementation", FieldType::String),
				confirmation_timeout_field(),
				Field::new("program_id", FieldType::String).with_validator(|value| {
					let id = value.as_str().unwrap_or_default();
					Pubkey::from_str(id)
						.map(|_| ())
						.map_err(|e| format!("program_id is not a valid public key: {}", e))
				}),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a Solana quest manager from configuration.
///
/// Without a connected Solana wallet the manager is still built; every
/// operation then fails with "no wallet connected".
pub fn create_solana_manager(
	config: &toml::Value,
	ctx: &ManagerContext<'_>,
) -> Result<ChainManager, ManagerError> {
	SolanaQuestSchema::validate_config(config)
		.map_err(|e| ManagerError::Configuration(format!("Invalid configuration: {}", e)))?;
	require_family(ctx.chain, ChainType::Solana, Registry::NAME)?;

	let program_id = match config.get("program_id").and_then(|v| v.as_str()) {
		Some(id) => Pubkey::from_str(id)
			.map_err(|e| ManagerError::Configuration(format!("Invalid program_id: {}", e)))?,
		None => DEFAULT_PROGRAM_ID,
	};

	let wallet = ctx.wallet.solana().ok().cloned();
	if wallet.is_none() {
		tracing::warn!(
			chain_id = %ctx.chain.id,
			"No Solana wallet configured, quest operations will be rejected"
		);
	}

	let client = RpcSolanaClient::new(&ctx.chain.rpc_url, manager_policy(config, ctx));
	Ok(ChainManager::Solana(Arc::new(SolanaQuestManager::new(
		ctx.chain.clone(),
		program_id,
		Arc::new(client),
		wallet,
	))))
}

/// Registry for the RPC-backed Solana manager.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "solana_rpc";
	type Factory = crate::ManagerFactory;

	fn factory() -> Self::Factory {
		create_solana_manager
	}
}

impl crate::ManagerRegistry for Registry {}
