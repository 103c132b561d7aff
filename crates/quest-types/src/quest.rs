//! Chain-agnostic quest requests and results.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Chain-agnostic request to create and fund a quest.
///
/// Numeric fields are arbitrary-precision so that the request can be built
/// without knowing which chain it targets. Chains with narrower native
/// integer types convert at the dispatcher boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestCreationParams {
	/// Caller-supplied unique quest identifier.
	pub quest_id: String,
	/// Chain-native token identifier (ERC-20 address or SPL mint).
	pub token_address: String,
	/// Reward pool size in the token's smallest unit.
	pub amount: U256,
	/// Unix timestamp (seconds) after which the quest ends.
	pub deadline: U256,
	/// Maximum number of rewarded participants.
	pub max_winners: U256,
}

impl QuestCreationParams {
	pub fn new(
		quest_id: impl Into<String>,
		token_address: impl Into<String>,
		amount: U256,
		deadline: U256,
		max_winners: U256,
	) -> Self {
		Self {
			quest_id: quest_id.into(),
			token_address: token_address.into(),
			amount,
			deadline,
			max_winners,
		}
	}
}

/// Result of a confirmed quest-creation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQuestResult {
	/// Hash (EVM) or signature (Solana) of the creation transaction.
	pub tx_hash: String,
	/// Address of the account holding quest state, for chains that keep
	/// quest state at a dedicated address.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub quest_account_address: Option<String>,
}
