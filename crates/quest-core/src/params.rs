//! Conversion of chain-agnostic quest parameters into chain-native requests.
//!
//! This is the only place arbitrary-precision values are narrowed. Values
//! that do not fit are rejected with the offending field named, never
//! truncated.

use crate::DispatchError;
use alloy_primitives::{Address, U256};
use quest_manager::{EvmQuestRequest, SolanaQuestRequest, MAX_QUEST_ID_LENGTH};
use quest_types::QuestCreationParams;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Checks the chain independent parts of a request.
pub fn validate(params: &QuestCreationParams) -> Result<(), DispatchError> {
	if params.quest_id.trim().is_empty() {
		return Err(DispatchError::InvalidParams(
			"Quest id cannot be empty".into(),
		));
	}
	if params.token_address.trim().is_empty() {
		return Err(DispatchError::InvalidParams(
			"Token address cannot be empty".into(),
		));
	}
	if params.max_winners.is_zero() {
		return Err(DispatchError::InvalidParams(
			"max_winners must be greater than zero".into(),
		));
	}
	Ok(())
}

pub fn parse_evm_token(token_address: &str) -> Result<Address, DispatchError> {
	Address::from_str(token_address.trim()).map_err(|e| {
		DispatchError::InvalidParams(format!(
			"Invalid ERC-20 token address '{}': {}",
			token_address, e
		))
	})
}

pub fn parse_solana_mint(token_address: &str) -> Result<Pubkey, DispatchError> {
	Pubkey::from_str(token_address.trim()).map_err(|e| {
		DispatchError::InvalidParams(format!(
			"Invalid SPL token mint '{}': {}",
			token_address, e
		))
	})
}

/// EVM contracts take the parameters unchanged.
pub fn to_evm_request(params: &QuestCreationParams) -> Result<EvmQuestRequest, DispatchError> {
	Ok(EvmQuestRequest {
		quest_id: params.quest_id.clone(),
		token: parse_evm_token(&params.token_address)?,
		amount: params.amount,
		deadline: params.deadline,
		max_winners: params.max_winners,
	})
}

/// Solana quest accounts have room for at most `MAX_QUEST_ID_LENGTH` bytes
/// of quest id.
pub fn to_solana_request(
	params: &QuestCreationParams,
) -> Result<SolanaQuestRequest, DispatchError> {
	if params.quest_id.len() > MAX_QUEST_ID_LENGTH {
		return Err(DispatchError::InvalidParams(format!(
			"Quest id is {} bytes, the maximum is {}",
			params.quest_id.len(),
			MAX_QUEST_ID_LENGTH
		)));
	}
	Ok(SolanaQuestRequest {
		quest_id: params.quest_id.clone(),
		token_mint: parse_solana_mint(&params.token_address)?,
		amount: narrow_u64("amount", params.amount)?,
		deadline: narrow_i64("deadline", params.deadline)?,
		max_winners: narrow_u32("max_winners", params.max_winners)?,
	})
}

pub fn narrow_u64(field: &'static str, value: U256) -> Result<u64, DispatchError> {
	u64::try_from(value).map_err(|_| overflow(field, value, "u64"))
}

pub fn narrow_i64(field: &'static str, value: U256) -> Result<i64, DispatchError> {
	i64::try_from(value).map_err(|_| overflow(field, value, "i64"))
}

pub fn narrow_u32(field: &'static str, value: U256) -> Result<u32, DispatchError> {
	u32::try_from(value).map_err(|_| overflow(field, value, "u32"))
}

fn overflow(field: &'static str, value: U256, target: &'static str) -> DispatchError {
	DispatchError::Conversion {
		field,
		value: value.to_string(),
		target,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

	fn params(token: &str) -> QuestCreationParams {
		QuestCreationParams::new(
			"q1",
			token,
			U256::from(1_000_000u64),
			U256::from(9_999_999_999u64),
			U256::from(10u64),
		)
	}

	#[test]
	fn test_solana_request_narrowed() {
		let request = to_solana_request(&params(USDC_MINT)).unwrap();
		assert_eq!(request.amount, 1_000_000);
		assert_eq!(request.deadline, 9_999_999_999);
		assert_eq!(request.max_winners, 10);
		assert_eq!(request.token_mint.to_string(), USDC_MINT);
	}

	#[test]
	fn test_narrowing_boundaries() {
		assert_eq!(narrow_u64("amount", U256::from(u64::MAX)).unwrap(), u64::MAX);
		assert_eq!(
			narrow_i64("deadline", U256::from(i64::MAX as u64)).unwrap(),
			i64::MAX
		);
		assert_eq!(narrow_u32("max_winners", U256::from(u32::MAX)).unwrap(), u32::MAX);

		let err = narrow_u64("amount", U256::from(u64::MAX) + U256::from(1u64)).unwrap_err();
		assert!(matches!(
			err,
			DispatchError::Conversion { field: "amount", target: "u64", .. }
		));
		assert!(narrow_i64("deadline", U256::from(i64::MAX as u64 + 1)).is_err());
		assert!(narrow_u32("max_winners", U256::from(u32::MAX as u64 + 1)).is_err());
	}

	#[test]
	fn test_overflow_names_field() {
		let mut p = params(USDC_MINT);
		p.max_winners = U256::from(5_000_000_000u64);
		let err = to_solana_request(&p).unwrap_err();
		assert_eq!(
			err.to_string(),
			"max_winners value 5000000000 does not fit in u32"
		);
	}

	#[test]
	fn test_solana_quest_id_length() {
		let mut p = params(USDC_MINT);
		p.quest_id = "q".repeat(MAX_QUEST_ID_LENGTH);
		assert!(to_solana_request(&p).is_ok());

		p.quest_id.push('q');
		assert!(matches!(
			to_solana_request(&p),
			Err(DispatchError::InvalidParams(msg)) if msg.contains("maximum is 36")
		));
		assert!(to_evm_request(&p).is_ok());
	}

	#[test]
	fn test_evm_request_unchanged() {
		let p = params("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
		let request = to_evm_request(&p).unwrap();
		assert_eq!(request.amount, p.amount);
		assert_eq!(request.deadline, p.deadline);
		assert_eq!(request.max_winners, p.max_winners);
	}

	#[test]
	fn test_token_parse_failures() {
		assert!(matches!(
			to_evm_request(&params("0xTOKEN")),
			Err(DispatchError::InvalidParams(_))
		));
		assert!(matches!(
			to_solana_request(&params("not-a-mint")),
			Err(DispatchError::InvalidParams(_))
		));
	}

	#[test]
	fn test_validate() {
		assert!(validate(&params(USDC_MINT)).is_ok());

		let mut p = params(USDC_MINT);
		p.quest_id = "  ".into();
		assert!(matches!(validate(&p), Err(DispatchError::InvalidParams(_))));

		let mut p = params(USDC_MINT);
		p.max_winners = U256::ZERO;
		assert!(matches!(validate(&p), Err(DispatchError::InvalidParams(_))));
	}
}
