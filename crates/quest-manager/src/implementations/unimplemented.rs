//! Placeholder for chains that are registered but not live yet.
//!
//! Selected with `implementation = "unimplemented"`. Every operation against
//! the resulting manager is refused by the dispatcher with the configured
//! reason, so a chain can be shown in pickers before its contracts ship.

use crate::{ChainManager, ManagerContext, ManagerError};
use quest_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};

pub struct UnimplementedSchema;

impl ConfigSchema for UnimplementedSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![
				Field::new("implementation", FieldType::String),
				Field::new("reason", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(reason) if !reason.trim().is_empty() => Ok(()),
						_ => Err("reason cannot be empty".to_string()),
					}
				}),
			],
		)
		.validate(config)
	}
}

/// Builds a placeholder manager. `reason` defaults to
/// "<chain name> quests are coming soon".
pub fn create_unimplemented_manager(
	config: &toml::Value,
	ctx: &ManagerContext<'_>,
) -> Result<ChainManager, ManagerError> {
	UnimplementedSchema
		.validate(config)
		.map_err(|e| ManagerError::Configuration(format!("Invalid configuration: {}", e)))?;

	Ok(match config.get("reason").and_then(|v| v.as_str()) {
		Some(reason) => ChainManager::Unimplemented {
			reason: reason.to_string(),
		},
		None => ChainManager::coming_soon(ctx.chain),
	})
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "unimplemented";
	type Factory = crate::ManagerFactory;

	fn factory() -> Self::Factory {
		create_unimplemented_manager
	}
}

impl crate::ManagerRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use quest_account::WalletSession;
	use quest_delivery::ConfirmationPolicy;
	use quest_types::{ChainConfig, ChainType, NativeCurrency};

	fn polygon() -> ChainConfig {
		ChainConfig {
			id: "polygon-mainnet".into(),
			name: "Polygon".into(),
			chain_type: ChainType::Evm,
			native_currency: NativeCurrency::new("POL", 18),
			is_testnet: false,
			rpc_url: "https://polygon-rpc.com".into(),
			evm_chain_id: Some(137),
			explorer_url: None,
		}
	}

	fn build(config: &str) -> Result<ChainManager, ManagerError> {
		let chain = polygon();
		let wallet = WalletSession::default();
		let ctx = ManagerContext {
			chain: &chain,
			wallet: &wallet,
			policy: ConfirmationPolicy::default(),
		};
		create_unimplemented_manager(&toml::from_str(config).unwrap(), &ctx)
	}

	#[test]
	fn test_default_reason() {
		match build("implementation = \"unimplemented\"").unwrap() {
			ChainManager::Unimplemented { reason } => {
				assert_eq!(reason, "Polygon quests are coming soon")
			},
			other => panic!("unexpected manager: {:?}", other),
		}
	}

	#[test]
	fn test_custom_reason() {
		match build("reason = \"Polygon support ships in Q3\"").unwrap() {
			ChainManager::Unimplemented { reason } => {
				assert_eq!(reason, "Polygon support ships in Q3")
			},
			other => panic!("unexpected manager: {:?}", other),
		}
		assert!(build("reason = \"  \"").is_err());
	}
}
