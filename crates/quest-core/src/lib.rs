//! Multi-chain quest dispatcher.
//!
//! The dispatcher is the single entry point callers use to fund quests. It
//! resolves the requested chain in the registry, picks the manager serving
//! it, converts chain-agnostic parameters into the chain's native shape and
//! sequences the approval and creation steps. Progress is published on the
//! event bus so any number of observers can follow an attempt.

pub mod builder;
pub mod dispatcher;
pub mod event_bus;
pub mod params;

pub use builder::{BuilderError, DispatcherBuilder};
pub use dispatcher::{QuestDispatcher, SOLANA_APPROVAL_MESSAGE};
pub use event_bus::EventBus;

use quest_config::RegistryError;
use quest_manager::ManagerError;
use thiserror::Error;

/// Errors returned by dispatcher operations.
#[derive(Debug, Error)]
pub enum DispatchError {
	/// The chain id is not registered.
	#[error(transparent)]
	Registry(#[from] RegistryError),
	/// The chain is registered but its manager serves another chain family.
	#[error("Unsupported chain '{chain_id}': {message}")]
	UnsupportedChain { chain_id: String, message: String },
	/// The chain has no working manager yet.
	#[error("{reason}")]
	NotImplemented { chain_id: String, reason: String },
	/// The request is malformed for the target chain.
	#[error("Invalid parameters: {0}")]
	InvalidParams(String),
	/// A numeric field does not fit the chain's native integer type.
	#[error("{field} value {value} does not fit in {target}")]
	Conversion {
		field: &'static str,
		value: String,
		target: &'static str,
	},
	#[error(transparent)]
	Manager(#[from] ManagerError),
}
