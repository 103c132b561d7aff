//! Common types module for the quest dispatcher.
//!
//! This module defines the data model shared by every crate in the workspace:
//! chain metadata, chain-agnostic quest requests and results, the step
//! timeline reported to callers, and the small amount of configuration
//! plumbing (schemas, registries, secrets) that the pluggable chain
//! implementations rely on.

/// Chain metadata and chain family tags.
pub mod chain;
/// Progress events published while a quest is being created.
pub mod events;
/// Chain-agnostic quest creation requests and results.
pub mod quest;
/// Implementation registry trait for pluggable chain managers.
pub mod registry;
/// Redacting wrapper for key material.
pub mod secret_string;
/// Step timeline types and transition rules.
pub mod step;
/// Formatting helpers.
pub mod utils;
/// Configuration validation types for implementation-specific config tables.
pub mod validation;

pub use chain::{ChainConfig, ChainType, NativeCurrency};
pub use events::{QuestEvent, StepReporter, StepUpdate};
pub use quest::{CreateQuestResult, QuestCreationParams};
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use step::{Step, StepKind, StepStatus, StepTransitionError, Timeline};
pub use utils::{truncate_id, without_0x_prefix};
pub use validation::*;

/// Arbitrary-precision unsigned integer used for chain-agnostic amounts.
pub use alloy_primitives::U256;
