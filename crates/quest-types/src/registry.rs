//! Registry trait for self-registering chain manager implementations.
//!
//! Each manager implementation exposes a `Registry` type declaring the name it
//! is selected by in configuration and the factory that builds it.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to select this implementation,
	/// e.g. `implementation = "evm_alloy"` under `[managers.base-mainnet]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
