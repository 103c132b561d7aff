//! Factory registry for quest manager implementations.
//!
//! Collects every manager implementation once so configuration can refer to
//! them by name.

use quest_config::Config;
use quest_core::{DispatcherBuilder, QuestDispatcher};
use quest_manager::ManagerFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Global registry for manager factories
pub struct FactoryRegistry {
	pub managers: HashMap<String, ManagerFactory>,
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			managers: HashMap::new(),
		}
	}

	/// Register a manager implementation
	pub fn register_manager(&mut self, name: impl Into<String>, factory: ManagerFactory) {
		self.managers.insert(name.into(), factory);
	}

	/// Names of all registered managers, sorted.
	pub fn manager_names(&self) -> Vec<&str> {
		let mut names: Vec<_> = self.managers.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}
}

// Global registry instance
static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available implementations
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in quest_manager::get_all_implementations() {
			tracing::debug!("Registering manager implementation: {}", name);
			registry.register_manager(name, factory);
		}

		registry
	})
}

/// Get the global factory registry
pub fn get_registry() -> &'static FactoryRegistry {
	initialize_registry()
}

/// Build the dispatcher using the registry and config
pub fn build_dispatcher_from_config(
	config: Config,
) -> Result<QuestDispatcher, Box<dyn std::error::Error>> {
	let registry = get_registry();

	for (chain_id, table) in &config.managers {
		let name = table
			.get("implementation")
			.and_then(|v| v.as_str())
			.unwrap_or_default();
		if !registry.managers.contains_key(name) {
			return Err(format!(
				"Unknown manager implementation '{}' for chain '{}'. Available: [{}]",
				name,
				chain_id,
				registry.manager_names().join(", ")
			)
			.into());
		}
	}

	Ok(DispatcherBuilder::new(config).build(&registry.managers)?)
}
