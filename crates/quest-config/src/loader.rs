//! Multi-file configuration loading.
//!
//! A root file may pull in other files with `include`. Every top-level
//! section must come from exactly one file, and a file may be loaded at most
//! once per load. Included files cannot include further files.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Loads a root configuration file together with its includes.
pub struct ConfigLoader {
	/// Directory relative includes are resolved against.
	base_path: PathBuf,
	/// Canonical paths already read during this load.
	loaded_files: HashSet<PathBuf>,
	/// Which file each top-level section came from.
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads, merges, and validates the configuration rooted at `config_path`.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let root_path = self.resolve_path(config_path)?;
		let root_content = self.read_resolved(&root_path).await?;
		let mut root: toml::Value = toml::from_str(&root_content)?;

		let includes = Self::take_includes(&mut root)?;
		if includes.is_empty() {
			return root_content.parse();
		}

		self.record_sections(&root, &root_path)?;

		for include in includes {
			let include_path = self.resolve_path(&include)?;
			let content = self.read_resolved(&include_path).await?;
			let included: toml::Value = toml::from_str(&content)?;
			if included.get("include").is_some() {
				return Err(ConfigError::Validation(format!(
					"Nested include in {} is not supported; list every file in the root config",
					include_path.display()
				)));
			}
			self.record_sections(&included, &include_path)?;

			if let (Some(target), Some(source)) = (root.as_table_mut(), included.as_table()) {
				for (key, value) in source {
					target.insert(key.clone(), value.clone());
				}
			}
		}

		let merged = toml::to_string(&root).map_err(|e| {
			ConfigError::Parse(format!("Failed to serialize combined config: {}", e))
		})?;
		tracing::debug!(
			files = self.loaded_files.len(),
			"Merged configuration files"
		);
		merged.parse()
	}

	/// Reads a file once and resolves environment variables in it.
	async fn read_resolved(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical = path.canonicalize().map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.loaded_files.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&content)
	}

	/// Removes and returns the `include` directive (a string or an array of strings).
	fn take_includes(root: &mut toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
		let Some(include) = root.as_table_mut().and_then(|t| t.remove("include")) else {
			return Ok(Vec::new());
		};

		match include {
			toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
			toml::Value::Array(items) => items
				.into_iter()
				.map(|item| match item {
					toml::Value::String(path) => Ok(PathBuf::from(path)),
					_ => Err(ConfigError::Validation(
						"Include array must contain only strings".into(),
					)),
				})
				.collect(),
			_ => Err(ConfigError::Validation(
				"Include must be a string or array of strings".into(),
			)),
		}
	}

	/// Records the sections defined by `file`, rejecting any section that an
	/// earlier file already defined.
	fn record_sections(&mut self, value: &toml::Value, file: &Path) -> Result<(), ConfigError> {
		let Some(table) = value.as_table() else {
			return Ok(());
		};
		for key in table.keys() {
			if let Some(existing) = self.section_sources.get(key) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}. \
					Each top-level section must be unique across all configuration files.",
					key,
					existing.display(),
					file.display()
				)));
			}
			self.section_sources.insert(key.clone(), file.to_path_buf());
		}
		Ok(())
	}

	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}

		Ok(resolved)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("config.toml");

		fs::write(
			&config_path,
			r#"
[dispatcher]
id = "single-file"

[managers.solana-mainnet]
implementation = "solana_rpc"
program_id = "43RRcJN1k3kVRDx4i3dNHtCEaY7NCZeaPJe7p7u6vcUd"
"#,
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config(&config_path).await.unwrap();

		assert_eq!(config.dispatcher.id, "single-file");
		assert!(config.managers.contains_key("solana-mainnet"));
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();

		let main_config = r#"
include = ["chains.toml", "managers.toml"]

[dispatcher]
id = "split-config"
"#;
		let chains_config = r#"
[chains.base-mainnet]
rpc_url = "http://localhost:8545"
"#;
		let managers_config = r#"
[managers.base-mainnet]
implementation = "evm_alloy"
quest_contract = "0x1234567890123456789012345678901234567890"
"#;

		fs::write(temp_dir.path().join("main.toml"), main_config).unwrap();
		fs::write(temp_dir.path().join("chains.toml"), chains_config).unwrap();
		fs::write(temp_dir.path().join("managers.toml"), managers_config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("main.toml").await.unwrap();

		assert_eq!(config.dispatcher.id, "split-config");
		let registry = config.registry().unwrap();
		assert_eq!(
			registry.chain_config("base-mainnet").unwrap().rpc_url,
			"http://localhost:8545"
		);
		assert!(config.managers.contains_key("base-mainnet"));
	}

	#[tokio::test]
	async fn test_single_string_include() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = \"dispatcher.toml\"\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("dispatcher.toml"),
			"[dispatcher]\nid = \"included\"\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("main.toml").await.unwrap();
		assert_eq!(config.dispatcher.id, "included");
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let temp_dir = TempDir::new().unwrap();

		fs::write(
			temp_dir.path().join("main.toml"),
			"include = [\"duplicate.toml\"]\n\n[dispatcher]\nid = \"one\"\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("duplicate.toml"),
			"[dispatcher]\nid = \"two\"\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader
			.load_config("main.toml")
			.await
			.unwrap_err()
			.to_string();
		assert!(error_msg.contains("Duplicate section 'dispatcher'"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("self.toml"),
			"include = [\"self.toml\"]\n\n[dispatcher]\nid = \"loop\"\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader
			.load_config("self.toml")
			.await
			.unwrap_err()
			.to_string();
		assert!(error_msg.contains("already loaded"));
	}

	#[tokio::test]
	async fn test_missing_include() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = [\"absent.toml\"]\n\n[dispatcher]\nid = \"x\"\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(matches!(err, ConfigError::Io(_)));
	}

	#[tokio::test]
	async fn test_nested_include_rejected() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = [\"managers.toml\"]\n\n[dispatcher]\nid = \"nested\"\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("managers.toml"),
			"include = [\"chains.toml\"]\n\n[managers.solana-devnet]\nimplementation = \"solana_rpc\"\n",
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("chains.toml"),
			"[chains.solana-devnet]\nrpc_url = \"http://localhost:8899\"\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("Nested include")));
	}
}
