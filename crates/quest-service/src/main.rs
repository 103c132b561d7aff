//! Main entry point for the quest dispatcher CLI.
//!
//! Loads the configuration, wires a manager to every registered chain and
//! runs a single command against the resulting dispatcher, printing the step
//! timeline as it progresses.

use alloy_primitives::U256;
use clap::{Parser, Subcommand};
use quest_config::Config;
use quest_types::QuestCreationParams;
use std::path::PathBuf;

mod commands;
mod factory_registry;

/// Command-line arguments for the quest dispatcher.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/dispatcher.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
	/// List registered chains
	Chains,
	/// Check whether the wallet already approved enough tokens
	Allowance {
		#[arg(long)]
		chain: String,
		#[arg(long)]
		token: String,
		#[arg(long, value_parser = parse_integer)]
		amount: U256,
	},
	/// Approve tokens to the chain's quest program
	Approve {
		#[arg(long)]
		chain: String,
		#[arg(long)]
		quest_id: String,
		#[arg(long)]
		token: String,
		#[arg(long, value_parser = parse_integer)]
		amount: U256,
	},
	/// Create and fund a quest
	Create {
		#[arg(long)]
		chain: String,
		#[arg(long)]
		quest_id: String,
		#[arg(long)]
		token: String,
		#[arg(long, value_parser = parse_integer)]
		amount: U256,
		/// Unix timestamp in seconds
		#[arg(long, value_parser = parse_integer)]
		deadline: U256,
		#[arg(long, value_parser = parse_integer)]
		max_winners: U256,
	},
}

/// Parses a decimal integer of up to 256 bits.
fn parse_integer(value: &str) -> Result<U256, String> {
	U256::from_str_radix(value.trim(), 10)
		.map_err(|e| format!("'{}' is not a decimal integer: {}", value, e))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Invalid config path: {}", args.config.display()))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.dispatcher.id);

	let dispatcher = factory_registry::build_dispatcher_from_config(config)?;

	match args.command {
		Command::Chains => commands::list_chains(&dispatcher),
		Command::Allowance {
			chain,
			token,
			amount,
		} => commands::allowance(&dispatcher, &chain, &token, amount).await?,
		Command::Approve {
			chain,
			quest_id,
			token,
			amount,
		} => commands::approve(&dispatcher, &chain, &quest_id, &token, amount).await?,
		Command::Create {
			chain,
			quest_id,
			token,
			amount,
			deadline,
			max_winners,
		} => {
			let params = QuestCreationParams::new(quest_id, token, amount, deadline, max_winners);
			commands::create(&dispatcher, &chain, params).await?
		},
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::tempdir;

	#[test]
	fn test_args_default_values() {
		let args = Args::try_parse_from(["quest-dispatcher", "chains"]).unwrap();

		assert_eq!(args.config, PathBuf::from("config/dispatcher.toml"));
		assert_eq!(args.log_level, "info");
		assert_eq!(args.command, Command::Chains);
	}

	#[test]
	fn test_create_args_parse_large_amounts() {
		let args = Args::try_parse_from([
			"quest-dispatcher",
			"--config",
			"custom.toml",
			"create",
			"--chain",
			"base-mainnet",
			"--quest-id",
			"q1",
			"--token",
			"0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
			"--amount",
			"1000000000000000000000000000000",
			"--deadline",
			"9999999999",
			"--max-winners",
			"10",
		])
		.unwrap();

		assert_eq!(args.config, PathBuf::from("custom.toml"));
		match args.command {
			Command::Create {
				amount,
				max_winners,
				..
			} => {
				assert_eq!(
					amount,
					U256::from(1_000_000_000_000_000_000_000_000_000_000u128)
				);
				assert_eq!(max_winners, U256::from(10u64));
			},
			other => panic!("unexpected command: {:?}", other),
		}
	}

	#[test]
	fn test_non_decimal_amount_rejected() {
		assert!(parse_integer("12.5").is_err());
		assert!(parse_integer("-1").is_err());
		assert!(Args::try_parse_from([
			"quest-dispatcher",
			"allowance",
			"--chain",
			"base-mainnet",
			"--token",
			"0x0",
			"--amount",
			"lots",
		])
		.is_err());
	}

	#[tokio::test]
	async fn test_dispatcher_from_config_file() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("dispatcher.toml");
		let mut file = std::fs::File::create(&path).unwrap();
		writeln!(
			file,
			r#"
[dispatcher]
id = "file-dispatcher"

[managers.base-mainnet]
implementation = "evm_alloy"
quest_contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

[managers.solana-devnet]
implementation = "solana_rpc"
"#
		)
		.unwrap();

		let config = Config::from_file(path.to_str().unwrap()).await.unwrap();
		let dispatcher = factory_registry::build_dispatcher_from_config(config).unwrap();

		assert!(dispatcher.is_operational("base-mainnet"));
		assert!(dispatcher.is_operational("solana-devnet"));
		assert!(!dispatcher.is_operational("ethereum-mainnet"));
	}
}
