//! Wallet session for the quest dispatcher.
//!
//! A session holds at most one signer per chain family. Chain managers ask
//! the session for the signer they need and fail with `NotConnected` when
//! the operator did not configure one.

use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_signer::Signer as _;
use alloy_signer_local::PrivateKeySigner;
use quest_types::{ChainType, SecretString};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Key material could not be parsed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Signing a transaction failed.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// No wallet is configured for the requested chain family.
	#[error("No {0} wallet connected")]
	NotConnected(ChainType),
}

/// Signer for EVM chains.
#[derive(Clone)]
pub struct EvmWallet {
	signer: PrivateKeySigner,
}

impl std::fmt::Debug for EvmWallet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EvmWallet")
			.field("address", &self.signer.address())
			.finish()
	}
}

impl EvmWallet {
	/// Parses a hex encoded secp256k1 private key, with or without `0x`.
	pub fn from_secret(key: &SecretString) -> Result<Self, AccountError> {
		let signer = key.with_exposed(|k| {
			k.parse::<PrivateKeySigner>()
				.map_err(|_| AccountError::InvalidKey("malformed EVM private key".to_string()))
		})?;
		Ok(Self { signer })
	}

	pub fn address(&self) -> Address {
		self.signer.address()
	}

	/// Wallet bound to an EIP-155 chain id, ready to hand to a provider.
	pub fn ethereum_wallet(&self, chain_id: u64) -> EthereumWallet {
		EthereumWallet::from(self.signer.clone().with_chain_id(Some(chain_id)))
	}
}

/// Signer for Solana clusters.
#[derive(Clone)]
pub struct SolanaWallet {
	keypair: Arc<Keypair>,
}

impl std::fmt::Debug for SolanaWallet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SolanaWallet")
			.field("pubkey", &self.keypair.pubkey())
			.finish()
	}
}

impl SolanaWallet {
	/// Parses a 64 byte ed25519 keypair.
	///
	/// Accepts either base58 (wallet export format) or a JSON byte array
	/// (the `solana-keygen` file format).
	pub fn from_secret(key: &SecretString) -> Result<Self, AccountError> {
		let bytes = key.with_exposed(|k| {
			if k.starts_with('[') {
				serde_json::from_str::<Vec<u8>>(k).map_err(|_| {
					AccountError::InvalidKey("malformed Solana keypair byte array".to_string())
				})
			} else {
				bs58::decode(k).into_vec().map_err(|_| {
					AccountError::InvalidKey("Solana secret key is not valid base58".to_string())
				})
			}
		})?;

		if bytes.len() != 64 {
			return Err(AccountError::InvalidKey(format!(
				"Solana keypair must be 64 bytes, got {}",
				bytes.len()
			)));
		}
		let keypair = Keypair::try_from(bytes.as_slice())
			.map_err(|e| AccountError::InvalidKey(format!("invalid Solana keypair: {}", e)))?;
		Ok(Self::from_keypair(keypair))
	}

	pub fn from_keypair(keypair: Keypair) -> Self {
		Self {
			keypair: Arc::new(keypair),
		}
	}

	pub fn pubkey(&self) -> Pubkey {
		self.keypair.pubkey()
	}

	/// Signs `tx` as fee payer together with `co_signers`.
	pub fn sign(
		&self,
		tx: &mut Transaction,
		co_signers: &[&Keypair],
		recent_blockhash: Hash,
	) -> Result<(), AccountError> {
		let mut signers: Vec<&dyn Signer> = Vec::with_capacity(co_signers.len() + 1);
		signers.push(self.keypair.as_ref());
		signers.extend(co_signers.iter().map(|k| *k as &dyn Signer));

		tx.try_sign(&signers, recent_blockhash)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))
	}
}

/// The signers available to the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct WalletSession {
	evm: Option<EvmWallet>,
	solana: Option<SolanaWallet>,
}

impl WalletSession {
	/// Builds a session from optional configured keys.
	pub fn from_keys(
		evm_private_key: Option<&SecretString>,
		solana_secret_key: Option<&SecretString>,
	) -> Result<Self, AccountError> {
		let evm = evm_private_key.map(EvmWallet::from_secret).transpose()?;
		let solana = solana_secret_key
			.map(SolanaWallet::from_secret)
			.transpose()?;

		if let Some(wallet) = &evm {
			tracing::info!(address = %wallet.address(), "EVM wallet connected");
		}
		if let Some(wallet) = &solana {
			tracing::info!(pubkey = %wallet.pubkey(), "Solana wallet connected");
		}
		Ok(Self { evm, solana })
	}

	pub fn is_connected(&self, chain_type: ChainType) -> bool {
		match chain_type {
			ChainType::Evm => self.evm.is_some(),
			ChainType::Solana => self.solana.is_some(),
		}
	}

	pub fn evm(&self) -> Result<&EvmWallet, AccountError> {
		self.evm
			.as_ref()
			.ok_or(AccountError::NotConnected(ChainType::Evm))
	}

	pub fn solana(&self) -> Result<&SolanaWallet, AccountError> {
		self.solana
			.as_ref()
			.ok_or(AccountError::NotConnected(ChainType::Solana))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use solana_sdk::instruction::{AccountMeta, Instruction};
	use solana_sdk::message::Message;

	const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[test]
	fn test_evm_wallet_address() {
		let wallet = EvmWallet::from_secret(&SecretString::from(ANVIL_KEY)).unwrap();
		assert_eq!(
			wallet.address().to_string(),
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
		);
	}

	#[test]
	fn test_evm_key_without_prefix() {
		let wallet =
			EvmWallet::from_secret(&SecretString::from(ANVIL_KEY.trim_start_matches("0x")))
				.unwrap();
		assert_eq!(
			wallet.address().to_string(),
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
		);
	}

	#[test]
	fn test_invalid_evm_key() {
		let err = EvmWallet::from_secret(&SecretString::from("0x1234")).unwrap_err();
		assert!(matches!(err, AccountError::InvalidKey(_)));
		assert!(!err.to_string().contains("1234"));
	}

	#[test]
	fn test_solana_base58_and_json_formats() {
		let keypair = Keypair::new();
		let expected = keypair.pubkey();
		let bytes = keypair.to_bytes();

		let b58 = SecretString::new(bs58::encode(bytes).into_string());
		assert_eq!(SolanaWallet::from_secret(&b58).unwrap().pubkey(), expected);

		let json = SecretString::new(serde_json::to_string(&bytes.to_vec()).unwrap());
		assert_eq!(SolanaWallet::from_secret(&json).unwrap().pubkey(), expected);
	}

	#[test]
	fn test_solana_wrong_length() {
		let short = SecretString::new(bs58::encode([7u8; 32]).into_string());
		let err = SolanaWallet::from_secret(&short).unwrap_err();
		assert!(err.to_string().contains("64 bytes"));
	}

	#[test]
	fn test_solana_sign_with_co_signer() {
		let wallet = SolanaWallet::from_keypair(Keypair::new());
		let quest = Keypair::new();
		let instruction = Instruction::new_with_bytes(
			Pubkey::new_unique(),
			&[1, 2, 3],
			vec![
				AccountMeta::new(wallet.pubkey(), true),
				AccountMeta::new(quest.pubkey(), true),
			],
		);
		let message = Message::new(&[instruction], Some(&wallet.pubkey()));
		let mut tx = Transaction::new_unsigned(message);

		wallet.sign(&mut tx, &[&quest], Hash::default()).unwrap();
		assert!(tx.is_signed());
		assert_eq!(tx.signatures.len(), 2);
	}

	#[test]
	fn test_solana_sign_missing_co_signer() {
		let wallet = SolanaWallet::from_keypair(Keypair::new());
		let quest = Keypair::new();
		let instruction = Instruction::new_with_bytes(
			Pubkey::new_unique(),
			&[],
			vec![
				AccountMeta::new(wallet.pubkey(), true),
				AccountMeta::new(quest.pubkey(), true),
			],
		);
		let message = Message::new(&[instruction], Some(&wallet.pubkey()));
		let mut tx = Transaction::new_unsigned(message);

		let err = wallet.sign(&mut tx, &[], Hash::default()).unwrap_err();
		assert!(matches!(err, AccountError::SigningFailed(_)));
	}

	#[test]
	fn test_session_connection_state() {
		let session = WalletSession::from_keys(Some(&SecretString::from(ANVIL_KEY)), None).unwrap();
		assert!(session.is_connected(ChainType::Evm));
		assert!(!session.is_connected(ChainType::Solana));
		assert!(matches!(
			session.solana().unwrap_err(),
			AccountError::NotConnected(ChainType::Solana)
		));
		assert_eq!(
			session.solana().unwrap_err().to_string(),
			"No SOLANA wallet connected"
		);
	}
}
