//! Transaction delivery for the quest dispatcher.
//!
//! This module owns the chain transports: submitting transactions and
//! waiting, with a bound, for them to land. Chain managers build the
//! chain-specific payloads and hand them to an `EvmClient` or a
//! `SolanaClient`; they never talk to an RPC endpoint directly.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::future::IntoFuture;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	pub mod solana {
		pub mod rpc;
	}
}

pub use implementations::evm::alloy::AlloyEvmClient;
pub use implementations::solana::rpc::RpcSolanaClient;

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
	/// RPC transport failure, rejected request, or malformed response.
	#[error("Network error: {0}")]
	Network(String),
	/// The chain rejected the transaction. `code` is the program error
	/// code when the chain reports one.
	#[error("Transaction reverted: {reason}")]
	Reverted { code: Option<u32>, reason: String },
	/// The transaction did not confirm within the configured bound.
	#[error("Timed out after {waited_secs}s waiting for transaction {tx}")]
	Timeout { tx: String, waited_secs: u64 },
}

/// How long to wait for a submitted transaction and how often to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
	pub poll_interval: Duration,
	pub timeout: Duration,
}

impl Default for ConfirmationPolicy {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_secs(2),
			timeout: Duration::from_secs(120),
		}
	}
}

/// Point in time after which a delivery operation gives up.
///
/// Every RPC await runs under the same deadline, so a node that accepts a
/// connection and never answers cannot stretch the bound.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
	at: Instant,
	bound: Duration,
}

impl Deadline {
	pub(crate) fn after(bound: Duration) -> Self {
		Self {
			at: Instant::now() + bound,
			bound,
		}
	}

	pub(crate) fn expired(&self) -> bool {
		Instant::now() >= self.at
	}

	/// Awaits a request sent before anything was broadcast.
	pub(crate) async fn request<F: IntoFuture>(
		&self,
		what: &str,
		fut: F,
	) -> Result<F::Output, DeliveryError> {
		tokio::time::timeout_at(self.at, fut).await.map_err(|_| {
			DeliveryError::Network(format!(
				"{} timed out after {}s",
				what,
				self.bound.as_secs()
			))
		})
	}

	/// Awaits a confirmation lookup for the broadcast transaction `tx`.
	pub(crate) async fn confirm<F: IntoFuture>(
		&self,
		tx: &str,
		fut: F,
	) -> Result<F::Output, DeliveryError> {
		tokio::time::timeout_at(self.at, fut)
			.await
			.map_err(|_| self.timed_out(tx))
	}

	pub(crate) fn timed_out(&self, tx: &str) -> DeliveryError {
		DeliveryError::Timeout {
			tx: tx.to_string(),
			waited_secs: self.bound.as_secs(),
		}
	}

	/// Sleeps for `interval`, waking no later than the deadline.
	pub(crate) async fn sleep(&self, interval: Duration) {
		tokio::time::sleep_until((Instant::now() + interval).min(self.at)).await;
	}
}

/// Result of a mined EVM transaction that did not revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmReceipt {
	pub tx_hash: B256,
	pub block_number: u64,
}

/// Transport for a single EVM chain, bound to one signing account.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EvmClient: Send + Sync {
	/// Address of the signing account.
	fn account(&self) -> Address;

	/// Executes a read-only call and returns the raw return data.
	async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, DeliveryError>;

	/// Simulates, then signs and broadcasts a transaction.
	///
	/// A failed simulation is reported as `DeliveryError::Reverted` and
	/// nothing is broadcast.
	async fn submit(&self, to: Address, input: Bytes) -> Result<B256, DeliveryError>;

	/// Waits for the receipt of `tx_hash`, failing with `Reverted` when the
	/// transaction reverted and with `Timeout` when the bound elapses. The
	/// bound covers the lookups themselves, not only the sleeps between them.
	async fn wait_for_receipt(&self, tx_hash: B256) -> Result<EvmReceipt, DeliveryError>;
}

/// Transport for a single Solana cluster.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SolanaClient: Send + Sync {
	async fn latest_blockhash(&self) -> Result<Hash, DeliveryError>;

	/// Sends a fully signed transaction and waits until the cluster confirms
	/// it, rejects it, or the bound elapses.
	async fn send_and_confirm(&self, tx: &Transaction) -> Result<Signature, DeliveryError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_messages() {
		let err = DeliveryError::Reverted {
			code: Some(6000),
			reason: "Contract is paused".to_string(),
		};
		assert_eq!(err.to_string(), "Transaction reverted: Contract is paused");

		let err = DeliveryError::Timeout {
			tx: "0xabc".to_string(),
			waited_secs: 120,
		};
		assert!(err.to_string().contains("120s"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_deadline_bounds_a_stalled_lookup() {
		let deadline = Deadline::after(Duration::from_secs(5));
		let result = deadline
			.confirm("0xabc", std::future::pending::<()>())
			.await;
		assert_eq!(
			result,
			Err(DeliveryError::Timeout {
				tx: "0xabc".to_string(),
				waited_secs: 5,
			})
		);
		assert!(deadline.expired());

		let result = Deadline::after(Duration::from_secs(5))
			.request("eth_call", std::future::pending::<()>())
			.await;
		assert_eq!(
			result,
			Err(DeliveryError::Network("eth_call timed out after 5s".to_string()))
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_deadline_sleep_stops_at_deadline() {
		let started = Instant::now();
		let deadline = Deadline::after(Duration::from_secs(3));
		deadline.sleep(Duration::from_secs(60)).await;
		let slept = started.elapsed();
		assert!(slept >= Duration::from_secs(3));
		assert!(slept < Duration::from_secs(60));
	}

	#[tokio::test]
	async fn test_mock_clients_are_object_safe() {
		let mut evm = MockEvmClient::new();
		evm.expect_account().return_const(Address::ZERO);
		let evm: Box<dyn EvmClient> = Box::new(evm);
		assert_eq!(evm.account(), Address::ZERO);

		let mut solana = MockSolanaClient::new();
		solana
			.expect_latest_blockhash()
			.returning(|| Ok(Hash::default()));
		let solana: Box<dyn SolanaClient> = Box::new(solana);
		assert_eq!(solana.latest_blockhash().await.unwrap(), Hash::default());
	}
}
