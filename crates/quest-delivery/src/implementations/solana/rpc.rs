//! Solana JSON-RPC transport.
//!
//! Sends signed transactions with preflight enabled, then polls the
//! signature status at `confirmed` commitment until the cluster accepts or
//! rejects the transaction, or the bound elapses. The bound covers the RPC
//! requests as well as the polling.

use crate::{ConfirmationPolicy, Deadline, DeliveryError, SolanaClient};
use async_trait::async_trait;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::InstructionError;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, TransactionError};

/// Solana transport for one cluster.
pub struct RpcSolanaClient {
	client: RpcClient,
	policy: ConfirmationPolicy,
}

impl RpcSolanaClient {
	pub fn new(rpc_url: &str, policy: ConfirmationPolicy) -> Self {
		Self {
			client: RpcClient::new_with_timeout_and_commitment(
				rpc_url.to_string(),
				policy.timeout,
				CommitmentConfig::confirmed(),
			),
			policy,
		}
	}
}

#[async_trait]
impl SolanaClient for RpcSolanaClient {
	async fn latest_blockhash(&self) -> Result<Hash, DeliveryError> {
		Deadline::after(self.policy.timeout)
			.request("getLatestBlockhash", self.client.get_latest_blockhash())
			.await?
			.map_err(|e| DeliveryError::Network(format!("Failed to fetch blockhash: {}", e)))
	}

	async fn send_and_confirm(&self, tx: &Transaction) -> Result<Signature, DeliveryError> {
		let deadline = Deadline::after(self.policy.timeout);
		let signature = deadline
			.request("sendTransaction", self.client.send_transaction(tx))
			.await?
			.map_err(classify_client_error)?;
		tracing::info!(signature = %signature, "Submitted transaction");

		let sig = signature.to_string();
		loop {
			let status = deadline
				.confirm(&sig, self.client.get_signature_status(&signature))
				.await?;
			match status {
				Ok(Some(Ok(()))) => {
					tracing::info!(signature = %signature, "Transaction confirmed");
					return Ok(signature);
				},
				Ok(Some(Err(e))) => return Err(classify_transaction_error(&e)),
				Ok(None) => {},
				Err(e) => tracing::debug!(signature = %signature, error = %e, "Status lookup failed"),
			}

			if deadline.expired() {
				return Err(deadline.timed_out(&sig));
			}
			deadline.sleep(self.policy.poll_interval).await;
		}
	}
}

/// Preflight failures carry the transaction error; anything else is a
/// transport problem.
fn classify_client_error(err: ClientError) -> DeliveryError {
	match err.get_transaction_error() {
		Some(tx_err) => classify_transaction_error(&tx_err),
		None => DeliveryError::Network(err.to_string()),
	}
}

fn classify_transaction_error(err: &TransactionError) -> DeliveryError {
	match err {
		TransactionError::InstructionError(_, InstructionError::Custom(code)) => {
			DeliveryError::Reverted {
				code: Some(*code),
				reason: format!("custom program error: {:#x}", code),
			}
		},
		other => DeliveryError::Reverted {
			code: None,
			reason: other.to_string(),
		},
	}
}
