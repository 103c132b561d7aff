//! Alloy-based EVM transport.
//!
//! Wraps an HTTP provider whose wallet filler signs with the session's EVM
//! key. Every submission is simulated with `eth_call` first so that a
//! contract revert is reported with its reason instead of burning gas.
//! Every provider await runs under the policy's timeout.

use crate::{ConfirmationPolicy, Deadline, DeliveryError, EvmClient, EvmReceipt};
use alloy_primitives::{Address, Bytes, B256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::decode_revert_reason;
use alloy_transport::TransportError;
use alloy_transport_http::Http;
use async_trait::async_trait;
use quest_account::EvmWallet;
use std::sync::Arc;

/// Prefix geth-compatible nodes put in front of revert messages.
const EXECUTION_REVERTED: &str = "execution reverted";

/// EVM transport for one chain.
pub struct AlloyEvmClient {
	chain_id: u64,
	account: Address,
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
	policy: ConfirmationPolicy,
}

impl AlloyEvmClient {
	/// Creates a client for `chain_id` at `rpc_url`, signing with `wallet`.
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		wallet: &EvmWallet,
		policy: ConfirmationPolicy,
	) -> Result<Self, DeliveryError> {
		let url = rpc_url.parse().map_err(|e| {
			DeliveryError::Network(format!("Invalid RPC URL for chain {}: {}", chain_id, e))
		})?;

		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(wallet.ethereum_wallet(chain_id))
			.on_http(url);
		provider.client().set_poll_interval(policy.poll_interval);

		Ok(Self {
			chain_id,
			account: wallet.address(),
			provider: Arc::new(provider) as Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
			policy,
		})
	}
}

#[async_trait]
impl EvmClient for AlloyEvmClient {
	fn account(&self) -> Address {
		self.account
	}

	async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, DeliveryError> {
		let request = TransactionRequest::default()
			.from(self.account)
			.to(to)
			.input(input.into());

		Deadline::after(self.policy.timeout)
			.request("eth_call", self.provider.call(&request))
			.await?
			.map_err(|e| classify_rpc_error(&e))
	}

	async fn submit(&self, to: Address, input: Bytes) -> Result<B256, DeliveryError> {
		let deadline = Deadline::after(self.policy.timeout);
		let request = TransactionRequest::default()
			.from(self.account)
			.to(to)
			.input(input.into());

		deadline
			.request("eth_call", self.provider.call(&request))
			.await?
			.map_err(|e| {
				let err = classify_rpc_error(&e);
				tracing::warn!(chain_id = self.chain_id, to = %to, error = %err, "Simulation failed");
				err
			})?;

		let pending = deadline
			.request("eth_sendTransaction", self.provider.send_transaction(request))
			.await?
			.map_err(|e| classify_rpc_error(&e))?;

		let tx_hash = *pending.tx_hash();
		tracing::info!(tx_hash = %tx_hash, chain_id = self.chain_id, "Submitted transaction");
		Ok(tx_hash)
	}

	async fn wait_for_receipt(&self, tx_hash: B256) -> Result<EvmReceipt, DeliveryError> {
		let deadline = Deadline::after(self.policy.timeout);
		let tx = tx_hash.to_string();

		loop {
			let lookup = deadline
				.confirm(&tx, self.provider.get_transaction_receipt(tx_hash))
				.await?;
			match lookup {
				Ok(Some(receipt)) => {
					let block_number = receipt.block_number.unwrap_or_default();
					if !receipt.status() {
						return Err(DeliveryError::Reverted {
							code: None,
							reason: format!("transaction {} reverted in block {}", tx_hash, block_number),
						});
					}
					tracing::info!(
						tx_hash = %tx_hash,
						chain_id = self.chain_id,
						block_number,
						"Transaction confirmed"
					);
					return Ok(EvmReceipt {
						tx_hash,
						block_number,
					});
				},
				Ok(None) => {},
				// Load balanced RPCs sometimes fail a lookup for a fresh hash.
				Err(e) => tracing::debug!(tx_hash = %tx_hash, error = %e, "Receipt lookup failed"),
			}

			if deadline.expired() {
				return Err(deadline.timed_out(&tx));
			}
			deadline.sleep(self.policy.poll_interval).await;
		}
	}
}

/// Maps an RPC failure onto a delivery error, decoding revert data when the
/// node returned any.
fn classify_rpc_error(err: &TransportError) -> DeliveryError {
	if let Some(payload) = err.as_error_resp() {
		if let Some(data) = payload.as_revert_data() {
			return DeliveryError::Reverted {
				code: None,
				reason: revert_reason(&data),
			};
		}
		if let Some(reason) = reason_from_message(&payload.message) {
			return DeliveryError::Reverted { code: None, reason };
		}
		return DeliveryError::Network(payload.message.to_string());
	}
	DeliveryError::Network(err.to_string())
}

/// Decodes ABI encoded revert data, falling back to the raw hex.
fn revert_reason(data: &[u8]) -> String {
	if data.is_empty() {
		return EXECUTION_REVERTED.to_string();
	}
	match decode_revert_reason(data) {
		Some(reason) if !reason.trim().is_empty() => reason,
		_ => format!("{} (0x{})", EXECUTION_REVERTED, hex::encode(data)),
	}
}

/// Extracts the reason from a node message such as
/// `execution reverted: Deadline must be in the future`.
fn reason_from_message(message: &str) -> Option<String> {
	let rest = message.strip_prefix(EXECUTION_REVERTED)?;
	let reason = rest.trim_start_matches(':').trim();
	if reason.is_empty() {
		Some(EXECUTION_REVERTED.to_string())
	} else {
		Some(reason.to_string())
	}
}
