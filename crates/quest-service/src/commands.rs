//! CLI commands run against a built dispatcher.

use alloy_primitives::U256;
use quest_core::QuestDispatcher;
use quest_types::{QuestCreationParams, QuestEvent, StepStatus};
use std::future::Future;
use tokio::sync::broadcast;

/// Prints the registered chains in registry order.
pub fn list_chains(dispatcher: &QuestDispatcher) {
	for chain in dispatcher.available_chains() {
		let status = if dispatcher.is_operational(&chain.id) {
			"ready"
		} else {
			"coming soon"
		};
		println!(
			"{:<18} {:<18} {:<7} {:<4} {:<8} {}",
			chain.id,
			chain.name,
			chain.chain_type.to_string(),
			chain.native_currency.symbol,
			if chain.is_testnet { "testnet" } else { "mainnet" },
			status
		);
	}
}

pub async fn allowance(
	dispatcher: &QuestDispatcher,
	chain: &str,
	token: &str,
	amount: U256,
) -> Result<(), Box<dyn std::error::Error>> {
	let sufficient = dispatcher.check_allowance(chain, token, amount).await?;
	if sufficient {
		println!("Allowance covers {} on {}", amount, chain);
	} else {
		println!("Approval required for {} on {}", amount, chain);
	}
	Ok(())
}

pub async fn approve(
	dispatcher: &QuestDispatcher,
	chain: &str,
	quest_id: &str,
	token: &str,
	amount: U256,
) -> Result<(), Box<dyn std::error::Error>> {
	let reporter = dispatcher.reporter(quest_id, chain);
	let rx = dispatcher.event_bus().subscribe();

	with_progress(
		rx,
		quest_id,
		dispatcher.approve_tokens(chain, token, amount, &reporter),
	)
	.await?;
	Ok(())
}

pub async fn create(
	dispatcher: &QuestDispatcher,
	chain: &str,
	params: QuestCreationParams,
) -> Result<(), Box<dyn std::error::Error>> {
	let reporter = dispatcher.reporter(&params.quest_id, chain);
	let rx = dispatcher.event_bus().subscribe();

	let result = with_progress(
		rx,
		&params.quest_id,
		dispatcher.create_multi_chain_quest(chain, &params, &reporter),
	)
	.await?;

	println!("{}", serde_json::to_string_pretty(&result)?);
	Ok(())
}

/// Drives `operation` while printing the attempt's progress events.
async fn with_progress<F, T>(
	mut rx: broadcast::Receiver<QuestEvent>,
	quest_id: &str,
	operation: F,
) -> T
where
	F: Future<Output = T>,
{
	tokio::pin!(operation);

	let output = loop {
		tokio::select! {
			output = &mut operation => break output,
			Ok(event) = rx.recv() => {
				if event.quest_id() == quest_id {
					println!("{}", format_event(&event));
				}
			}
		}
	};

	// Updates published right before completion are still queued.
	while let Ok(event) = rx.try_recv() {
		if event.quest_id() == quest_id {
			println!("{}", format_event(&event));
		}
	}
	output
}

/// One line per event, e.g. `[Token Approval] success: 0xabc`.
pub fn format_event(event: &QuestEvent) -> String {
	match event {
		QuestEvent::Step(update) => {
			let marker = match update.step.status {
				StepStatus::Pending => " ",
				StepStatus::Processing => "~",
				StepStatus::Success => "+",
				StepStatus::Error => "!",
			};
			match &update.step.message {
				Some(message) => format!(
					"{} [{}] {}: {}",
					marker, update.step.title, update.step.status, message
				),
				None => format!("{} [{}] {}", marker, update.step.title, update.step.status),
			}
		},
		QuestEvent::Notice { chain_id, message, .. } => format!("* {} ({})", message, chain_id),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use quest_types::{Step, StepKind, StepUpdate};

	fn update(status: StepStatus, message: Option<&str>) -> QuestEvent {
		QuestEvent::Step(StepUpdate {
			quest_id: "q1".into(),
			chain_id: "base-mainnet".into(),
			step: Step {
				title: StepKind::TokenApproval,
				status,
				message: message.map(str::to_string),
			},
		})
	}

	#[test]
	fn test_format_step_events() {
		assert_eq!(
			format_event(&update(StepStatus::Processing, None)),
			"~ [Token Approval] processing"
		);
		assert_eq!(
			format_event(&update(StepStatus::Error, Some("execution reverted"))),
			"! [Token Approval] error: execution reverted"
		);
	}

	#[test]
	fn test_format_notice() {
		let event = QuestEvent::Notice {
			quest_id: "q1".into(),
			chain_id: "polygon-mainnet".into(),
			message: "Polygon quests are coming soon".into(),
		};
		assert_eq!(
			format_event(&event),
			"* Polygon quests are coming soon (polygon-mainnet)"
		);
	}

	#[tokio::test]
	async fn test_with_progress_returns_operation_output() {
		let (tx, rx) = broadcast::channel(8);
		let output = with_progress(rx, "q1", async move {
			let _ = tx.send(update(StepStatus::Success, None));
			42
		})
		.await;
		assert_eq!(output, 42);
	}
}
