//! Progress events for quest-creation attempts.
//!
//! Chain managers never talk to the UI directly. They report step updates
//! through a `StepReporter`, which validates the update against the attempt's
//! timeline and then publishes it on a broadcast channel that any number of
//! subscribers (CLI printer, HTTP stream, tests) can observe.

use crate::step::{Step, StepKind, StepStatus, Timeline};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// A step update tagged with the attempt it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepUpdate {
	pub quest_id: String,
	pub chain_id: String,
	pub step: Step,
}

/// Events published while quests are being created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestEvent {
	/// A timeline step changed status.
	Step(StepUpdate),
	/// A user-visible notice that is not tied to a step (e.g. "coming soon").
	Notice {
		quest_id: String,
		chain_id: String,
		message: String,
	},
}

impl QuestEvent {
	pub fn quest_id(&self) -> &str {
		match self {
			QuestEvent::Step(update) => &update.quest_id,
			QuestEvent::Notice { quest_id, .. } => quest_id,
		}
	}
}

/// Reports progress for one quest-creation attempt.
///
/// Cloning a reporter shares the same timeline, so the dispatcher and the
/// manager it delegates to always agree on the current state of each step.
#[derive(Clone)]
pub struct StepReporter {
	quest_id: String,
	chain_id: String,
	sender: broadcast::Sender<QuestEvent>,
	timeline: Arc<Mutex<Timeline>>,
}

impl std::fmt::Debug for StepReporter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StepReporter")
			.field("quest_id", &self.quest_id)
			.field("chain_id", &self.chain_id)
			.finish()
	}
}

impl StepReporter {
	/// Creates a reporter publishing onto an existing channel.
	pub fn new(
		quest_id: impl Into<String>,
		chain_id: impl Into<String>,
		sender: broadcast::Sender<QuestEvent>,
	) -> Self {
		Self {
			quest_id: quest_id.into(),
			chain_id: chain_id.into(),
			sender,
			timeline: Arc::new(Mutex::new(Timeline::new())),
		}
	}

	/// Creates a reporter nobody is subscribed to yet. Updates are still
	/// tracked on the timeline.
	pub fn detached(quest_id: impl Into<String>, chain_id: impl Into<String>) -> Self {
		let (sender, _) = broadcast::channel(16);
		Self::new(quest_id, chain_id, sender)
	}

	pub fn quest_id(&self) -> &str {
		&self.quest_id
	}

	pub fn chain_id(&self) -> &str {
		&self.chain_id
	}

	/// Subscribes to the channel this reporter publishes on.
	pub fn subscribe(&self) -> broadcast::Receiver<QuestEvent> {
		self.sender.subscribe()
	}

	/// Snapshot of the attempt's timeline.
	pub fn timeline(&self) -> Timeline {
		self.lock().clone()
	}

	/// Applies and publishes a step update.
	///
	/// Returns false if the update would move the step backwards; such
	/// updates are logged and dropped.
	pub fn report(&self, kind: StepKind, status: StepStatus, message: Option<String>) -> bool {
		let step = {
			let mut timeline = self.lock();
			match timeline.apply(kind, status, message) {
				Ok(step) => step.clone(),
				Err(e) => {
					tracing::warn!(
						quest_id = %self.quest_id,
						chain_id = %self.chain_id,
						error = %e,
						"Dropped out-of-order step update"
					);
					return false;
				},
			}
		};

		tracing::debug!(
			quest_id = %self.quest_id,
			chain_id = %self.chain_id,
			step = %step.title,
			status = %step.status,
			"Step update"
		);

		let event = QuestEvent::Step(StepUpdate {
			quest_id: self.quest_id.clone(),
			chain_id: self.chain_id.clone(),
			step,
		});
		// No subscribers is fine, the timeline still records the update.
		let _ = self.sender.send(event);
		true
	}

	pub fn processing(&self, kind: StepKind) -> bool {
		self.report(kind, StepStatus::Processing, None)
	}

	pub fn success(&self, kind: StepKind, message: Option<String>) -> bool {
		self.report(kind, StepStatus::Success, message)
	}

	pub fn error(&self, kind: StepKind, message: impl Into<String>) -> bool {
		self.report(kind, StepStatus::Error, Some(message.into()))
	}

	/// Publishes a user-visible notice that does not change the timeline.
	pub fn notice(&self, message: impl Into<String>) {
		let message = message.into();
		tracing::info!(
			quest_id = %self.quest_id,
			chain_id = %self.chain_id,
			"{}",
			message
		);
		let _ = self.sender.send(QuestEvent::Notice {
			quest_id: self.quest_id.clone(),
			chain_id: self.chain_id.clone(),
			message,
		});
	}

	fn lock(&self) -> MutexGuard<'_, Timeline> {
		self.timeline
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}
