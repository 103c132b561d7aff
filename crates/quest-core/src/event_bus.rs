//! Event bus for quest progress.
//!
//! A thin wrapper around a tokio broadcast channel. Every attempt's
//! `StepReporter` publishes onto the same bus, so one subscriber sees the
//! progress of all attempts and filters by quest id.

use quest_types::{QuestEvent, StepReporter};
use tokio::sync::broadcast;

/// Broadcast channel for `QuestEvent`s.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<QuestEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per subscriber.
	/// Slow subscribers lose the oldest events first.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<QuestEvent> {
		self.sender.subscribe()
	}

	/// Creates a reporter for one attempt that publishes onto this bus.
	pub fn reporter(&self, quest_id: impl Into<String>, chain_id: impl Into<String>) -> StepReporter {
		StepReporter::new(quest_id, chain_id, self.sender.clone())
	}
}
