//! Step timeline types.
//!
//! Every quest-creation attempt is shown to the user as a two entry timeline
//! ("Token Approval", then "Quest Creation"). Each entry moves forward only:
//! pending -> processing -> success | error. A pending step may also jump
//! straight to a terminal state (e.g. Solana approval is reported as success
//! without ever processing).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The two steps of the quest funding flow, in timeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
	#[serde(rename = "Token Approval")]
	TokenApproval,
	#[serde(rename = "Quest Creation")]
	QuestCreation,
}

impl StepKind {
	/// Human label rendered in the timeline.
	pub fn title(&self) -> &'static str {
		match self {
			StepKind::TokenApproval => "Token Approval",
			StepKind::QuestCreation => "Quest Creation",
		}
	}

	/// Position of the step in the timeline.
	pub fn position(&self) -> usize {
		match self {
			StepKind::TokenApproval => 0,
			StepKind::QuestCreation => 1,
		}
	}

	/// All steps in timeline order.
	pub fn all() -> [StepKind; 2] {
		[StepKind::TokenApproval, StepKind::QuestCreation]
	}
}

impl fmt::Display for StepKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.title())
	}
}

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
	Pending,
	Processing,
	Success,
	Error,
}

impl StepStatus {
	fn rank(self) -> u8 {
		match self {
			StepStatus::Pending => 0,
			StepStatus::Processing => 1,
			StepStatus::Success | StepStatus::Error => 2,
		}
	}

	/// Returns true if moving from `self` to `next` keeps the step moving forward.
	pub fn can_transition_to(self, next: StepStatus) -> bool {
		next.rank() > self.rank()
	}
}

impl fmt::Display for StepStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			StepStatus::Pending => "pending",
			StepStatus::Processing => "processing",
			StepStatus::Success => "success",
			StepStatus::Error => "error",
		};
		f.write_str(s)
	}
}

/// One entry of the progress timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
	pub title: StepKind,
	pub status: StepStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

/// Rejected step update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Step '{step}' cannot move from {from} to {to}")]
pub struct StepTransitionError {
	pub step: StepKind,
	pub from: StepStatus,
	pub to: StepStatus,
}

/// Ordered step list for a single quest-creation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
	steps: Vec<Step>,
}

impl Default for Timeline {
	fn default() -> Self {
		Self::new()
	}
}

impl Timeline {
	/// Creates a timeline with every step pending.
	pub fn new() -> Self {
		Self {
			steps: StepKind::all()
				.into_iter()
				.map(|title| Step {
					title,
					status: StepStatus::Pending,
					message: None,
				})
				.collect(),
		}
	}

	/// Applies an update, refusing any transition that would move a step backwards.
	pub fn apply(
		&mut self,
		kind: StepKind,
		status: StepStatus,
		message: Option<String>,
	) -> Result<&Step, StepTransitionError> {
		let step = &mut self.steps[kind.position()];

		if !step.status.can_transition_to(status) {
			return Err(StepTransitionError {
				step: kind,
				from: step.status,
				to: status,
			});
		}

		step.status = status;
		step.message = message;
		Ok(step)
	}

	pub fn get(&self, kind: StepKind) -> &Step {
		&self.steps[kind.position()]
	}

	pub fn steps(&self) -> &[Step] {
		&self.steps
	}
}
