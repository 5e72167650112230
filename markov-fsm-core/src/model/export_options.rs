use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::FsmError;

/// Strategy used to pick the `initial` state written to a model configuration.
///
/// # Variants
/// - `Mode`: the most frequent first state of the corpus (default).
/// - `Random`: a first state drawn from the initial distribution.
/// - `Custom(String)`: the given label, which must be a model state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StartState {
	#[default]
	Mode,
	Random,
	Custom(String),
}

impl FromStr for StartState {
	type Err = FsmError;

	/// Parses `mode`, `random` or `custom:<label>`.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		const CUSTOM: &str = "custom:";
		if s.eq_ignore_ascii_case("mode") {
			Ok(StartState::Mode)
		} else if s.eq_ignore_ascii_case("random") {
			Ok(StartState::Random)
		} else if s.get(..CUSTOM.len()).is_some_and(|p| p.eq_ignore_ascii_case(CUSTOM)) {
			let value = s[CUSTOM.len()..].trim();
			if value.is_empty() {
				Err(FsmError::invalid_input("custom start state cannot be empty"))
			} else {
				Ok(StartState::Custom(value.to_owned()))
			}
		} else {
			Err(FsmError::invalid_input(format!(
				"start state must be 'mode', 'random' or 'custom:<label>', got '{}'",
				s
			)))
		}
	}
}

/// Options applied when an estimate is exported as a model configuration.
///
/// # Responsibilities
/// - Choose how the `initial` state is picked (`start_state`)
/// - Optionally override the terminal states, which otherwise default to
///   the states sequences were observed to end in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
	pub start_state: StartState,

	/// Explicit terminal labels; `None` keeps the default.
	terminal_states: Option<BTreeSet<String>>,
}

impl ExportOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_start_state(mut self, start_state: StartState) -> Self {
		self.start_state = start_state;
		self
	}

	/// Overrides the terminal states.
	///
	/// # Errors
	/// Returns an error if a label is empty after trimming.
	pub fn set_terminal_states<I, S>(&mut self, labels: I) -> Result<(), FsmError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut terminal = BTreeSet::new();
		for label in labels {
			let label = label.as_ref().trim();
			if label.is_empty() {
				return Err(FsmError::invalid_input("terminal state label cannot be empty"));
			}
			terminal.insert(label.to_owned());
		}
		self.terminal_states = Some(terminal);
		Ok(())
	}

	/// Drops a previous override.
	pub fn clear_terminal_states(&mut self) {
		self.terminal_states = None;
	}

	pub fn terminal_states(&self) -> Option<&BTreeSet<String>> {
		self.terminal_states.as_ref()
	}
}
