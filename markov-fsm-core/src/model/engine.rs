use std::sync::Arc;

use rand::Rng;

use super::markov_model::Model;
use super::simulation_input::SimulationInput;
use crate::error::FsmError;

/// One transition taken by [`StochasticEngine::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
	/// 1-based position of the step within the run.
	pub step: usize,
	pub from: String,
	pub to: String,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
	/// A terminal state was entered (or the engine was already terminated).
	Terminated,
	/// The step budget was exhausted.
	StepLimit,
	/// The current state has no outgoing probability; further steps are self-loops.
	Absorbed,
}

/// Result of [`StochasticEngine::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
	pub transitions: Vec<Transition>,
	pub stop: StopReason,
}

/// Stochastic finite-state machine driven by a [`Model`].
///
/// # Responsibilities
/// - Hold the current state and the sticky `terminated` flag
/// - Take weighted-random steps along the model rows
/// - Flag termination as soon as a step enters a terminal state
///
/// The model is shared read-only; each engine owns only its position,
/// so independent chains can run from one model on separate threads.
#[derive(Debug, Clone)]
pub struct StochasticEngine {
	model: Arc<Model>,
	initial: usize,
	current: usize,
	terminated: bool,
}

impl StochasticEngine {
	/// Creates an engine positioned at `initial_state`.
	///
	/// Construction never checks terminality: only a completed step can set
	/// the `terminated` flag.
	///
	/// # Errors
	/// Returns [`FsmError::InvalidState`] if `initial_state` is not a model state.
	pub fn new(model: Arc<Model>, initial_state: &str) -> Result<Self, FsmError> {
		let initial = model.index_of(initial_state).ok_or_else(|| FsmError::invalid_state(initial_state))?;
		Ok(Self {
			model,
			initial,
			current: initial,
			terminated: false,
		})
	}

	/// Rebuilds an engine at an arbitrary position, used by snapshot restore.
	pub(crate) fn resume(
		model: Arc<Model>,
		initial_state: &str,
		current_state: &str,
		terminated: bool,
	) -> Result<Self, FsmError> {
		let mut engine = Self::new(model, initial_state)?;
		engine.current = engine
			.model
			.index_of(current_state)
			.ok_or_else(|| FsmError::invalid_state(current_state))?;
		engine.terminated = terminated;
		Ok(engine)
	}

	pub fn model(&self) -> &Arc<Model> {
		&self.model
	}

	pub fn current_state(&self) -> &str {
		&self.model.states()[self.current]
	}

	/// The state this engine was constructed with.
	pub fn initial_state(&self) -> &str {
		&self.model.states()[self.initial]
	}

	/// True once a step has entered a terminal state. Never reset.
	pub fn is_terminated(&self) -> bool {
		self.terminated
	}

	/// Takes one step using the thread-local random generator.
	pub fn step(&mut self) -> &str {
		self.step_with(&mut rand::rng())
	}

	/// Takes one step using `rng`.
	///
	/// 1. Draws the next state from the current row, weighted by its entries.
	/// 2. Moves there and sets `terminated` if it is a terminal state.
	///
	/// A row without probability mass is a self-loop: the state is kept and
	/// no transition is considered taken, so the terminal check is skipped.
	///
	/// Stepping after termination is allowed; the flag stays set.
	///
	/// Returns the new current state.
	pub fn step_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &str {
		if self.advance(rng).is_none() {
			tracing::warn!("'{}' has no outgoing transitions, staying", self.current_state());
		}
		self.current_state()
	}

	/// Steps and reports the index entered, or `None` for a zero-row self-loop.
	fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
		let next = self.model.sample_next(self.current, rng)?;
		self.current = next;
		if self.model.is_terminal(self.current_state()) {
			self.terminated = true;
		}
		Some(next)
	}

	/// Steps until a terminal state is entered or `max_steps` steps were taken.
	///
	/// Stops early, without consuming the remaining budget, when the current
	/// state has no outgoing transitions. An engine that is already terminated
	/// takes no step.
	pub fn run<R: Rng + ?Sized>(&mut self, max_steps: usize, rng: &mut R) -> Trace {
		let mut transitions = Vec::new();

		for step in 1..=max_steps {
			if self.terminated {
				break;
			}
			let from = self.current_state().to_owned();
			if self.advance(rng).is_none() {
				tracing::warn!("'{}' has no outgoing transitions, stopping after {} steps", from, step - 1);
				return Trace { transitions, stop: StopReason::Absorbed };
			}
			tracing::debug!("step {}: {} -> {}", step, from, self.current_state());
			transitions.push(Transition {
				step,
				from,
				to: self.current_state().to_owned(),
			});
		}

		let stop = if self.terminated { StopReason::Terminated } else { StopReason::StepLimit };
		Trace { transitions, stop }
	}

	/// Runs with the step budget and random source of `input`.
	pub fn simulate(&mut self, input: &SimulationInput) -> Trace {
		let mut rng = input.rng();
		self.run(input.max_steps(), &mut rng)
	}
}
