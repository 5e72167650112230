use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::FsmError;

/// Default step budget of a simulation run.
pub const DEFAULT_MAX_STEPS: usize = 5;

/// Parameters of a simulation run.
///
/// # Invariants
/// - `max_steps` is always >= 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationInput {
	/// Maximum number of steps before the run gives up on reaching a terminal state.
	max_steps: usize,

	/// Optional seed; `None` draws fresh entropy for every run.
	pub seed: Option<u64>,
}

impl Default for SimulationInput {
	fn default() -> Self {
		Self {
			max_steps: DEFAULT_MAX_STEPS,
			seed: None,
		}
	}
}

impl SimulationInput {
	/// Creates an input with the given step budget.
	///
	/// # Errors
	/// Returns [`FsmError::InvalidInput`] if `max_steps` is zero.
	pub fn new(max_steps: usize) -> Result<Self, FsmError> {
		let mut input = Self::default();
		input.set_max_steps(max_steps)?;
		Ok(input)
	}

	pub fn max_steps(&self) -> usize {
		self.max_steps
	}

	/// Sets the step budget.
	///
	/// # Errors
	/// Returns an error if `max_steps` is zero.
	pub fn set_max_steps(&mut self, max_steps: usize) -> Result<(), FsmError> {
		if max_steps == 0 {
			return Err(FsmError::invalid_input("max_steps must be at least 1"));
		}
		self.max_steps = max_steps;
		Ok(())
	}

	/// Builds the random generator for a run.
	///
	/// Seeded inputs always yield the same stream.
	pub fn rng(&self) -> StdRng {
		match self.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_rng(&mut rand::rng()),
		}
	}
}
