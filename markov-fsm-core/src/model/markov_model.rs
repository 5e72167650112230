use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::Rng;

use crate::error::FsmError;

/// Tolerance applied to row sums when validating a transition matrix.
pub const ROW_SUM_EPSILON: f64 = 1e-9;

/// A first-order Markov chain over string-labelled states.
///
/// The model is immutable once built. Engines share it through an `Arc`,
/// so any number of independent chains may be simulated from one estimate.
///
/// # Invariants
/// - `states` holds unique labels; `state_index[states[i]] == i`
/// - `transition_matrix` is `len(states) x len(states)`
/// - every entry is finite and non-negative, every row sums to at most `1 + ROW_SUM_EPSILON`
/// - an all-zero row means the state was never seen with an outgoing transition
/// - every terminal state is a member of `states`
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
	states: Vec<String>,
	state_index: HashMap<String, usize>,
	transition_matrix: Vec<Vec<f64>>,
	initial_distribution: BTreeMap<String, f64>,
	final_distribution: BTreeMap<String, f64>,
	terminal_states: BTreeSet<String>,
}

impl Model {
	/// Builds a model from an externally supplied state list and matrix.
	///
	/// # Errors
	/// - [`FsmError::MalformedModel`] if the state list is empty or has
	///   duplicates, if the matrix is not square over the states, or if a row
	///   holds a negative/non-finite entry or sums above `1 + ROW_SUM_EPSILON`.
	/// - [`FsmError::InvalidState`] if a terminal label is not a state.
	pub fn new<I>(states: Vec<String>, transition_matrix: Vec<Vec<f64>>, terminal_states: I) -> Result<Self, FsmError>
	where
		I: IntoIterator<Item = String>,
	{
		if states.is_empty() {
			return Err(FsmError::malformed("model has no states"));
		}

		let state_index = index_states(&states).ok_or_else(|| FsmError::malformed("state labels are not unique"))?;

		if transition_matrix.len() != states.len() {
			return Err(FsmError::malformed(format!(
				"transition matrix has {} rows, expected {}",
				transition_matrix.len(),
				states.len()
			)));
		}
		for (i, row) in transition_matrix.iter().enumerate() {
			if row.len() != states.len() {
				return Err(FsmError::malformed(format!(
					"row {} ('{}') has {} entries, expected {}",
					i,
					states[i],
					row.len(),
					states.len()
				)));
			}
		}
		validate_rows(&states, &transition_matrix)?;

		let mut model = Self {
			states,
			state_index,
			transition_matrix,
			initial_distribution: BTreeMap::new(),
			final_distribution: BTreeMap::new(),
			terminal_states: BTreeSet::new(),
		};
		model.set_terminal_states(terminal_states)?;
		Ok(model)
	}

	/// Attaches the empirical start/end distributions of an estimate.
	pub(crate) fn with_distributions(
		mut self,
		initial_distribution: BTreeMap<String, f64>,
		final_distribution: BTreeMap<String, f64>,
	) -> Self {
		self.initial_distribution = initial_distribution;
		self.final_distribution = final_distribution;
		self
	}

	/// Returns a copy of this model with `terminal_states` replaced.
	///
	/// # Errors
	/// Returns [`FsmError::InvalidState`] if a label is not a state.
	pub fn with_terminal_states<I>(mut self, terminal_states: I) -> Result<Self, FsmError>
	where
		I: IntoIterator<Item = String>,
	{
		self.set_terminal_states(terminal_states)?;
		Ok(self)
	}

	fn set_terminal_states<I>(&mut self, terminal_states: I) -> Result<(), FsmError>
	where
		I: IntoIterator<Item = String>,
	{
		let mut terminal = BTreeSet::new();
		for label in terminal_states {
			if !self.state_index.contains_key(&label) {
				return Err(FsmError::invalid_state(label));
			}
			terminal.insert(label);
		}
		self.terminal_states = terminal;
		Ok(())
	}

	/// States in matrix order.
	pub fn states(&self) -> &[String] {
		&self.states
	}

	pub fn len(&self) -> usize {
		self.states.len()
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	/// Label to matrix position mapping.
	pub fn state_index(&self) -> &HashMap<String, usize> {
		&self.state_index
	}

	/// Returns the matrix position of `label`, if it is a state.
	pub fn index_of(&self, label: &str) -> Option<usize> {
		self.state_index.get(label).copied()
	}

	pub fn transition_matrix(&self) -> &[Vec<f64>] {
		&self.transition_matrix
	}

	/// Returns the outgoing probabilities of the state at `index`.
	pub fn row(&self, index: usize) -> &[f64] {
		&self.transition_matrix[index]
	}

	/// Probability of moving from `from` to `to` in one step.
	///
	/// Returns `None` if either label is unknown.
	pub fn probability(&self, from: &str, to: &str) -> Option<f64> {
		let i = self.index_of(from)?;
		let j = self.index_of(to)?;
		Some(self.transition_matrix[i][j])
	}

	/// True when the state at `index` has no observed outgoing transition.
	pub fn is_zero_row(&self, index: usize) -> bool {
		self.transition_matrix[index].iter().all(|p| *p == 0.0)
	}

	/// Empirical probability that a sequence starts in each state.
	///
	/// Empty for models that were not produced by the estimator.
	pub fn initial_distribution(&self) -> &BTreeMap<String, f64> {
		&self.initial_distribution
	}

	/// Empirical probability that a sequence ends in each state.
	///
	/// Empty for models that were not produced by the estimator.
	pub fn final_distribution(&self) -> &BTreeMap<String, f64> {
		&self.final_distribution
	}

	pub fn terminal_states(&self) -> &BTreeSet<String> {
		&self.terminal_states
	}

	pub fn is_terminal(&self, label: &str) -> bool {
		self.terminal_states.contains(label)
	}

	/// Most frequent starting state, ties going to the smallest label.
	pub fn most_likely_initial(&self) -> Option<&str> {
		let mut best: Option<(&str, f64)> = None;
		for (label, p) in &self.initial_distribution {
			match best {
				Some((_, best_p)) if *p <= best_p => {}
				_ => best = Some((label.as_str(), *p)),
			}
		}
		best.map(|(label, _)| label)
	}

	/// Draws the next state index from the row of `from`.
	///
	/// Returns `None` when the row carries no probability mass.
	pub fn sample_next<R: Rng + ?Sized>(&self, from: usize, rng: &mut R) -> Option<usize> {
		sample_weighted(&self.transition_matrix[from], rng)
	}
}

/// Maps each label to its position, or `None` if a label repeats.
pub(crate) fn index_states(states: &[String]) -> Option<HashMap<String, usize>> {
	let mut index = HashMap::with_capacity(states.len());
	for (i, label) in states.iter().enumerate() {
		if index.insert(label.clone(), i).is_some() {
			return None;
		}
	}
	Some(index)
}

fn validate_rows(states: &[String], matrix: &[Vec<f64>]) -> Result<(), FsmError> {
	for (i, row) in matrix.iter().enumerate() {
		let mut sum = 0.0;
		for (j, &p) in row.iter().enumerate() {
			if !p.is_finite() || p < 0.0 {
				return Err(FsmError::malformed(format!(
					"transition {} -> {} has invalid probability {}",
					states[i], states[j], p
				)));
			}
			sum += p;
		}
		if sum > 1.0 + ROW_SUM_EPSILON {
			return Err(FsmError::malformed(format!("row '{}' sums to {}, above 1", states[i], sum)));
		}
	}
	Ok(())
}

/// Weighted random sampling over non-negative weights.
///
/// The probability of selecting an index is proportional to its weight,
/// so rows that sum to less than one are sampled relative to their mass.
///
/// Returns `None` if the total weight is zero.
pub(crate) fn sample_weighted<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
	let total: f64 = weights.iter().sum();
	if total <= 0.0 {
		return None;
	}

	let mut r = rng.random::<f64>() * total;

	let mut fallback = None;
	for (i, &w) in weights.iter().enumerate() {
		if w <= 0.0 {
			continue;
		}
		if r < w {
			return Some(i);
		}
		r -= w;
		fallback = Some(i);
	}

	// Only reached through floating-point rounding on the last bucket
	fallback
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn labels(names: &[&str]) -> Vec<String> {
		names.iter().map(|s| s.to_string()).collect()
	}

	fn two_state() -> Model {
		Model::new(labels(&["A", "B"]), vec![vec![0.25, 0.75], vec![0.0, 0.0]], labels(&["B"])).unwrap()
	}

	#[test]
	fn index_matches_order() {
		let model = two_state();
		for (i, s) in model.states().iter().enumerate() {
			assert_eq!(model.state_index()[s], i);
		}
		assert_eq!(model.index_of("C"), None);
	}

	#[test]
	fn probability_lookup() {
		let model = two_state();
		assert_eq!(model.probability("A", "B"), Some(0.75));
		assert_eq!(model.probability("A", "Z"), None);
		assert!(model.is_zero_row(1));
		assert!(!model.is_zero_row(0));
	}

	#[test]
	fn rejects_duplicate_states() {
		let err = Model::new(labels(&["A", "A"]), vec![vec![0.0; 2]; 2], Vec::new()).unwrap_err();
		assert!(matches!(err, FsmError::MalformedModel { .. }));
	}

	#[test]
	fn rejects_ragged_matrix() {
		let err = Model::new(labels(&["A", "B"]), vec![vec![1.0], vec![0.0, 1.0]], Vec::new()).unwrap_err();
		assert!(matches!(err, FsmError::MalformedModel { .. }));
	}

	#[test]
	fn rejects_negative_entry() {
		let err = Model::new(labels(&["A", "B"]), vec![vec![1.5, -0.5], vec![0.0, 1.0]], Vec::new()).unwrap_err();
		assert!(matches!(err, FsmError::MalformedModel { .. }));
	}

	#[test]
	fn rejects_row_above_one() {
		let err = Model::new(labels(&["A", "B"]), vec![vec![0.6, 0.6], vec![0.0, 1.0]], Vec::new()).unwrap_err();
		assert!(matches!(err, FsmError::MalformedModel { .. }));
	}

	#[test]
	fn tolerates_rounding_in_row_sum() {
		let third = 1.0 / 3.0;
		assert!(Model::new(labels(&["A", "B", "C"]), vec![vec![third; 3]; 3], Vec::new()).is_ok());
	}

	#[test]
	fn rejects_unknown_terminal() {
		let err = Model::new(labels(&["A"]), vec![vec![1.0]], labels(&["Z"])).unwrap_err();
		assert!(matches!(err, FsmError::InvalidState { ref state } if state == "Z"));
	}

	#[test]
	fn most_likely_initial_prefers_smallest_on_tie() {
		let mut initial = BTreeMap::new();
		initial.insert("B".to_string(), 0.5);
		initial.insert("A".to_string(), 0.5);
		let model = two_state().with_distributions(initial, BTreeMap::new());
		assert_eq!(model.most_likely_initial(), Some("A"));
	}

	#[test]
	fn sample_weighted_skips_zero_weights() {
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..200 {
			assert_eq!(sample_weighted(&[0.0, 0.4, 0.0], &mut rng), Some(1));
		}
		assert_eq!(sample_weighted(&[0.0, 0.0], &mut rng), None);
	}

	#[test]
	fn sample_weighted_follows_weights() {
		let mut rng = StdRng::seed_from_u64(42);
		let n = 20_000;
		let hits = (0..n).filter(|_| sample_weighted(&[0.25, 0.75], &mut rng) == Some(1)).count();
		let freq = hits as f64 / n as f64;
		assert!((freq - 0.75).abs() < 0.02, "frequency {freq}, expected ~0.75");
	}
}
