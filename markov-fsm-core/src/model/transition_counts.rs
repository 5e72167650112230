use std::collections::BTreeMap;

use crate::error::FsmError;

/// Observed outgoing transitions of one source state.
///
/// Conceptually, this is a row of the count matrix: each entry is the
/// number of times `source -> target` was observed in the corpus.
///
/// ## Invariants
/// - All transitions belong to the same `source`
/// - Each stored count is strictly positive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionCounts {
	/// Label of the source state.
	source: String,
	/// Occurrences indexed by target label.
	/// Example: { "B" => 2, "C" => 1 }
	targets: BTreeMap<String, usize>,
}

impl TransitionCounts {
	/// Creates an empty row for the given source state.
	pub fn new(source: &str) -> Self {
		Self {
			source: source.to_owned(),
			targets: BTreeMap::new(),
		}
	}

	/// Records one occurrence of `source -> target`.
	pub fn add_transition(&mut self, target: &str) {
		match self.targets.get_mut(target) {
			Some(count) => *count += 1,
			None => {
				self.targets.insert(target.to_owned(), 1);
			}
		}
	}

	/// Label these counts leave from.
	pub fn source(&self) -> &str {
		&self.source
	}

	/// Total number of outgoing transitions observed.
	pub fn total(&self) -> usize {
		self.targets.values().sum()
	}

	/// Number of times `source -> target` was observed.
	pub fn count(&self, target: &str) -> usize {
		self.targets.get(target).copied().unwrap_or(0)
	}

	/// Iterates over `(target, count)` pairs in label order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
		self.targets.iter().map(|(k, v)| (k.as_str(), *v))
	}

	/// Merges another row of the same source into this one.
	///
	/// Counts are summed; used when partial counts from worker threads
	/// are folded together.
	///
	/// # Errors
	/// Returns [`FsmError::InvalidInput`] if the sources differ.
	pub fn merge(&mut self, other: &Self) -> Result<(), FsmError> {
		if self.source != other.source {
			return Err(FsmError::invalid_input(format!(
				"cannot merge transitions of '{}' into '{}'",
				other.source, self.source
			)));
		}

		for (target, count) in &other.targets {
			*self.targets.entry(target.clone()).or_insert(0) += *count;
		}

		Ok(())
	}
}
