use std::collections::{BTreeMap, BTreeSet};

use super::markov_model::Model;
use super::transition_counts::TransitionCounts;
use crate::error::FsmError;

/// Raw occurrence counts gathered from a corpus of state sequences.
///
/// # Responsibilities
/// - Ingest sequences and accumulate transition, start and end counts
/// - Merge with partial counts built on another thread
/// - Normalize into a [`Model`]
///
/// # Invariants
/// - Every label seen anywhere is in `labels`
/// - `sequences` equals the sum of `starts` and the sum of `ends`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceCounts {
	/// Outgoing transition counts keyed by source label
	rows: BTreeMap<String, TransitionCounts>,
	labels: BTreeSet<String>,
	starts: BTreeMap<String, usize>,
	ends: BTreeMap<String, usize>,
	sequences: usize,
}

impl SequenceCounts {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds one observed sequence.
	///
	/// Every consecutive pair is counted as a transition. A sequence of one
	/// label contributes to the start and end counts only.
	///
	/// # Errors
	/// Returns [`FsmError::InvalidInput`] if the sequence is empty.
	pub fn add_sequence<S: AsRef<str>>(&mut self, sequence: &[S]) -> Result<(), FsmError> {
		let (first, last) = match (sequence.first(), sequence.last()) {
			(Some(first), Some(last)) => (first.as_ref(), last.as_ref()),
			_ => return Err(FsmError::invalid_input("sequence is empty")),
		};

		for label in sequence {
			if !self.labels.contains(label.as_ref()) {
				self.labels.insert(label.as_ref().to_owned());
			}
		}

		for pair in sequence.windows(2) {
			let (current, next) = (pair[0].as_ref(), pair[1].as_ref());
			self.rows
				.entry(current.to_owned())
				.or_insert_with(|| TransitionCounts::new(current))
				.add_transition(next);
		}

		*self.starts.entry(first.to_owned()).or_insert(0) += 1;
		*self.ends.entry(last.to_owned()).or_insert(0) += 1;
		self.sequences += 1;
		Ok(())
	}

	/// Number of sequences ingested so far.
	pub fn sequences(&self) -> usize {
		self.sequences
	}

	/// Every label seen, in sorted order.
	pub fn labels(&self) -> impl Iterator<Item = &str> {
		self.labels.iter().map(String::as_str)
	}

	/// Outgoing counts of `source`, if it was ever seen before another label.
	pub fn transitions(&self, source: &str) -> Option<&TransitionCounts> {
		self.rows.get(source)
	}

	/// Merges counts built from another part of the corpus.
	pub fn merge(&mut self, other: &Self) -> Result<(), FsmError> {
		for (source, row) in &other.rows {
			if let Some(existing) = self.rows.get_mut(source) {
				existing.merge(row)?;
			} else {
				self.rows.insert(row.source().to_owned(), row.clone());
			}
		}
		for (label, count) in &other.starts {
			*self.starts.entry(label.clone()).or_insert(0) += *count;
		}
		for (label, count) in &other.ends {
			*self.ends.entry(label.clone()).or_insert(0) += *count;
		}
		self.labels.extend(other.labels.iter().cloned());
		self.sequences += other.sequences;
		Ok(())
	}

	/// Normalizes the counts into a [`Model`] with no terminal states.
	///
	/// - States are the sorted union of all labels.
	/// - Each matrix row is divided by its total; a row with no outgoing
	///   transitions stays all zeros.
	/// - Start and end distributions are divided by the number of sequences.
	///
	/// # Errors
	/// Returns [`FsmError::InvalidInput`] if no sequence was added.
	pub fn into_model(self) -> Result<Model, FsmError> {
		if self.sequences == 0 {
			return Err(FsmError::invalid_input("corpus is empty"));
		}

		let states: Vec<String> = self.labels.into_iter().collect();
		let n = states.len();

		let mut matrix = vec![vec![0.0; n]; n];
		for (i, source) in states.iter().enumerate() {
			let Some(row) = self.rows.get(source) else {
				continue;
			};
			// A zero total keeps the row at zero instead of faulting
			let total = row.total().max(1) as f64;
			for (j, target) in states.iter().enumerate() {
				matrix[i][j] = row.count(target) as f64 / total;
			}
		}

		let total = self.sequences as f64;
		let initial = self.starts.into_iter().map(|(k, c)| (k, c as f64 / total)).collect();
		let ends = self.ends.into_iter().map(|(k, c)| (k, c as f64 / total)).collect();

		Ok(Model::new(states, matrix, Vec::new())?.with_distributions(initial, ends))
	}
}
