use std::path::Path;
use std::sync::mpsc;
use std::thread;

use super::markov_model::Model;
use super::sequence_counts::SequenceCounts;
use crate::error::FsmError;
use crate::io::read_sequences;

/// Number of chunks handed to each CPU by [`Estimator::estimate_parallel`].
const CHUNKS_PER_CPU: usize = 8;

/// Estimates a first-order Markov chain from observed state sequences.
///
/// The estimate is a [`Model`] with:
/// - `states`: the sorted union of every label in the corpus
/// - `transition_matrix`: row-normalized pair counts (zero rows for states
///   never followed by another label)
/// - `initial_distribution` / `final_distribution`: share of sequences that
///   start / end in each label
///
/// No smoothing is applied; unseen transitions keep probability zero.
pub struct Estimator;

impl Estimator {
	/// Estimates a model on the calling thread.
	///
	/// # Errors
	/// Returns [`FsmError::InvalidInput`] if the corpus or any sequence is empty.
	pub fn estimate<S: AsRef<str>>(sequences: &[Vec<S>]) -> Result<Model, FsmError> {
		if sequences.is_empty() {
			return Err(FsmError::invalid_input("corpus is empty"));
		}

		let mut counts = SequenceCounts::new();
		for (i, sequence) in sequences.iter().enumerate() {
			counts.add_sequence(sequence).map_err(|_| FsmError::invalid_input(format!("sequence {} is empty", i)))?;
		}

		Self::finish(counts)
	}

	/// Estimates a model by counting chunks of the corpus on worker threads.
	///
	/// # Behavior
	/// - Splits sequences into chunks (based on CPU cores * factor).
	/// - Counts each chunk on its own scoped thread.
	/// - Merges all partial counts, then normalizes once.
	///
	/// Counts are integers, so the result is identical to [`Estimator::estimate`].
	///
	/// # Errors
	/// Returns [`FsmError::InvalidInput`] if the corpus or any sequence is empty.
	pub fn estimate_parallel<S: AsRef<str> + Sync>(sequences: &[Vec<S>]) -> Result<Model, FsmError> {
		if sequences.is_empty() {
			return Err(FsmError::invalid_input("corpus is empty"));
		}

		let chunks = num_cpus::get() * CHUNKS_PER_CPU;
		let chunk_size = sequences.len().div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		let mut counts = SequenceCounts::new();
		let mut first_empty: Option<usize> = None;
		thread::scope(|scope| -> Result<(), FsmError> {
			for (c, chunk) in sequences.chunks(chunk_size).enumerate() {
				let tx = tx.clone();
				scope.spawn(move || {
					let mut partial = SequenceCounts::new();
					let mut result = Ok(());
					for (i, sequence) in chunk.iter().enumerate() {
						if partial.add_sequence(sequence).is_err() {
							result = Err(c * chunk_size + i);
							break;
						}
					}
					// The receiver outlives the scope, sending cannot fail
					let _ = tx.send(result.map(|_| partial));
				});
			}
			drop(tx);

			// Drain every chunk so the reported position does not depend on thread timing
			for partial in rx.iter() {
				match partial {
					Ok(partial) if first_empty.is_none() => counts.merge(&partial)?,
					Ok(_) => {}
					Err(position) => first_empty = Some(first_empty.map_or(position, |p| p.min(position))),
				}
			}
			Ok(())
		})?;

		if let Some(position) = first_empty {
			return Err(FsmError::invalid_input(format!("sequence {} is empty", position)));
		}

		tracing::debug!("merged counts from {} chunks of up to {} sequences", chunks, chunk_size);
		Self::finish(counts)
	}

	/// Reads a comma-delimited corpus file and estimates a model from it.
	pub fn estimate_file<P: AsRef<Path>>(path: P) -> Result<Model, FsmError> {
		let sequences = read_sequences(path)?;
		Self::estimate_parallel(&sequences)
	}

	fn finish(counts: SequenceCounts) -> Result<Model, FsmError> {
		let sequences = counts.sequences();
		tracing::trace!("labels: {}", counts.labels().collect::<Vec<_>>().join(", "));
		let model = counts.into_model()?;
		tracing::debug!(
			"estimated {} states from {} sequences ({} zero rows)",
			model.len(),
			sequences,
			(0..model.len()).filter(|i| model.is_zero_row(*i)).count()
		);
		Ok(model)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn corpus(rows: &[&[&str]]) -> Vec<Vec<String>> {
		rows.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect()
	}

	fn close(a: f64, b: f64) -> bool {
		(a - b).abs() < 1e-12
	}

	#[test]
	fn reference_corpus() {
		let sequences = corpus(&[&["A", "B", "C"], &["A", "B", "D"], &["A", "C", "D"]]);
		let model = Estimator::estimate(&sequences).unwrap();

		assert_eq!(model.states(), ["A", "B", "C", "D"]);
		assert_eq!(model.initial_distribution().len(), 1);
		assert!(close(model.initial_distribution()["A"], 1.0));

		assert!(close(model.probability("A", "B").unwrap(), 2.0 / 3.0));
		assert!(close(model.probability("A", "C").unwrap(), 1.0 / 3.0));
		assert!(close(model.probability("B", "C").unwrap(), 0.5));
		assert!(close(model.probability("B", "D").unwrap(), 0.5));
		assert!(close(model.probability("C", "D").unwrap(), 1.0));
		assert_eq!(model.row(3), [0.0; 4]);

		assert_eq!(model.final_distribution().len(), 2);
		assert!(close(model.final_distribution()["C"], 1.0 / 3.0));
		assert!(close(model.final_distribution()["D"], 2.0 / 3.0));
		assert!(model.terminal_states().is_empty());
	}

	#[test]
	fn empty_corpus() {
		let sequences: Vec<Vec<String>> = Vec::new();
		assert!(matches!(Estimator::estimate(&sequences), Err(FsmError::InvalidInput { .. })));
		assert!(matches!(Estimator::estimate_parallel(&sequences), Err(FsmError::InvalidInput { .. })));
	}

	#[test]
	fn empty_sequence_reports_position() {
		let sequences = corpus(&[&["A", "B"], &[], &["B"]]);
		let err = Estimator::estimate(&sequences).unwrap_err();
		assert_eq!(err.to_string(), "invalid input: sequence 1 is empty");

		let err = Estimator::estimate_parallel(&sequences).unwrap_err();
		assert_eq!(err.to_string(), "invalid input: sequence 1 is empty");
	}

	#[test]
	fn parallel_reports_first_empty_sequence() {
		let mut sequences: Vec<Vec<String>> = (0..2000).map(|i| vec![format!("S{}", i % 5)]).collect();
		sequences[1].clear();
		sequences[400].clear();
		sequences[1999].clear();

		for _ in 0..20 {
			let err = Estimator::estimate_parallel(&sequences).unwrap_err();
			assert_eq!(err.to_string(), "invalid input: sequence 1 is empty");
		}
	}

	#[test]
	fn parallel_matches_sequential() {
		let mut sequences = Vec::new();
		for i in 0..500 {
			let len = 1 + i % 7;
			sequences.push((0..len).map(|j| format!("S{}", (i * 31 + j * 17) % 11)).collect::<Vec<_>>());
		}
		let sequential = Estimator::estimate(&sequences).unwrap();
		let parallel = Estimator::estimate_parallel(&sequences).unwrap();
		assert_eq!(sequential, parallel);
	}

	#[test]
	fn estimate_file_reads_corpus() {
		use std::io::Write;
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "A, B, C, E, D").unwrap();
		writeln!(file, "A, B, C, E, H").unwrap();
		writeln!(file, "A, C, B, E, D").unwrap();

		let model = Estimator::estimate_file(file.path()).unwrap();
		assert_eq!(model.states(), ["A", "B", "C", "D", "E", "H"]);
		assert!(close(model.probability("E", "D").unwrap(), 2.0 / 3.0));
	}
}
