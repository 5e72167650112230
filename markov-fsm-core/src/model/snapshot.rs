use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::engine::StochasticEngine;
use super::markov_model::Model;
use crate::error::FsmError;
use crate::io::is_json;

/// Resumable record of a [`StochasticEngine`].
///
/// Captures exactly what is needed to rebuild an engine that behaves like the
/// original from the capture point on: the chain (states, index, matrix,
/// terminal set), the initial and current states, and the `terminated` flag.
///
/// `terminal_states` and `terminated` may be absent in older records and
/// default to an empty set and `false`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
	pub states: Vec<String>,
	#[serde(deserialize_with = "unique_index")]
	pub state_index: BTreeMap<String, usize>,
	pub transition_matrix: Vec<Vec<f64>>,
	pub current_state: String,
	pub initial: String,
	#[serde(default)]
	pub terminal_states: Vec<String>,
	#[serde(default)]
	pub terminated: bool,
}

impl Snapshot {
	/// Captures the full resumable state of `engine`.
	pub fn capture(engine: &StochasticEngine) -> Self {
		let model = engine.model();
		Self {
			states: model.states().to_vec(),
			state_index: model.state_index().iter().map(|(k, v)| (k.clone(), *v)).collect(),
			transition_matrix: model.transition_matrix().to_vec(),
			current_state: engine.current_state().to_owned(),
			initial: engine.initial_state().to_owned(),
			terminal_states: model.terminal_states().iter().cloned().collect(),
			terminated: engine.is_terminated(),
		}
	}

	/// Validates the record and rebuilds the engine.
	///
	/// Nothing is built unless every check passes.
	///
	/// # Errors
	/// - [`FsmError::InvalidSnapshot`] for duplicate states, a `state_index`
	///   that disagrees with `states`, a matrix that is not square over the
	///   states, or an `initial`/terminal label that is not a state.
	/// - [`FsmError::MalformedModel`] for negative entries or rows above one.
	/// - [`FsmError::InvalidState`] if `current_state` is not a state.
	pub fn restore(&self) -> Result<StochasticEngine, FsmError> {
		self.validate_structure()?;

		let model = Model::new(
			self.states.clone(),
			self.transition_matrix.clone(),
			self.terminal_states.iter().cloned(),
		)?;
		let engine = StochasticEngine::resume(Arc::new(model), &self.initial, &self.current_state, self.terminated)?;

		tracing::debug!(
			"restored engine at '{}' (terminated: {}) over {} states",
			engine.current_state(),
			engine.is_terminated(),
			engine.model().len()
		);
		Ok(engine)
	}

	fn validate_structure(&self) -> Result<(), FsmError> {
		let n = self.states.len();
		if n == 0 {
			return Err(FsmError::invalid_snapshot("no states"));
		}
		if self.states.iter().collect::<BTreeSet<_>>().len() != n {
			return Err(FsmError::invalid_snapshot("state labels are not unique"));
		}

		if self.state_index.len() != n {
			return Err(FsmError::invalid_snapshot(format!(
				"state_index has {} entries for {} states",
				self.state_index.len(),
				n
			)));
		}
		for (i, label) in self.states.iter().enumerate() {
			match self.state_index.get(label) {
				Some(&index) if index == i => {}
				Some(&index) => {
					return Err(FsmError::invalid_snapshot(format!(
						"state_index maps '{}' to {}, expected {}",
						label, index, i
					)));
				}
				None => {
					return Err(FsmError::invalid_snapshot(format!("state_index is missing '{}'", label)));
				}
			}
		}

		if self.transition_matrix.len() != n {
			return Err(FsmError::invalid_snapshot(format!(
				"transition matrix has {} rows for {} states",
				self.transition_matrix.len(),
				n
			)));
		}
		if let Some((i, row)) = self.transition_matrix.iter().enumerate().find(|(_, row)| row.len() != n) {
			return Err(FsmError::invalid_snapshot(format!(
				"row {} has {} entries for {} states",
				i,
				row.len(),
				n
			)));
		}

		if !self.state_index.contains_key(&self.initial) {
			return Err(FsmError::invalid_snapshot(format!("initial state '{}' is not a state", self.initial)));
		}
		if let Some(unknown) = self.terminal_states.iter().find(|t| !self.state_index.contains_key(*t)) {
			return Err(FsmError::invalid_snapshot(format!("terminal state '{}' is not a state", unknown)));
		}
		Ok(())
	}

	/// Encodes the snapshot as pretty-printed JSON.
	pub fn to_json(&self) -> Result<String, FsmError> {
		Ok(serde_json::to_string_pretty(self)?)
	}

	/// Decodes a JSON snapshot; any decoding failure is an invalid snapshot.
	pub fn from_json(json: &str) -> Result<Self, FsmError> {
		serde_json::from_str(json).map_err(|e| FsmError::invalid_snapshot(e.to_string()))
	}

	/// Encodes the snapshot in the compact `postcard` binary format.
	pub fn to_bytes(&self) -> Result<Vec<u8>, FsmError> {
		Ok(postcard::to_stdvec(self)?)
	}

	/// Decodes a `postcard` snapshot; any decoding failure is an invalid snapshot.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, FsmError> {
		postcard::from_bytes(bytes).map_err(|e| FsmError::invalid_snapshot(e.to_string()))
	}

	/// Writes the snapshot; `.json` paths get JSON, anything else `postcard`.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), FsmError> {
		let path = path.as_ref();
		let bytes = if is_json(path) { self.to_json()?.into_bytes() } else { self.to_bytes()? };
		std::fs::write(path, &bytes)?;
		tracing::info!(
			"saved snapshot at '{}' ({} bytes) to {}",
			self.current_state,
			bytes.len(),
			path.display()
		);
		Ok(())
	}

	/// Reads a snapshot written by [`Snapshot::save`].
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FsmError> {
		let path = path.as_ref();
		let bytes = std::fs::read(path)?;
		let snapshot = if is_json(path) {
			let json = std::str::from_utf8(&bytes).map_err(|e| FsmError::invalid_snapshot(e.to_string()))?;
			Self::from_json(json)?
		} else {
			Self::from_bytes(&bytes)?
		};
		tracing::info!("loaded snapshot at '{}' from {}", snapshot.current_state, path.display());
		Ok(snapshot)
	}
}

impl StochasticEngine {
	/// Captures this engine; see [`Snapshot::capture`].
	pub fn snapshot(&self) -> Snapshot {
		Snapshot::capture(self)
	}

	/// Rebuilds an engine; see [`Snapshot::restore`].
	pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, FsmError> {
		snapshot.restore()
	}

	/// Captures this engine and writes it to `path`.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), FsmError> {
		self.snapshot().save(path)
	}

	/// Reads a snapshot from `path` and rebuilds the engine.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FsmError> {
		Snapshot::load(path)?.restore()
	}
}

/// Reads `state_index` as a map, rejecting a label that appears twice.
fn unique_index<'de, D>(deserializer: D) -> Result<BTreeMap<String, usize>, D::Error>
where
	D: Deserializer<'de>,
{
	struct UniqueIndex;

	impl<'de> Visitor<'de> for UniqueIndex {
		type Value = BTreeMap<String, usize>;

		fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
			f.write_str("a map from state label to index")
		}

		fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
			let mut index = BTreeMap::new();
			while let Some((label, position)) = access.next_entry::<String, usize>()? {
				if index.contains_key(&label) {
					return Err(de::Error::custom(format!("duplicate state_index key '{}'", label)));
				}
				index.insert(label, position);
			}
			Ok(index)
		}
	}

	deserializer.deserialize_map(UniqueIndex)
}
