use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::engine::StochasticEngine;
use super::export_options::{ExportOptions, StartState};
use super::markov_model::{Model, sample_weighted};
use crate::error::FsmError;

/// Model interchange record consumed by the engine.
///
/// This is the only contract between a model producer and the engine: any
/// producer writing these four fields can drive a [`StochasticEngine`].
///
/// ```json
/// {
///   "states": ["A", "B"],
///   "initial": "A",
///   "transition_matrix": [[0.0, 1.0], [0.0, 0.0]],
///   "terminal_states": ["B"]
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
	pub states: Vec<String>,
	pub initial: String,
	pub transition_matrix: Vec<Vec<f64>>,
	#[serde(default)]
	pub terminal_states: Vec<String>,
}

impl ModelConfig {
	/// Exports a model using the thread-local random generator.
	pub fn from_model(model: &Model, options: &ExportOptions) -> Result<Self, FsmError> {
		Self::from_model_with(model, options, &mut rand::rng())
	}

	/// Exports a model as an interchange record.
	///
	/// - `initial` follows `options.start_state`.
	/// - `terminal_states` is the explicit override if any, else the model's
	///   own terminal set if non-empty, else every state some sequence ended in.
	///
	/// # Errors
	/// - [`FsmError::InvalidState`] if a custom start or terminal label is unknown.
	/// - [`FsmError::InvalidInput`] if the start state must come from an
	///   initial distribution the model does not carry.
	pub fn from_model_with<R: Rng + ?Sized>(model: &Model, options: &ExportOptions, rng: &mut R) -> Result<Self, FsmError> {
		let initial = match &options.start_state {
			StartState::Mode => model
				.most_likely_initial()
				.map(str::to_owned)
				.ok_or_else(|| FsmError::invalid_input("model has no initial distribution"))?,
			StartState::Random => {
				let (labels, weights): (Vec<&String>, Vec<f64>) = model.initial_distribution().iter().map(|(k, v)| (k, *v)).unzip();
				let picked = sample_weighted(&weights, rng).ok_or_else(|| FsmError::invalid_input("model has no initial distribution"))?;
				labels[picked].clone()
			}
			StartState::Custom(label) => {
				if model.index_of(label).is_none() {
					return Err(FsmError::invalid_state(label.as_str()));
				}
				label.clone()
			}
		};

		let terminal_states: Vec<String> = match options.terminal_states() {
			Some(terminal) => {
				if let Some(unknown) = terminal.iter().find(|t| model.index_of(t).is_none()) {
					return Err(FsmError::invalid_state(unknown.as_str()));
				}
				terminal.iter().cloned().collect()
			}
			None if !model.terminal_states().is_empty() => model.terminal_states().iter().cloned().collect(),
			None => model.final_distribution().keys().cloned().collect(),
		};

		Ok(Self {
			states: model.states().to_vec(),
			initial,
			transition_matrix: model.transition_matrix().to_vec(),
			terminal_states,
		})
	}

	/// Validates the record and builds the model it describes.
	///
	/// # Errors
	/// - [`FsmError::MalformedModel`] for dimension or probability problems.
	/// - [`FsmError::InvalidState`] if `initial` or a terminal label is unknown.
	pub fn to_model(&self) -> Result<Model, FsmError> {
		let model = Model::new(
			self.states.clone(),
			self.transition_matrix.clone(),
			self.terminal_states.iter().cloned(),
		)?;
		if model.index_of(&self.initial).is_none() {
			return Err(FsmError::invalid_state(self.initial.as_str()));
		}
		Ok(model)
	}

	/// Builds an engine positioned at `initial`.
	pub fn build_engine(&self) -> Result<StochasticEngine, FsmError> {
		let model = Arc::new(self.to_model()?);
		StochasticEngine::new(model, &self.initial)
	}

	/// Loads a record from a JSON file.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FsmError> {
		let file = File::open(path.as_ref())?;
		let config: Self = serde_json::from_reader(BufReader::new(file))?;
		tracing::debug!("loaded model config with {} states from {}", config.states.len(), path.as_ref().display());
		Ok(config)
	}

	/// Writes the record as pretty-printed JSON.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), FsmError> {
		let mut writer = BufWriter::new(File::create(path.as_ref())?);
		serde_json::to_writer_pretty(&mut writer, self)?;
		writer.flush()?;
		tracing::info!("wrote model config ({} states) to {}", self.states.len(), path.as_ref().display());
		Ok(())
	}
}
