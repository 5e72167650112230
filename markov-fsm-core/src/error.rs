//! Error types for the markov-fsm-core crate.

use thiserror::Error;

/// Error type for all fallible operations of the estimator, the engine
/// and the snapshot layer.
#[derive(Debug, Error)]
pub enum FsmError {
	/// The corpus handed to the estimator is empty, or contains an empty sequence.
	#[error("invalid input: {reason}")]
	InvalidInput { reason: String },

	/// A requested label is not one of the model states.
	#[error("invalid state: '{state}' is not a model state")]
	InvalidState { state: String },

	/// A snapshot failed structural validation.
	#[error("invalid snapshot: {reason}")]
	InvalidSnapshot { reason: String },

	/// A transition matrix violates the probability invariants.
	#[error("malformed model: {reason}")]
	MalformedModel { reason: String },

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("encoding error: {0}")]
	Encoding(#[from] postcard::Error),
}

impl FsmError {
	pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
		Self::InvalidInput { reason: reason.into() }
	}

	pub(crate) fn invalid_state(state: impl Into<String>) -> Self {
		Self::InvalidState { state: state.into() }
	}

	pub(crate) fn invalid_snapshot(reason: impl Into<String>) -> Self {
		Self::InvalidSnapshot { reason: reason.into() }
	}

	pub(crate) fn malformed(reason: impl Into<String>) -> Self {
		Self::MalformedModel { reason: reason.into() }
	}

	/// Returns a short stable code for the error kind.
	pub fn error_code(&self) -> &'static str {
		match self {
			FsmError::InvalidInput { .. } => "INVALID_INPUT",
			FsmError::InvalidState { .. } => "INVALID_STATE",
			FsmError::InvalidSnapshot { .. } => "INVALID_SNAPSHOT",
			FsmError::MalformedModel { .. } => "MALFORMED_MODEL",
			FsmError::Io(_) => "IO_ERROR",
			FsmError::Json(_) => "BAD_FORMAT",
			FsmError::Encoding(_) => "BAD_FORMAT",
		}
	}
}
