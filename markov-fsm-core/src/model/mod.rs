//! Top-level module for Markov chain estimation and simulation.
//!
//! This module provides:
//! - Corpus counting (`TransitionCounts`, `SequenceCounts`)
//! - Estimation of a chain from sequences (`Estimator`)
//! - The immutable chain itself (`Model`)
//! - The stochastic state machine driven by it (`StochasticEngine`)
//! - Model interchange and engine snapshots (`ModelConfig`, `Snapshot`)

/// Outgoing transition counts of a single source state.
pub mod transition_counts;

/// Counts of a whole corpus: transitions, starts and ends.
///
/// Supports merging of partial counts built on separate threads.
pub mod sequence_counts;

/// Sequential and multi-threaded estimation of a `Model` from sequences.
pub mod estimator;

/// The immutable Markov chain: states, index, transition matrix,
/// empirical start/end distributions and terminal states.
pub mod markov_model;

/// Stochastic finite-state machine taking weighted-random steps.
pub mod engine;

/// Step budget and random source of a simulation run.
pub mod simulation_input;

/// Start-state strategy and terminal override used when exporting a model.
pub mod export_options;

/// JSON interchange record consumed by the engine.
pub mod model_config;

/// Validated, resumable engine snapshots (JSON or `postcard`).
pub mod snapshot;

pub use engine::{StochasticEngine, StopReason, Trace, Transition};
pub use estimator::Estimator;
pub use export_options::{ExportOptions, StartState};
pub use markov_model::Model;
pub use model_config::ModelConfig;
pub use sequence_counts::SequenceCounts;
pub use simulation_input::SimulationInput;
pub use snapshot::Snapshot;
