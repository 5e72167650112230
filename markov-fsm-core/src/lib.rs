//! Markov chain estimation and stochastic state machine library.
//!
//! This crate provides:
//! - Estimation of a first-order Markov chain from observed state sequences
//! - A stochastic finite-state machine sampling transitions from the chain
//! - Suspend/resume of a running machine through validated snapshots
//!
//! ```
//! use std::sync::Arc;
//! use markov_fsm_core::model::{Estimator, StochasticEngine};
//!
//! let sequences = vec![vec!["A", "B", "C"], vec!["A", "B", "D"], vec!["A", "C", "D"]];
//! let model = Estimator::estimate(&sequences)?
//!     .with_terminal_states(vec!["D".to_string()])?;
//!
//! let mut engine = StochasticEngine::new(Arc::new(model), "A")?;
//! while !engine.is_terminated() {
//!     engine.step();
//! }
//! assert_eq!(engine.current_state(), "D");
//! # Ok::<(), markov_fsm_core::FsmError>(())
//! ```

/// Estimation, simulation and persistence of Markov chains.
pub mod model;

/// Error type shared by every fallible operation.
pub mod error;

/// Corpus reading and path helpers.
pub mod io;

pub use error::FsmError;
