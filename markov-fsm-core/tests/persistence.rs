use std::sync::Arc;

use markov_fsm_core::FsmError;
use markov_fsm_core::model::{
	Estimator, ExportOptions, ModelConfig, Snapshot, StochasticEngine, StopReason,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn sample_sequences() -> Vec<Vec<&'static str>> {
	vec![
		vec!["A", "B", "C", "E", "D"],
		vec!["A", "B", "C", "E", "H"],
		vec!["A", "C", "B", "E", "D"],
	]
}

/// Estimate, export and reload through the JSON interchange file.
fn engine_from_config_file(dir: &tempfile::TempDir) -> StochasticEngine {
	let model = Estimator::estimate(&sample_sequences()).unwrap();
	let config = ModelConfig::from_model(&model, &ExportOptions::new()).unwrap();
	let path = dir.path().join("config.json");
	config.save(&path).unwrap();
	ModelConfig::load(&path).unwrap().build_engine().unwrap()
}

#[test]
fn estimate_export_simulate() {
	let dir = tempfile::TempDir::new().unwrap();
	let mut engine = engine_from_config_file(&dir);
	assert_eq!(engine.current_state(), "A");
	assert_eq!(
		engine.model().terminal_states().iter().cloned().collect::<Vec<_>>(),
		vec!["D", "H"]
	);

	let trace = engine.run(100, &mut StdRng::seed_from_u64(17));
	assert_eq!(trace.stop, StopReason::Terminated);
	let last = trace.transitions.last().unwrap();
	assert!(last.to == "D" || last.to == "H");
	assert!(engine.is_terminated());
}

#[test]
fn suspend_and_resume_matches_original() {
	let dir = tempfile::TempDir::new().unwrap();
	let mut original = engine_from_config_file(&dir);
	original.run(2, &mut StdRng::seed_from_u64(3));

	for name in ["fsm_state.json", "fsm_state.pkl"] {
		let path = dir.path().join(name);
		original.save(&path).unwrap();
		let mut restored = StochasticEngine::load(&path).unwrap();

		assert_eq!(restored.current_state(), original.current_state());
		assert_eq!(restored.is_terminated(), original.is_terminated());

		let mut continued = original.clone();
		let expected = continued.run(10, &mut StdRng::seed_from_u64(99));
		let actual = restored.run(10, &mut StdRng::seed_from_u64(99));
		assert_eq!(actual, expected);
		assert_eq!(restored.snapshot(), continued.snapshot());
	}
}

#[test]
fn terminal_zero_row_scenario() {
	let sequences = vec![vec!["A", "B", "C"], vec!["A", "B", "D"], vec!["A", "C", "D"]];
	let model = Estimator::estimate(&sequences)
		.unwrap()
		.with_terminal_states(vec!["D".to_string()])
		.unwrap();
	let model = Arc::new(model);

	let mut at_d = StochasticEngine::new(Arc::clone(&model), "D").unwrap();
	assert!(!at_d.is_terminated());
	for _ in 0..25 {
		assert_eq!(at_d.step(), "D");
		assert!(!at_d.is_terminated());
	}

	let mut at_c = StochasticEngine::new(model, "C").unwrap();
	assert_eq!(at_c.step(), "D");
	assert!(at_c.is_terminated());
	for _ in 0..5 {
		at_c.step();
		assert!(at_c.is_terminated());
	}

	let restored = at_c.snapshot().restore().unwrap();
	assert!(restored.is_terminated());
	assert_eq!(restored.current_state(), "D");
}

#[test]
fn ragged_snapshot_yields_no_engine() {
	let dir = tempfile::TempDir::new().unwrap();
	let engine = engine_from_config_file(&dir);
	let mut snapshot = engine.snapshot();
	snapshot.transition_matrix[2].push(0.0);

	let result = StochasticEngine::from_snapshot(&snapshot);
	assert!(matches!(result, Err(FsmError::InvalidSnapshot { .. })));
}

#[test]
fn corrupt_snapshot_file() {
	let dir = tempfile::TempDir::new().unwrap();
	let path = dir.path().join("broken.json");
	std::fs::write(&path, "{\"states\": [\"A\"]").unwrap();
	assert!(matches!(StochasticEngine::load(&path), Err(FsmError::InvalidSnapshot { .. })));

	let missing = dir.path().join("absent.bin");
	assert!(matches!(StochasticEngine::load(&missing), Err(FsmError::Io(_))));
}

fn corpus() -> impl Strategy<Value = Vec<Vec<String>>> {
	let label = prop::sample::select(vec!["A", "B", "C", "D", "E"]).prop_map(str::to_owned);
	prop::collection::vec(prop::collection::vec(label, 1..6), 1..15)
}

proptest! {
	#[test]
	fn snapshot_round_trip(sequences in corpus(), steps in 0usize..20, seed in any::<u64>()) {
		let model = Estimator::estimate(&sequences).unwrap();
		let config = ModelConfig::from_model(&model, &ExportOptions::new()).unwrap();
		let mut engine = config.build_engine().unwrap();
		let mut rng = StdRng::seed_from_u64(seed);
		for _ in 0..steps {
			engine.step_with(&mut rng);
		}

		let snapshot = engine.snapshot();
		let json = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap().restore().unwrap();
		let binary = Snapshot::from_bytes(&snapshot.to_bytes().unwrap()).unwrap().restore().unwrap();

		for restored in [json, binary] {
			prop_assert_eq!(restored.current_state(), engine.current_state());
			prop_assert_eq!(restored.is_terminated(), engine.is_terminated());
			prop_assert_eq!(restored.model().states(), engine.model().states());
			prop_assert_eq!(restored.model().transition_matrix(), engine.model().transition_matrix());
			prop_assert_eq!(restored.model().terminal_states(), engine.model().terminal_states());
		}
	}
}
