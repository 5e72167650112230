mod logging;

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use markov_fsm_core::FsmError;
use markov_fsm_core::io::build_output_path;
use markov_fsm_core::model::{
	Estimator, ExportOptions, ModelConfig, SimulationInput, StartState, StochasticEngine, StopReason, Trace,
};

const EXAMPLE_CORPUS: &str = "
    A, B, C, E, D
    A, B, C, E, H
    A, C, B, E, D
";

#[derive(Parser)]
#[command(name = "markov-fsm")]
#[command(about = "Estimate a Markov chain from state sequences and simulate it as a stochastic state machine")]
#[command(version)]
struct Cli {
	/// Increase log verbosity (-v, -vv, -vvv)
	#[arg(short, long, action = clap::ArgAction::Count, global = true)]
	verbose: u8,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Estimate a model from a sequence corpus and write its configuration
	Estimate {
		/// Corpus file, one comma-delimited sequence per line
		#[arg(long, env = "MARKOV_FSM_SEQUENCES", default_value = "sequences.csv")]
		sequences: PathBuf,

		/// Output model configuration (JSON)
		#[arg(long, env = "MARKOV_FSM_CONFIG", default_value = "config.json")]
		config: PathBuf,

		/// Initial state: 'mode', 'random' or 'custom:<label>'
		#[arg(long, default_value = "mode")]
		start: String,

		/// Terminal states (comma-separated); defaults to the observed final states
		#[arg(long, value_delimiter = ',')]
		terminal: Vec<String>,
	},

	/// Simulate the model, suspend it to a snapshot and resume from it
	Simulate {
		/// Model configuration (JSON)
		#[arg(long, env = "MARKOV_FSM_CONFIG", default_value = "config.json")]
		config: PathBuf,

		/// Maximum steps before suspending
		#[arg(long, default_value_t = 5)]
		steps: usize,

		/// Seed for reproducible runs
		#[arg(long)]
		seed: Option<u64>,

		/// Snapshot path (`.json` for JSON, anything else for binary)
		#[arg(long)]
		snapshot: Option<PathBuf>,

		/// Resume from this snapshot instead of the configuration
		#[arg(long)]
		resume: Option<PathBuf>,

		/// Steps taken by the restored machine
		#[arg(long, default_value_t = 3)]
		resume_steps: usize,
	},
}

fn main() {
	let cli = Cli::parse();
	logging::init(cli.verbose);

	let result = match cli.command {
		Commands::Estimate { sequences, config, start, terminal } => estimate(&sequences, &config, &start, &terminal),
		Commands::Simulate { config, steps, seed, snapshot, resume, resume_steps } => {
			simulate(&config, steps, seed, snapshot, resume, resume_steps)
		}
	};

	if let Err(e) = result {
		tracing::error!("{}", e);
		eprintln!("error [{}]: {}", e.error_code(), e);
		std::process::exit(1);
	}
}

fn estimate(sequences: &Path, config: &Path, start: &str, terminal: &[String]) -> Result<(), FsmError> {
	if !sequences.exists() || !config.exists() {
		for path in [sequences, config] {
			if !path.exists() {
				File::create(path)?;
			}
		}
		println!(
			"Created {} and {}. Fill {} and run again.",
			sequences.display(),
			config.display(),
			sequences.display()
		);
		println!("Example {}:{}", sequences.display(), EXAMPLE_CORPUS);
		return Ok(());
	}

	let model = Estimator::estimate_file(sequences)?;

	let mut options = ExportOptions::new().with_start_state(start.parse::<StartState>()?);
	if !terminal.is_empty() {
		options.set_terminal_states(terminal)?;
	}

	let model_config = ModelConfig::from_model(&model, &options)?;
	model_config.save(config)?;

	println!("States: {}", model_config.states.join(", "));
	println!("Initial: {}", model_config.initial);
	println!("Terminal: {}", model_config.terminal_states.join(", "));
	Ok(())
}

fn simulate(
	config: &Path,
	steps: usize,
	seed: Option<u64>,
	snapshot: Option<PathBuf>,
	resume: Option<PathBuf>,
	resume_steps: usize,
) -> Result<(), FsmError> {
	let mut engine = match &resume {
		Some(path) => StochasticEngine::load(path)?,
		None => ModelConfig::load(config)?.build_engine()?,
	};

	println!("Initial state: {}", engine.current_state());
	println!("States: {}", engine.model().states().join(", "));
	println!();

	let mut input = SimulationInput::new(steps)?;
	input.seed = seed;

	println!("Transitions:");
	let trace = engine.simulate(&input);
	print_trace(&trace, 0);
	if finished(&trace, &engine) {
		return Ok(());
	}
	println!("\nState after {} steps: {}", trace.transitions.len(), engine.current_state());

	let snapshot_path = match snapshot {
		Some(path) => path,
		None => build_output_path(config, "state.json")?,
	};
	engine.save(&snapshot_path)?;
	println!("\nMachine saved to {}", snapshot_path.display());

	let mut restored = StochasticEngine::load(&snapshot_path)?;
	println!("Machine restored, state: {}", restored.current_state());

	println!("\nResuming with the restored machine:");
	let mut input = SimulationInput::new(resume_steps)?;
	input.seed = seed.map(|s| s.wrapping_add(1));
	let resumed = restored.simulate(&input);
	print_trace(&resumed, trace.transitions.len());
	if !finished(&resumed, &restored) {
		println!("\nState after resuming: {}", restored.current_state());
	}
	Ok(())
}

fn print_trace(trace: &Trace, offset: usize) {
	for t in &trace.transitions {
		println!("Step {}: {} -> {}", t.step + offset, t.from, t.to);
	}
}

/// Reports how a run ended; true when no further steps would change anything.
fn finished(trace: &Trace, engine: &StochasticEngine) -> bool {
	match trace.stop {
		StopReason::Terminated => {
			println!("Reached terminal state: {}", engine.current_state());
			true
		}
		StopReason::Absorbed => {
			println!("State {} has no outgoing transitions", engine.current_state());
			true
		}
		StopReason::StepLimit => false,
	}
}
