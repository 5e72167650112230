use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::io;

use crate::error::FsmError;

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Splits one corpus record into its trimmed, comma-delimited labels.
///
/// A record made only of separators and whitespace yields an empty sequence.
pub(crate) fn parse_record(line: &str) -> Result<Vec<String>, FsmError> {
	let fields: Vec<&str> = line.split(',').map(str::trim).collect();
	if fields.iter().all(|f| f.is_empty()) {
		return Ok(Vec::new());
	}
	if fields.iter().any(|f| f.is_empty()) {
		return Err(FsmError::invalid_input(format!("record '{}' contains an empty label", line.trim())));
	}
	Ok(fields.into_iter().map(str::to_owned).collect())
}

/// Reads a sequence corpus: one sequence per line, labels separated by commas.
///
/// Only the terminating newline of the last record is not a record. Blank
/// lines and lines that hold only separators are returned as empty sequences
/// so that the estimator rejects them.
pub fn read_sequences<P: AsRef<Path>>(filename: P) -> Result<Vec<Vec<String>>, FsmError> {
	let path = filename.as_ref();
	let mut sequences = Vec::new();
	for (number, line) in read_file(path)?.iter().enumerate() {
		let record = parse_record(line)?;
		if record.is_empty() {
			tracing::warn!("{}:{}: empty record", path.display(), number + 1);
		}
		sequences.push(record);
	}
	tracing::debug!("read {} sequences from {}", sequences.len(), path.display());
	Ok(sequences)
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/config.json` + `"bin"` → `data/config.bin`
pub fn build_output_path<P: AsRef<Path>>(
	input_path: P,
	output_extension: &str,
) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Returns true when the path carries a `.json` extension (case-insensitive).
pub(crate) fn is_json<P: AsRef<Path>>(path: P) -> bool {
	path.as_ref()
		.extension()
		.map(|ext| ext.eq_ignore_ascii_case("json"))
		.unwrap_or(false)
}
