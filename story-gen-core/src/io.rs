use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::io;

/// Reads a whole UTF-8 text file into memory.
pub(crate) fn read_text<P: AsRef<Path>>(filename: P) -> io::Result<String> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents)
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/corpus.txt` + `"tokens.bin"` → `data/corpus.tokens.bin`
pub(crate) fn build_output_path<P: AsRef<Path>>(
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

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn output_path_replaces_extension() {
		let path = build_output_path("data/corpus.txt", "tokens.bin").unwrap();
		assert_eq!(path, PathBuf::from("data/corpus.tokens.bin"));
	}

	#[test]
	fn output_path_without_parent() {
		let path = build_output_path("corpus.txt", "bin").unwrap();
		assert_eq!(path, PathBuf::from("corpus.bin"));
	}
}
