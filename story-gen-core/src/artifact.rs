use std::error::Error;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::corpus::{Corpus, TokenizedCorpus};
use crate::io;
use crate::model::trigram::TrigramModel;
use crate::tokenizer::bpe::BpeTokenizer;
use crate::tokenizer::merges::{MergeRule, MergeTable};
use crate::tokenizer::vocab::Vocabulary;

/// Vocabulary file: token strings in insertion (id) order.
pub const VOCAB_FILE: &str = "bpe_vocab.bin";
/// Merge-rules file: (left, right) pairs in rank order.
pub const MERGES_FILE: &str = "bpe_merges.bin";
/// Count-tables file: the trained trigram model.
pub const COUNTS_FILE: &str = "trigram_counts.bin";

const FORMAT_VERSION: u16 = 1;

#[derive(Serialize, Deserialize)]
struct VocabFile {
	version: u16,
	tokens: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct MergesFile {
	version: u16,
	rules: Vec<MergeRule>,
}

#[derive(Serialize, Deserialize)]
struct CountsFile {
	version: u16,
	model: TrigramModel,
}

#[derive(Serialize, Deserialize)]
struct TokenCacheFile {
	version: u16,
	vocab_len: u32,
	merge_count: u32,
	corpus: TokenizedCorpus,
}

/// The trained model artifact: everything serving needs.
///
/// Persisted as three `postcard` files in one directory. Loading validates
/// each file and reconstructs state behaviorally identical to the freshly
/// trained artifact; a malformed or truncated file is rejected outright,
/// never partially adopted.
#[derive(Debug)]
pub struct Artifact {
	pub tokenizer: BpeTokenizer,
	pub model: TrigramModel,
}

impl Artifact {
	pub fn new(tokenizer: BpeTokenizer, model: TrigramModel) -> Self {
		Self { tokenizer, model }
	}

	/// Writes the vocabulary, merge-rules and count-tables files.
	///
	/// # Errors
	/// Returns an error if the directory cannot be created or any file
	/// cannot be serialized or written.
	pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<(), Box<dyn Error>> {
		let dir = dir.as_ref();
		fs::create_dir_all(dir)?;

		let vocab = VocabFile {
			version: FORMAT_VERSION,
			tokens: self.tokenizer.vocab().tokens().to_vec(),
		};
		fs::write(dir.join(VOCAB_FILE), postcard::to_stdvec(&vocab)?)?;

		let merges = MergesFile {
			version: FORMAT_VERSION,
			rules: self.tokenizer.merges().rules().to_vec(),
		};
		fs::write(dir.join(MERGES_FILE), postcard::to_stdvec(&merges)?)?;

		let counts = CountsFile { version: FORMAT_VERSION, model: self.model.clone() };
		fs::write(dir.join(COUNTS_FILE), postcard::to_stdvec(&counts)?)?;

		log::info!("saved model artifact to {}", dir.display());
		Ok(())
	}

	/// Loads and validates a persisted artifact.
	///
	/// # Errors
	/// Fails fast with a descriptive error on an unreadable or malformed
	/// file, a format-version mismatch, a vocabulary without the reserved
	/// tokens, or a merge rule that does not resolve against the vocabulary.
	pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, Box<dyn Error>> {
		let dir = dir.as_ref();

		let vocab_file: VocabFile = read_artifact_file(&dir.join(VOCAB_FILE))?;
		check_version(vocab_file.version, VOCAB_FILE)?;
		let vocab = Vocabulary::from_tokens(vocab_file.tokens)?;

		let merges_file: MergesFile = read_artifact_file(&dir.join(MERGES_FILE))?;
		check_version(merges_file.version, MERGES_FILE)?;
		let merges = MergeTable::from_rules(merges_file.rules, &vocab)?;

		let counts_file: CountsFile = read_artifact_file(&dir.join(COUNTS_FILE))?;
		check_version(counts_file.version, COUNTS_FILE)?;

		log::info!(
			"loaded model artifact from {}: {} tokens, {} merge rules",
			dir.display(),
			vocab.len(),
			merges.len()
		);
		Ok(Self::new(BpeTokenizer::new(vocab, merges), counts_file.model))
	}
}

fn read_artifact_file<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
	let bytes = fs::read(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
	postcard::from_bytes(&bytes)
		.map_err(|e| format!("malformed artifact file {}: {e}", path.display()).into())
}

fn check_version(version: u16, file: &str) -> Result<(), String> {
	if version != FORMAT_VERSION {
		return Err(format!(
			"{file}: unsupported format version {version}, expected {FORMAT_VERSION}"
		));
	}
	Ok(())
}

/// Tokenizes a corpus, reusing the on-disk cache when it is still valid.
///
/// The cache lives next to the corpus file (`<stem>.tokens.bin`) and is
/// stamped with the tokenizer's vocabulary size and merge count. A stale or
/// unreadable cache is re-tokenized and rewritten, never trusted.
pub fn tokenize_corpus_cached<P: AsRef<Path>>(
	corpus_path: P,
	corpus: &Corpus,
	tokenizer: &BpeTokenizer,
) -> Result<TokenizedCorpus, Box<dyn Error>> {
	let cache_path = io::build_output_path(&corpus_path, "tokens.bin")?;
	let vocab_len = tokenizer.vocab().len() as u32;
	let merge_count = tokenizer.merges().len() as u32;

	if cache_path.exists() {
		let cached = fs::read(&cache_path)
			.ok()
			.and_then(|bytes| postcard::from_bytes::<TokenCacheFile>(&bytes).ok());
		match cached {
			Some(cache)
				if cache.version == FORMAT_VERSION
					&& cache.vocab_len == vocab_len
					&& cache.merge_count == merge_count =>
			{
				log::info!("loaded tokenized corpus cache from {}", cache_path.display());
				return Ok(cache.corpus);
			}
			_ => log::warn!(
				"tokenized corpus cache at {} is stale or unreadable, re-tokenizing",
				cache_path.display()
			),
		}
	}

	let tokenized = tokenizer.encode_corpus(corpus);
	let cache = TokenCacheFile {
		version: FORMAT_VERSION,
		vocab_len,
		merge_count,
		corpus: tokenized.clone(),
	};
	fs::write(&cache_path, postcard::to_stdvec(&cache)?)?;
	log::info!("cached tokenized corpus to {}", cache_path.display());
	Ok(tokenized)
}
