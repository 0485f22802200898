use std::env;

use story_gen_core::artifact::{Artifact, tokenize_corpus_cached};
use story_gen_core::corpus::Corpus;
use story_gen_core::model::generator::Generator;
use story_gen_core::model::params::GenerationParams;
use story_gen_core::model::trigram::TrigramModel;
use story_gen_core::tokenizer::trainer::BpeTrainer;

const DEFAULT_VOCAB_SIZE: usize = 300;
const DEFAULT_OUTPUT_DIR: &str = "./data";
const SAMPLE_COUNT: u64 = 3;

/// Batch training pipeline: corpus file in, persisted artifact out.
///
/// Trains the BPE tokenizer, tokenizes the corpus (cached next to the
/// corpus file), trains the trigram model, saves everything and prints a
/// few sample generations.
fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::init();

	let args: Vec<String> = env::args().collect();
	let Some(corpus_path) = args.get(1) else {
		eprintln!("usage: story-gen-train <corpus.txt> [target_vocab_size] [output_dir]");
		std::process::exit(2);
	};
	let target_vocab_size: usize = match args.get(2) {
		Some(raw) => raw
			.parse()
			.map_err(|_| format!("target vocab size must be an integer, got {raw:?}"))?,
		None => DEFAULT_VOCAB_SIZE,
	};
	let output_dir = args.get(3).map(String::as_str).unwrap_or(DEFAULT_OUTPUT_DIR);

	let corpus = Corpus::from_file(corpus_path)?;
	log::info!("loaded corpus from {corpus_path}: {} stories", corpus.len());

	let tokenizer = BpeTrainer::new(target_vocab_size).train(&corpus)?;
	println!(
		"vocabulary: {} tokens, {} merge rules",
		tokenizer.vocab().len(),
		tokenizer.merges().len()
	);

	let tokenized = tokenize_corpus_cached(corpus_path, &corpus, &tokenizer)?;
	println!("tokenized corpus: {} tokens", tokenized.token_count());

	let model = TrigramModel::train(&tokenized);
	println!(
		"n-gram tables: {} unigrams, {} bigrams, {} trigrams",
		model.unigram_count(),
		model.bigram_count(),
		model.trigram_count()
	);

	let artifact = Artifact::new(tokenizer, model);
	artifact.save(output_dir)?;
	println!("artifact saved to {output_dir}");

	// A few reproducible samples so a training run can be eyeballed.
	let generator = Generator::new(&artifact.tokenizer, &artifact.model);
	for index in 0..SAMPLE_COUNT {
		let params = GenerationParams {
			max_tokens: 200,
			temperature: 0.9,
			seed: Some(42 + index),
		};
		let sample = generator.generate("", &params)?;
		println!(
			"--- sample {} ({} tokens{}) ---",
			index + 1,
			sample.token_count,
			if sample.stopped_at_eot { ", eot" } else { "" }
		);
		println!("{}", sample.text);
	}

	Ok(())
}
