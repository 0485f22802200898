use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;

use super::bpe::{BpeTokenizer, word_symbols};
use super::merges::{MergeRule, MergeTable};
use super::vocab::Vocabulary;
use crate::corpus::Corpus;

/// An adjacent symbol pair, the unit of merge-frequency counting.
type Pair = (String, String);

/// One unique word of the corpus during training: its current symbol
/// sequence and how often the word occurs.
struct TrainWord {
	symbols: Vec<String>,
	count: u64,
}

/// Learns a BPE vocabulary and merge sequence from a corpus.
///
/// # Responsibilities
/// - Build the word frequency table and register base symbols in corpus
///   scan order
/// - Repeatedly merge the most frequent adjacent symbol pair, weighted by
///   word frequency, until the vocabulary target is reached or no pair
///   occurs more than once
/// - Break frequency ties deterministically so retraining on identical
///   input reproduces the artifact byte for byte
///
/// # Invariants
/// - Merges never cross word boundaries (the end-of-word marker sits on the
///   final symbol of every word)
/// - The merge-rule sequence is fully determined by the corpus and the
///   vocabulary target
pub struct BpeTrainer {
	target_vocab_size: usize,
}

impl BpeTrainer {
	pub fn new(target_vocab_size: usize) -> Self {
		Self { target_vocab_size }
	}

	/// Trains a tokenizer on the corpus.
	///
	/// A `target_vocab_size` not exceeding the base vocabulary yields zero
	/// merges and the base vocabulary unchanged; it is not an error.
	///
	/// # Errors
	/// Returns an error only if the learned rule list fails to resolve
	/// against the vocabulary, which indicates a bug rather than bad input.
	pub fn train(&self, corpus: &Corpus) -> Result<BpeTokenizer, String> {
		let mut vocab = Vocabulary::new();
		let mut words = build_word_table(corpus, &mut vocab);
		log::info!(
			"BPE training: {} unique words, {} base symbols, target vocabulary {}",
			words.len(),
			vocab.len(),
			self.target_vocab_size
		);

		let mut rules: Vec<MergeRule> = Vec::new();
		while vocab.len() < self.target_vocab_size {
			let counts = count_pairs(&words);
			let Some((pair, count)) = best_pair(&counts) else { break };
			if count < 2 {
				// A pair seen once generalizes nothing.
				break;
			}

			let rule = MergeRule { left: pair.0.clone(), right: pair.1.clone() };
			let merged = rule.merged();
			vocab.intern(&merged);
			apply_merge(&mut words, pair, &merged);
			log::debug!("merge {} ({count} occurrences): {merged:?}", rules.len());
			rules.push(rule);
		}

		log::info!("BPE training done: {} tokens, {} merge rules", vocab.len(), rules.len());
		let merges = MergeTable::from_rules(rules, &vocab)?;
		Ok(BpeTokenizer::new(vocab, merges))
	}
}

/// Builds the word frequency table, interning base symbols in scan order.
fn build_word_table(corpus: &Corpus, vocab: &mut Vocabulary) -> Vec<TrainWord> {
	let mut words: Vec<TrainWord> = Vec::new();
	let mut index: HashMap<String, usize> = HashMap::new();

	for story in corpus.stories() {
		for word in story.split_whitespace() {
			if let Some(&at) = index.get(word) {
				words[at].count += 1;
				continue;
			}
			let symbols = word_symbols(word);
			for symbol in &symbols {
				vocab.intern(symbol);
			}
			index.insert(word.to_owned(), words.len());
			words.push(TrainWord { symbols, count: 1 });
		}
	}

	words
}

/// Counts adjacent-pair frequencies over all words, weighted by word count.
///
/// The word table is split into chunks counted on separate threads and
/// reduced by summation; the reduction is commutative, so the result does
/// not depend on scheduling.
fn count_pairs(words: &[TrainWord]) -> HashMap<Pair, u64> {
	if words.is_empty() {
		return HashMap::new();
	}

	let threads = num_cpus::get().clamp(1, words.len());
	let chunk_size = words.len().div_ceil(threads);

	let (tx, rx) = mpsc::channel();
	thread::scope(|scope| {
		for chunk in words.chunks(chunk_size) {
			let tx = tx.clone();
			scope.spawn(move || {
				let mut local: HashMap<Pair, u64> = HashMap::new();
				for word in chunk {
					for adjacent in word.symbols.windows(2) {
						*local
							.entry((adjacent[0].clone(), adjacent[1].clone()))
							.or_insert(0) += word.count;
					}
				}
				tx.send(local).expect("Failed to send from counting thread");
			});
		}
		drop(tx);

		let mut totals: HashMap<Pair, u64> = HashMap::new();
		for local in rx {
			for (pair, count) in local {
				*totals.entry(pair).or_insert(0) += count;
			}
		}
		totals
	})
}

/// Picks the most frequent pair; ties break on the lexicographically
/// smallest concatenated string, then on the left symbol.
fn best_pair(counts: &HashMap<Pair, u64>) -> Option<(&Pair, u64)> {
	let mut best: Option<(&Pair, u64, String)> = None;
	for (pair, &count) in counts {
		let merged = format!("{}{}", pair.0, pair.1);
		let better = match &best {
			None => true,
			Some((top_pair, top_count, top_merged)) => {
				count > *top_count
					|| (count == *top_count
						&& (merged < *top_merged
							|| (merged == *top_merged && pair.0 < top_pair.0)))
			}
		};
		if better {
			best = Some((pair, count, merged));
		}
	}
	best.map(|(pair, count, _)| (pair, count))
}

/// Replaces every occurrence of the pair, left to right, in every word.
fn apply_merge(words: &mut [TrainWord], pair: &Pair, merged: &str) {
	for word in words.iter_mut() {
		let mut i = 0;
		while i + 1 < word.symbols.len() {
			if word.symbols[i] == pair.0 && word.symbols[i + 1] == pair.1 {
				word.symbols[i] = merged.to_owned();
				word.symbols.remove(i + 1);
			} else {
				i += 1;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tokenizer::vocab::UNKNOWN_ID;

	#[test]
	fn learns_frequent_pairs_first() {
		// "ab" occurs three times; its pair must be the first merge.
		let corpus = Corpus::from_text("ab ab ab cd cd");
		let tokenizer = BpeTrainer::new(20).train(&corpus).unwrap();
		let first = &tokenizer.merges().rules()[0];
		assert_eq!((first.left.as_str(), first.right.as_str()), ("a", "b</w>"));
		// The merged word now encodes to a single token.
		assert_eq!(tokenizer.encode("ab").len(), 1);
	}

	#[test]
	fn training_is_deterministic() {
		let text = "ایک بار کا ذکر ہے کہ ایک جنگل میں ایک شیر رہتا تھا";
		let first = BpeTrainer::new(60).train(&Corpus::from_text(text)).unwrap();
		let second = BpeTrainer::new(60).train(&Corpus::from_text(text)).unwrap();
		assert_eq!(first.vocab().tokens(), second.vocab().tokens());
		assert_eq!(first.merges().rules(), second.merges().rules());
	}

	#[test]
	fn ties_break_lexicographically() {
		// Two pairs with identical counts; the smaller concatenation wins.
		let corpus = Corpus::from_text("ab ab cd cd");
		let tokenizer = BpeTrainer::new(20).train(&corpus).unwrap();
		let first = &tokenizer.merges().rules()[0];
		assert_eq!(first.merged(), "ab</w>");
	}

	#[test]
	fn small_target_yields_no_merges() {
		let corpus = Corpus::from_text("ab ab ab");
		let tokenizer = BpeTrainer::new(1).train(&corpus).unwrap();
		assert!(tokenizer.merges().is_empty());
		// Base vocabulary untouched: reserved tokens plus "a" and "b</w>".
		assert_eq!(tokenizer.vocab().len(), 5);
	}

	#[test]
	fn singleton_pairs_are_never_merged() {
		// Every word is unique, so every pair occurs exactly once.
		let corpus = Corpus::from_text("ab cd ef");
		let tokenizer = BpeTrainer::new(100).train(&corpus).unwrap();
		assert!(tokenizer.merges().is_empty());
	}

	#[test]
	fn vocabulary_stops_at_target() {
		// Base vocabulary is 9 tokens; two merges fit under the target.
		let corpus = Corpus::from_text("ab ab ab ab abc abc abc abcd abcd");
		let target = 11;
		let tokenizer = BpeTrainer::new(target).train(&corpus).unwrap();
		assert_eq!(tokenizer.vocab().len(), target);
		assert_eq!(tokenizer.merges().len(), 2);
	}

	#[test]
	fn empty_corpus_trains_to_base_vocabulary() {
		let tokenizer = BpeTrainer::new(50).train(&Corpus::from_text("")).unwrap();
		assert!(tokenizer.merges().is_empty());
		assert_eq!(tokenizer.vocab().len(), 3);
		assert_eq!(tokenizer.encode("کچھ"), vec![UNKNOWN_ID; 3]);
	}

	#[test]
	fn merges_never_cross_word_boundaries() {
		// Adjacent words everywhere; no rule may reach past a word's marker.
		let corpus = Corpus::from_text("ab ab ba ab ba");
		let tokenizer = BpeTrainer::new(50).train(&corpus).unwrap();
		assert!(!tokenizer.merges().is_empty());
		for rule in tokenizer.merges().rules() {
			assert!(
				!rule.left.contains("</w>"),
				"rule {:?} starts inside a word boundary",
				rule
			);
		}
	}
}
