use super::merges::{MergeTable, PairMerge};
use super::vocab::{
	END_OF_TEXT_ID, END_OF_TEXT_TOKEN, END_OF_WORD_MARKER, START_OF_TEXT_TOKEN, TokenId,
	UNKNOWN_ID, UNKNOWN_TOKEN, Vocabulary,
};
use crate::corpus::{Corpus, TokenizedCorpus};

/// Splits a word into its base symbols: one per character, with the
/// end-of-word marker fused onto the final one.
pub(crate) fn word_symbols(word: &str) -> Vec<String> {
	let mut symbols: Vec<String> = word.chars().map(String::from).collect();
	if let Some(last) = symbols.last_mut() {
		last.push_str(END_OF_WORD_MARKER);
	}
	symbols
}

/// A trained BPE tokenizer: frozen vocabulary plus ranked merge rules.
///
/// # Responsibilities
/// - Encode arbitrary text to token ids, applying merges in learned-rank
///   order so encoding matches how the vocabulary was built
/// - Decode token ids back to text, restoring word boundaries
/// - Tokenize a whole corpus, terminating each story with the end-of-text id
///
/// # Invariants
/// - Encoding never fails: symbols unseen at training time map to the
///   reserved unknown id
/// - All state is read-only after construction; concurrent use needs no
///   synchronization
#[derive(Clone, Debug)]
pub struct BpeTokenizer {
	vocab: Vocabulary,
	merges: MergeTable,
}

impl BpeTokenizer {
	pub fn new(vocab: Vocabulary, merges: MergeTable) -> Self {
		Self { vocab, merges }
	}

	pub fn vocab(&self) -> &Vocabulary {
		&self.vocab
	}

	pub fn merges(&self) -> &MergeTable {
		&self.merges
	}

	/// Encodes text to token ids.
	///
	/// Text is split into words on whitespace; each word is encoded
	/// independently, so consecutive whitespace collapses. Unknown base
	/// symbols degrade to the unknown token id.
	pub fn encode(&self, text: &str) -> Vec<TokenId> {
		let mut out = Vec::new();
		for word in text.split_whitespace() {
			self.encode_word(word, &mut out);
		}
		out
	}

	/// Applies merge rules to one word, lowest rank first, until none match.
	fn encode_word(&self, word: &str, out: &mut Vec<TokenId>) {
		let mut ids: Vec<TokenId> = word_symbols(word)
			.iter()
			.map(|symbol| self.vocab.id_of(symbol).unwrap_or(UNKNOWN_ID))
			.collect();

		loop {
			// Lowest-rank rule applicable to any adjacent pair.
			let mut best: Option<(PairMerge, (TokenId, TokenId))> = None;
			for pair in ids.windows(2) {
				if let Some(merge) = self.merges.lookup(pair[0], pair[1]) {
					if best.is_none_or(|(current, _)| merge.rank < current.rank) {
						best = Some((merge, (pair[0], pair[1])));
					}
				}
			}
			let Some((merge, (left, right))) = best else { break };

			// Replace every occurrence, left to right, non-overlapping.
			let mut rewritten = Vec::with_capacity(ids.len());
			let mut i = 0;
			while i < ids.len() {
				if i + 1 < ids.len() && ids[i] == left && ids[i + 1] == right {
					rewritten.push(merge.output);
					i += 2;
				} else {
					rewritten.push(ids[i]);
					i += 1;
				}
			}
			ids = rewritten;
		}

		out.extend(ids);
	}

	/// Decodes token ids back to text.
	///
	/// Tokens carrying the end-of-word marker contribute their stem plus a
	/// single space; the start- and end-of-text control tokens are skipped;
	/// ids outside the vocabulary degrade to the unknown token string.
	pub fn decode(&self, ids: &[TokenId]) -> String {
		let mut out = String::new();
		for &id in ids {
			let token = self.vocab.token(id).unwrap_or(UNKNOWN_TOKEN);
			if token == START_OF_TEXT_TOKEN || token == END_OF_TEXT_TOKEN {
				continue;
			}
			if let Some(stem) = token.strip_suffix(END_OF_WORD_MARKER) {
				out.push_str(stem);
				out.push(' ');
			} else {
				out.push_str(token);
			}
		}
		out.truncate(out.trim_end().len());
		out
	}

	/// Tokenizes a corpus, appending the end-of-text id after each story.
	pub fn encode_corpus(&self, corpus: &Corpus) -> TokenizedCorpus {
		let stories = corpus
			.stories()
			.iter()
			.map(|story| {
				let mut ids = self.encode(story);
				ids.push(END_OF_TEXT_ID);
				ids
			})
			.collect();
		TokenizedCorpus::new(stories)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tokenizer::trainer::BpeTrainer;
	use crate::tokenizer::vocab::START_OF_TEXT_ID;

	fn trained(text: &str, target: usize) -> BpeTokenizer {
		BpeTrainer::new(target).train(&Corpus::from_text(text)).unwrap()
	}

	#[test]
	fn word_symbols_marks_final_character() {
		assert_eq!(word_symbols("ab"), ["a", "b</w>"]);
		assert_eq!(word_symbols("x"), ["x</w>"]);
		assert!(word_symbols("").is_empty());
	}

	#[test]
	fn round_trip_over_training_alphabet() {
		let tokenizer = trained("ایک بار کا ذکر ہے ایک بار", 40);
		let decoded = tokenizer.decode(&tokenizer.encode("ایک بار کا ذکر"));
		assert_eq!(decoded, "ایک بار کا ذکر");
	}

	#[test]
	fn round_trip_normalizes_whitespace() {
		let tokenizer = trained("ایک بار ایک بار", 30);
		let decoded = tokenizer.decode(&tokenizer.encode("ایک   بار\n\tایک"));
		assert_eq!(decoded, "ایک بار ایک");
	}

	#[test]
	fn unknown_symbols_map_to_unknown_id() {
		let tokenizer = trained("aa bb aa", 20);
		let ids = tokenizer.encode("zz");
		assert_eq!(ids, vec![UNKNOWN_ID, UNKNOWN_ID]);
	}

	#[test]
	fn encode_never_fails_on_arbitrary_input() {
		let tokenizer = trained("aa bb", 10);
		// Mixed known and unknown symbols, punctuation, emoji.
		let ids = tokenizer.encode("aa £7 🙂 bb");
		assert!(!ids.is_empty());
	}

	#[test]
	fn decode_skips_control_tokens() {
		let tokenizer = trained("aa bb aa", 20);
		let mut ids = vec![START_OF_TEXT_ID, START_OF_TEXT_ID];
		ids.extend(tokenizer.encode("aa"));
		ids.push(END_OF_TEXT_ID);
		assert_eq!(tokenizer.decode(&ids), "aa");
	}

	#[test]
	fn decode_renders_out_of_range_ids_as_unknown() {
		let tokenizer = trained("aa", 10);
		let text = tokenizer.decode(&[9999]);
		assert_eq!(text, UNKNOWN_TOKEN);
	}

	#[test]
	fn encode_corpus_terminates_stories() {
		let tokenizer = trained("aa bb", 20);
		let corpus = Corpus::from_text(&format!("aa{}bb", crate::corpus::STORY_SEPARATOR));
		let tokenized = tokenizer.encode_corpus(&corpus);
		assert_eq!(tokenized.stories().len(), 2);
		for story in tokenized.stories() {
			assert_eq!(story.last(), Some(&END_OF_TEXT_ID));
		}
	}
}
