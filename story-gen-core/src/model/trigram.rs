use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::transitions::Transitions;
use crate::corpus::TokenizedCorpus;
use crate::tokenizer::vocab::{START_OF_TEXT_ID, TokenId};

/// Trigram language model over token ids.
///
/// Stores three layers of observation counts: the global unigram table, one
/// table per single-token bigram context, and one per two-token trigram
/// context. Context totals for normalization are stored with each table.
///
/// # Responsibilities
/// - Build all three count tables from a tokenized corpus in one pass
/// - Answer next-token distribution lookups, backing off from trigram to
///   bigram to unigram when a context was never observed
///
/// # Invariants
/// - Counting windows never span two stories; each story is counted behind
///   two start-of-text padding tokens
/// - All tables are immutable after training; concurrent reads need no
///   synchronization
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TrigramModel {
	unigrams: Transitions,
	bigrams: HashMap<TokenId, Transitions>,
	trigrams: HashMap<(TokenId, TokenId), Transitions>,
}

impl TrigramModel {
	/// Builds the count tables from a tokenized corpus.
	///
	/// An empty corpus yields empty tables; that is a tolerated degenerate
	/// state, not an error.
	pub fn train(corpus: &TokenizedCorpus) -> Self {
		let mut model = Self::default();
		for story in corpus.stories() {
			model.add_story(story);
		}
		log::info!(
			"trigram training done: {} unigrams, {} bigrams, {} trigrams",
			model.unigram_count(),
			model.bigram_count(),
			model.trigram_count()
		);
		model
	}

	/// Counts one story, padded with two start-of-text tokens.
	///
	/// The story's trailing end-of-text token participates in counts like
	/// any other token, so the model learns when to stop.
	fn add_story(&mut self, tokens: &[TokenId]) {
		if tokens.is_empty() {
			return;
		}

		let mut sequence = Vec::with_capacity(tokens.len() + 2);
		sequence.push(START_OF_TEXT_ID);
		sequence.push(START_OF_TEXT_ID);
		sequence.extend_from_slice(tokens);

		for i in 0..sequence.len() {
			let token = sequence[i];
			self.unigrams.add(token);
			if i >= 1 {
				self.bigrams.entry(sequence[i - 1]).or_default().add(token);
			}
			if i >= 2 {
				self.trigrams
					.entry((sequence[i - 2], sequence[i - 1]))
					.or_default()
					.add(token);
			}
		}
	}

	/// Next-token distribution for a two-token context, with back-off.
	///
	/// Falls back from the trigram context to the bigram context of the most
	/// recent token, then to the unigram table. For a model trained on a
	/// non-empty corpus the result is never empty.
	pub(crate) fn next_distribution(&self, w1: TokenId, w2: TokenId) -> &Transitions {
		if let Some(transitions) = self.trigrams.get(&(w1, w2)) {
			if !transitions.is_empty() {
				return transitions;
			}
		}
		if let Some(transitions) = self.bigrams.get(&w2) {
			if !transitions.is_empty() {
				return transitions;
			}
		}
		&self.unigrams
	}

	/// Number of distinct unigram types observed.
	pub fn unigram_count(&self) -> usize {
		self.unigrams.len()
	}

	/// Number of distinct bigram types observed.
	pub fn bigram_count(&self) -> usize {
		self.bigrams.values().map(Transitions::len).sum()
	}

	/// Number of distinct trigram types observed.
	pub fn trigram_count(&self) -> usize {
		self.trigrams.values().map(Transitions::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.unigrams.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tokenizer::vocab::END_OF_TEXT_ID;

	const BOS: TokenId = START_OF_TEXT_ID;
	const EOT: TokenId = END_OF_TEXT_ID;

	fn model_for(stories: Vec<Vec<TokenId>>) -> TrigramModel {
		TrigramModel::train(&TokenizedCorpus::new(stories))
	}

	#[test]
	fn counts_one_story() {
		// Counting sequence: [BOS, BOS, 5, 6, EOT]
		let model = model_for(vec![vec![5, 6, EOT]]);

		assert_eq!(model.unigram_count(), 4); // BOS, 5, 6, EOT
		assert_eq!(model.bigram_count(), 4); // (BOS,BOS) (BOS,5) (5,6) (6,EOT)
		assert_eq!(model.trigram_count(), 3);

		assert_eq!(model.next_distribution(BOS, BOS).count(5), 1);
		assert_eq!(model.next_distribution(5, 6).count(EOT), 1);
	}

	#[test]
	fn stories_are_counted_independently() {
		// The (EOT, BOS) of a naive concatenation must not exist.
		let model = model_for(vec![vec![5, EOT], vec![6, EOT]]);
		assert!(model.bigrams.get(&EOT).is_none_or(Transitions::is_empty));
		// Both stories start from the padded context.
		let start = model.next_distribution(BOS, BOS);
		assert_eq!(start.count(5), 1);
		assert_eq!(start.count(6), 1);
	}

	#[test]
	fn backs_off_to_bigram_then_unigram() {
		let model = model_for(vec![vec![5, 6, 7, EOT]]);
		// Unseen trigram context with a seen recent token: bigram table.
		assert_eq!(model.next_distribution(99, 6).count(7), 1);
		// Entirely unseen context: unigram table, which holds every token.
		let unigrams = model.next_distribution(99, 98);
		assert!(unigrams.count(5) > 0);
		assert!(unigrams.count(EOT) > 0);
	}

	#[test]
	fn empty_corpus_yields_empty_tables() {
		let model = model_for(vec![]);
		assert!(model.is_empty());
		assert_eq!(model.unigram_count(), 0);
		assert!(model.next_distribution(1, 2).is_empty());
	}

	#[test]
	fn empty_story_is_skipped() {
		let model = model_for(vec![vec![]]);
		assert!(model.is_empty());
	}
}
