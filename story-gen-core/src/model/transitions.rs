use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::tokenizer::vocab::TokenId;

/// Outgoing transition counts for one n-gram context.
///
/// A `Transitions` value corresponds to a fixed context (nothing for the
/// unigram table, one token for bigrams, two for trigrams) and stores how
/// often each next token was observed after it.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate observation counts during training
/// - Turn raw counts into a temperature-adjusted probability distribution
/// - Draw the next token by weighted random sampling
///
/// ## Invariants
/// - `total` equals the sum of all counts
/// - Every stored count is strictly positive
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Transitions {
	/// Sum of all outgoing counts, kept for normalization.
	total: u64,
	/// Observation counts indexed by the next token id.
	counts: HashMap<TokenId, u64>,
}

impl Transitions {
	/// Records one observation of `token` after this context.
	pub fn add(&mut self, token: TokenId) {
		*self.counts.entry(token).or_insert(0) += 1;
		self.total += 1;
	}

	/// Number of distinct next tokens observed.
	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	pub fn total(&self) -> u64 {
		self.total
	}

	/// Observation count for one next token (zero if never seen).
	pub fn count(&self, token: TokenId) -> u64 {
		self.counts.get(&token).copied().unwrap_or(0)
	}

	/// Temperature-adjusted probability distribution over next tokens.
	///
	/// Raw counts are normalized to probabilities, raised to the power
	/// `1 / temperature` and renormalized. Entries are sorted by token id so
	/// the cumulative draw below is reproducible under a fixed seed.
	///
	/// If extreme temperatures underflow every weight to zero, the
	/// distribution collapses to the modal token with probability one
	/// (lowest id on a tie).
	pub fn distribution(&self, temperature: f64) -> Vec<(TokenId, f64)> {
		if self.counts.is_empty() {
			return Vec::new();
		}

		let mut entries: Vec<(TokenId, u64)> = self.counts.iter().map(|(&t, &c)| (t, c)).collect();
		entries.sort_unstable_by_key(|&(token, _)| token);

		let total = self.total as f64;
		let mut weights: Vec<(TokenId, f64)> = entries
			.iter()
			.map(|&(token, count)| (token, (count as f64 / total).powf(1.0 / temperature)))
			.collect();

		let sum: f64 = weights.iter().map(|(_, weight)| weight).sum();
		if sum > 0.0 && sum.is_finite() {
			for (_, weight) in &mut weights {
				*weight /= sum;
			}
			return weights;
		}

		let (mode, _) = entries
			.iter()
			.copied()
			.max_by_key(|&(token, count)| (count, std::cmp::Reverse(token)))
			.expect("non-empty counts");
		vec![(mode, 1.0)]
	}

	/// Draws one next token from the temperature-adjusted distribution.
	///
	/// Returns `None` only when the context has no observations.
	pub fn sample<R: Rng>(&self, temperature: f64, rng: &mut R) -> Option<TokenId> {
		let weights = self.distribution(temperature);
		if weights.is_empty() {
			return None;
		}

		let mut r = rng.random::<f64>();

		let mut fallback = None;
		for (token, probability) in &weights {
			if r < *probability {
				return Some(*token);
			}
			r -= probability;
			fallback = Some(*token);
		}

		// Floating-point rounding: the final bucket absorbs the remainder.
		fallback
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn transitions(pairs: &[(TokenId, u64)]) -> Transitions {
		let mut t = Transitions::default();
		for &(token, count) in pairs {
			for _ in 0..count {
				t.add(token);
			}
		}
		t
	}

	#[test]
	fn counts_accumulate() {
		let t = transitions(&[(5, 3), (6, 1)]);
		assert_eq!(t.total(), 4);
		assert_eq!(t.count(5), 3);
		assert_eq!(t.count(9), 0);
		assert_eq!(t.len(), 2);
	}

	#[test]
	fn distribution_sums_to_one() {
		let t = transitions(&[(1, 7), (2, 2), (3, 1)]);
		for temperature in [0.5, 0.9, 1.0, 1.7] {
			let dist = t.distribution(temperature);
			let sum: f64 = dist.iter().map(|(_, p)| p).sum();
			assert!((sum - 1.0).abs() < 1e-9, "sum {sum} at temperature {temperature}");
			assert!(dist.iter().all(|(_, p)| *p >= 0.0));
		}
	}

	#[test]
	fn low_temperature_sharpens_toward_mode() {
		let t = transitions(&[(1, 8), (2, 2)]);
		let neutral = t.distribution(1.0);
		let sharp = t.distribution(0.5);
		assert!(sharp[0].1 > neutral[0].1);
	}

	#[test]
	fn high_temperature_flattens() {
		let t = transitions(&[(1, 8), (2, 2)]);
		let neutral = t.distribution(1.0);
		let flat = t.distribution(2.0);
		assert!(flat[0].1 < neutral[0].1);
		assert!(flat[1].1 > neutral[1].1);
	}

	#[test]
	fn extreme_temperature_collapses_to_mode() {
		let t = transitions(&[(1, 8), (2, 2)]);
		let dist = t.distribution(1e-6);
		assert_eq!(dist, vec![(1, 1.0)]);
	}

	#[test]
	fn sampling_is_deterministic_under_seed() {
		let t = transitions(&[(1, 3), (2, 5), (3, 2)]);
		let draw = |seed| {
			let mut rng = StdRng::seed_from_u64(seed);
			(0..10).map(|_| t.sample(0.9, &mut rng).unwrap()).collect::<Vec<_>>()
		};
		assert_eq!(draw(42), draw(42));
	}

	#[test]
	fn empty_context_yields_nothing() {
		let t = Transitions::default();
		assert!(t.distribution(1.0).is_empty());
		let mut rng = StdRng::seed_from_u64(0);
		assert_eq!(t.sample(1.0, &mut rng), None);
	}
}
