use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::vocab::{TokenId, Vocabulary};

/// A learned BPE merge: the adjacent symbol pair to replace.
///
/// The merged symbol is always the concatenation of the two sides. A rule's
/// rank is its position in the rule list (the training iteration that
/// learned it) and never changes once learned. Persisted order and loaded
/// rank must match exactly.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MergeRule {
	pub left: String,
	pub right: String,
}

impl MergeRule {
	/// The symbol this rule produces.
	pub fn merged(&self) -> String {
		format!("{}{}", self.left, self.right)
	}
}

/// Resolution of an id pair to the rule that merges it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PairMerge {
	/// Rank of the rule; lower ranks always fire first at encode time.
	pub rank: u32,
	/// Id of the merged symbol.
	pub output: TokenId,
}

/// The ordered merge-rule list plus its encode-time lookup table.
///
/// The rule list is the persisted representation; the id-pair table is
/// derived from it against a vocabulary and answers "does this adjacent id
/// pair merge, at which rank, into which id" in O(1).
#[derive(Clone, Debug, Default)]
pub struct MergeTable {
	rules: Vec<MergeRule>,
	by_pair: HashMap<(TokenId, TokenId), PairMerge>,
}

impl MergeTable {
	/// Builds the lookup table from an ordered rule list.
	///
	/// # Errors
	/// Returns an error if any rule references a symbol the vocabulary does
	/// not contain, or produces a symbol absent from it. This is the
	/// fail-fast path for malformed persisted artifacts.
	pub fn from_rules(rules: Vec<MergeRule>, vocab: &Vocabulary) -> Result<Self, String> {
		let mut by_pair = HashMap::with_capacity(rules.len());
		for (rank, rule) in rules.iter().enumerate() {
			let left = vocab
				.id_of(&rule.left)
				.ok_or_else(|| format!("merge rule {rank} references unknown symbol {:?}", rule.left))?;
			let right = vocab
				.id_of(&rule.right)
				.ok_or_else(|| format!("merge rule {rank} references unknown symbol {:?}", rule.right))?;
			let merged = rule.merged();
			let output = vocab
				.id_of(&merged)
				.ok_or_else(|| format!("merge rule {rank} produces {merged:?} which is not in the vocabulary"))?;
			// Lowest rank wins; a duplicate pair at a higher rank could never fire.
			by_pair
				.entry((left, right))
				.or_insert(PairMerge { rank: rank as u32, output });
		}
		Ok(Self { rules, by_pair })
	}

	/// The rules in rank order.
	pub fn rules(&self) -> &[MergeRule] {
		&self.rules
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}

	/// Resolves an adjacent id pair to its merge, if one was learned.
	pub(crate) fn lookup(&self, left: TokenId, right: TokenId) -> Option<PairMerge> {
		self.by_pair.get(&(left, right)).copied()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn vocab_with(symbols: &[&str]) -> Vocabulary {
		let mut vocab = Vocabulary::new();
		for symbol in symbols {
			vocab.intern(symbol);
		}
		vocab
	}

	#[test]
	fn resolves_pairs_by_rank() {
		let vocab = vocab_with(&["a", "b</w>", "ab</w>"]);
		let rules = vec![MergeRule { left: "a".to_owned(), right: "b</w>".to_owned() }];
		let table = MergeTable::from_rules(rules, &vocab).unwrap();
		let a = vocab.id_of("a").unwrap();
		let b = vocab.id_of("b</w>").unwrap();
		let merge = table.lookup(a, b).unwrap();
		assert_eq!(merge.rank, 0);
		assert_eq!(merge.output, vocab.id_of("ab</w>").unwrap());
		assert!(table.lookup(b, a).is_none());
	}

	#[test]
	fn rejects_rule_with_unknown_operand() {
		let vocab = vocab_with(&["a"]);
		let rules = vec![MergeRule { left: "a".to_owned(), right: "z".to_owned() }];
		let err = MergeTable::from_rules(rules, &vocab).unwrap_err();
		assert!(err.contains("unknown symbol"), "{err}");
	}

	#[test]
	fn rejects_rule_with_missing_product() {
		let vocab = vocab_with(&["a", "b"]);
		let rules = vec![MergeRule { left: "a".to_owned(), right: "b".to_owned() }];
		let err = MergeTable::from_rules(rules, &vocab).unwrap_err();
		assert!(err.contains("not in the vocabulary"), "{err}");
	}
}
