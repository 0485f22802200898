use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io;
use crate::tokenizer::vocab::TokenId;

/// Separator character the preprocessor writes after each story.
///
/// Taken from the Unicode private use area so it can never collide with
/// corpus text.
pub const STORY_SEPARATOR: char = '\u{E003}';

/// A pre-cleaned training corpus, split into individual stories.
///
/// The loader expects plain UTF-8 text with stories delimited by
/// [`STORY_SEPARATOR`]. Empty segments (for example a trailing separator)
/// are dropped. Any other markers the preprocessor may embed are left in
/// place and treated as ordinary text by the tokenizer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Corpus {
	stories: Vec<String>,
}

impl Corpus {
	/// Loads and splits a corpus file.
	///
	/// # Errors
	/// Returns an error if the file cannot be read or is not valid UTF-8.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
		Ok(Self::from_text(&io::read_text(path)?))
	}

	/// Splits raw corpus text into stories on [`STORY_SEPARATOR`].
	pub fn from_text(text: &str) -> Self {
		let stories = text
			.split(STORY_SEPARATOR)
			.map(str::trim)
			.filter(|story| !story.is_empty())
			.map(str::to_owned)
			.collect();
		Self { stories }
	}

	/// Read-only view of the stories, in corpus order.
	pub fn stories(&self) -> &[String] {
		&self.stories
	}

	/// Number of stories in the corpus.
	pub fn len(&self) -> usize {
		self.stories.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stories.is_empty()
	}
}

/// A corpus after tokenization: one token-id sequence per story.
///
/// Every story sequence ends with the end-of-text id, the boundary marker
/// the trigram model relies on: counting windows never span two stories.
/// This is the unit cached to disk between training runs.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenizedCorpus {
	stories: Vec<Vec<TokenId>>,
}

impl TokenizedCorpus {
	pub fn new(stories: Vec<Vec<TokenId>>) -> Self {
		Self { stories }
	}

	/// Read-only view of the per-story token sequences.
	pub fn stories(&self) -> &[Vec<TokenId>] {
		&self.stories
	}

	/// Total number of tokens across all stories.
	pub fn token_count(&self) -> usize {
		self.stories.iter().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.stories.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_on_story_separator() {
		let text = format!("پہلی کہانی{STORY_SEPARATOR}دوسری کہانی{STORY_SEPARATOR}");
		let corpus = Corpus::from_text(&text);
		assert_eq!(corpus.stories(), ["پہلی کہانی", "دوسری کہانی"]);
	}

	#[test]
	fn drops_blank_stories() {
		let text = format!("  {STORY_SEPARATOR}\n{STORY_SEPARATOR}ایک{STORY_SEPARATOR}");
		let corpus = Corpus::from_text(&text);
		assert_eq!(corpus.len(), 1);
	}

	#[test]
	fn text_without_separator_is_one_story() {
		let corpus = Corpus::from_text("ایک بار کا ذکر ہے");
		assert_eq!(corpus.len(), 1);
		assert!(!corpus.is_empty());
	}

	#[test]
	fn tokenized_corpus_counts_tokens() {
		let tokenized = TokenizedCorpus::new(vec![vec![3, 4, 2], vec![5, 2]]);
		assert_eq!(tokenized.token_count(), 5);
		assert_eq!(tokenized.stories().len(), 2);
	}
}
