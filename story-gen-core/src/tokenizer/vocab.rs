use std::collections::HashMap;

/// Identifier of a vocabulary token.
pub type TokenId = u32;

/// Reserved token for symbols never seen at training time.
pub const UNKNOWN_TOKEN: &str = "<unk>";
/// Reserved token used to pad the generation context at story starts.
pub const START_OF_TEXT_TOKEN: &str = "<bos>";
/// Reserved token marking the end of a story.
pub const END_OF_TEXT_TOKEN: &str = "<eot>";

pub const UNKNOWN_ID: TokenId = 0;
pub const START_OF_TEXT_ID: TokenId = 1;
pub const END_OF_TEXT_ID: TokenId = 2;

/// Marker appended to the final symbol of every word so that merges never
/// cross word boundaries. Stripped again at decode time.
pub const END_OF_WORD_MARKER: &str = "</w>";

/// Append-only mapping between token strings and stable integer ids.
///
/// Ids are assigned in insertion order: the reserved control tokens first
/// (at their fixed ids), then base symbols in corpus scan order, then merged
/// symbols in merge-rank order. The inverse mapping (id to string) is kept
/// for decoding.
///
/// # Invariants
/// - A token string maps to exactly one id and vice versa
/// - The reserved tokens occupy ids 0, 1 and 2
/// - Ids are never reassigned once handed out
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Vocabulary {
	tokens: Vec<String>,
	ids: HashMap<String, TokenId>,
}

impl Vocabulary {
	/// Creates a vocabulary holding only the reserved control tokens.
	pub fn new() -> Self {
		let mut vocab = Self { tokens: Vec::new(), ids: HashMap::new() };
		vocab.intern(UNKNOWN_TOKEN);
		vocab.intern(START_OF_TEXT_TOKEN);
		vocab.intern(END_OF_TEXT_TOKEN);
		vocab
	}

	/// Rebuilds a vocabulary from a persisted, insertion-ordered token list.
	///
	/// # Errors
	/// Returns an error if the list contains duplicates or the reserved
	/// tokens are missing from their fixed ids.
	pub fn from_tokens(tokens: Vec<String>) -> Result<Self, String> {
		let mut ids = HashMap::with_capacity(tokens.len());
		for (id, token) in tokens.iter().enumerate() {
			if ids.insert(token.clone(), id as TokenId).is_some() {
				return Err(format!("duplicate vocabulary entry {token:?}"));
			}
		}
		let vocab = Self { tokens, ids };
		let reserved = [
			(UNKNOWN_TOKEN, UNKNOWN_ID),
			(START_OF_TEXT_TOKEN, START_OF_TEXT_ID),
			(END_OF_TEXT_TOKEN, END_OF_TEXT_ID),
		];
		for (token, id) in reserved {
			if vocab.id_of(token) != Some(id) {
				return Err(format!("reserved token {token:?} missing or not at id {id}"));
			}
		}
		Ok(vocab)
	}

	/// Returns the id of `token`, inserting it first if unseen.
	pub fn intern(&mut self, token: &str) -> TokenId {
		if let Some(&id) = self.ids.get(token) {
			return id;
		}
		let id = self.tokens.len() as TokenId;
		self.tokens.push(token.to_owned());
		self.ids.insert(token.to_owned(), id);
		id
	}

	/// Looks up the id of a token string.
	pub fn id_of(&self, token: &str) -> Option<TokenId> {
		self.ids.get(token).copied()
	}

	/// Looks up the token string for an id.
	pub fn token(&self, id: TokenId) -> Option<&str> {
		self.tokens.get(id as usize).map(String::as_str)
	}

	/// All token strings in id order.
	pub fn tokens(&self) -> &[String] {
		&self.tokens
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}
}
