use rand::SeedableRng;
use rand::rngs::StdRng;

use super::params::{Generation, GenerationParams};
use super::trigram::TrigramModel;
use crate::tokenizer::bpe::BpeTokenizer;
use crate::tokenizer::vocab::{END_OF_TEXT_ID, START_OF_TEXT_ID, TokenId};

/// Stateless sampling generator over a trained tokenizer and model.
///
/// # Responsibilities
/// - Encode the prefix and derive the initial two-token context
/// - Repeatedly draw the next token from the backed-off distribution with
///   temperature scaling, shifting the context forward
/// - Stop on the end-of-text token or when the token budget runs out, then
///   decode the drawn tokens
///
/// # Notes
/// - Holds only shared references; one generator per request is cheap, and
///   concurrent requests over one artifact need no synchronization
/// - Each call owns its random source: seeded when requested, seeded from
///   operating-system entropy otherwise
pub struct Generator<'a> {
	tokenizer: &'a BpeTokenizer,
	model: &'a TrigramModel,
}

impl<'a> Generator<'a> {
	pub fn new(tokenizer: &'a BpeTokenizer, model: &'a TrigramModel) -> Self {
		Self { tokenizer, model }
	}

	/// Generates a continuation of `prefix`.
	///
	/// The last two tokens of the encoded prefix form the initial context,
	/// padded with the start-of-text token when the prefix encodes to fewer
	/// than two tokens (an empty prefix starts a fresh story).
	///
	/// # Errors
	/// Returns an error if `temperature` is not a positive finite number.
	/// Callers are expected to validate this earlier; the check here only
	/// restates the precondition.
	pub fn generate(&self, prefix: &str, params: &GenerationParams) -> Result<Generation, String> {
		if !params.temperature.is_finite() || params.temperature <= 0.0 {
			return Err(format!(
				"temperature must be a positive finite number, got {}",
				params.temperature
			));
		}

		let mut rng = match params.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_os_rng(),
		};

		let prefix_ids = self.tokenizer.encode(prefix);
		let mut w1 = if prefix_ids.len() >= 2 {
			prefix_ids[prefix_ids.len() - 2]
		} else {
			START_OF_TEXT_ID
		};
		let mut w2 = prefix_ids.last().copied().unwrap_or(START_OF_TEXT_ID);

		let mut generated: Vec<TokenId> = Vec::new();
		let mut stopped_at_eot = false;
		for _ in 0..params.max_tokens {
			let distribution = self.model.next_distribution(w1, w2);
			let Some(token) = distribution.sample(params.temperature, &mut rng) else {
				// Only an empty-corpus model gets here; nothing to draw.
				break;
			};
			generated.push(token);
			if token == END_OF_TEXT_ID {
				stopped_at_eot = true;
				break;
			}
			w1 = w2;
			w2 = token;
		}

		Ok(Generation {
			text: self.tokenizer.decode(&generated),
			token_count: generated.len(),
			stopped_at_eot,
		})
	}
}
