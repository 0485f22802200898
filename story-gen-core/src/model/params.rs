/// Parameters for a single generation request.
///
/// `GenerationParams` carries the sampling controls the serving layer has
/// already validated: a token budget, a temperature and an optional seed.
///
/// # Invariants
/// - `temperature` must be a positive finite number; the generator rejects
///   anything else
/// - A `seed` makes the whole generation reproducible for identical inputs;
///   without one, each request draws from operating-system entropy
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationParams {
	/// Maximum number of tokens to draw. Zero returns an empty continuation.
	pub max_tokens: usize,

	/// Sampling temperature: below 1.0 sharpens the distribution toward the
	/// mode, above 1.0 flattens it toward uniform.
	pub temperature: f64,

	/// Optional seed for a reproducible generation.
	pub seed: Option<u64>,
}

impl Default for GenerationParams {
	fn default() -> Self {
		Self { max_tokens: 500, temperature: 0.9, seed: None }
	}
}

/// Result of a generation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generation {
	/// The decoded continuation, prefix excluded.
	pub text: String,

	/// Number of tokens drawn (the end-of-text token included when drawn).
	pub token_count: usize,

	/// Whether generation stopped because the end-of-text token was drawn,
	/// rather than by exhausting the token budget.
	pub stopped_at_eot: bool,
}
