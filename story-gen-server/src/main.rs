use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, post, web};
use serde::{Deserialize, Serialize};

use story_gen_core::artifact::Artifact;
use story_gen_core::model::generator::Generator;
use story_gen_core::model::params::GenerationParams;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

const DEFAULT_MAX_TOKENS: usize = 500;
const MAX_TOKENS_CAP: usize = 2000;
const DEFAULT_TEMPERATURE: f64 = 0.9;
const MIN_TEMPERATURE: f64 = 0.1;
const MAX_TEMPERATURE: f64 = 2.0;

/// Body of the `/v1/generate` endpoint.
#[derive(Deserialize)]
struct GenerateRequest {
	prefix: String,
	max_tokens: Option<usize>,
	temperature: Option<f64>,
	seed: Option<u64>,
}

#[derive(Serialize)]
struct GenerateResponse {
	generated_text: String,
	token_count: usize,
	stopped_at_eot: bool,
}

#[derive(Serialize)]
struct HealthResponse {
	status: &'static str,
	vocab_size: usize,
	unigrams: usize,
	bigrams: usize,
	trigrams: usize,
}

impl GenerateRequest {
	/// Validates the request; the engine only ever sees well-formed
	/// parameters.
	fn params(&self) -> Result<GenerationParams, String> {
		if self.prefix.trim().is_empty() {
			return Err("prefix must not be empty".to_owned());
		}
		let max_tokens = self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
		if max_tokens == 0 || max_tokens > MAX_TOKENS_CAP {
			return Err(format!("max_tokens must be between 1 and {MAX_TOKENS_CAP}"));
		}
		let temperature = self.temperature.unwrap_or(DEFAULT_TEMPERATURE);
		if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
			return Err(format!(
				"temperature must be between {MIN_TEMPERATURE} and {MAX_TEMPERATURE}"
			));
		}
		Ok(GenerationParams { max_tokens, temperature, seed: self.seed })
	}
}

/// HTTP POST endpoint `/v1/generate`
///
/// Generates a continuation of the supplied prefix and returns it as JSON.
#[post("/v1/generate")]
async fn post_generate(
	data: web::Data<Artifact>,
	request: web::Json<GenerateRequest>,
) -> impl Responder {
	let params = match request.params() {
		Ok(params) => params,
		Err(message) => return HttpResponse::BadRequest().body(message),
	};

	let generator = Generator::new(&data.tokenizer, &data.model);
	match generator.generate(&request.prefix, &params) {
		Ok(generation) => HttpResponse::Ok().json(GenerateResponse {
			generated_text: generation.text,
			token_count: generation.token_count,
			stopped_at_eot: generation.stopped_at_eot,
		}),
		Err(message) => HttpResponse::InternalServerError().body(message),
	}
}

/// HTTP GET endpoint `/v1/health`
///
/// Reports readiness along with the loaded model's table sizes.
#[get("/v1/health")]
async fn get_health(data: web::Data<Artifact>) -> impl Responder {
	HttpResponse::Ok().json(HealthResponse {
		status: "ok",
		vocab_size: data.tokenizer.vocab().len(),
		unigrams: data.model.unigram_count(),
		bigrams: data.model.bigram_count(),
		trigrams: data.model.trigram_count(),
	})
}

/// Main entry point for the server.
///
/// Loads the trained artifact once at startup and serves it read-only; no
/// request mutates the model, so the handlers share it without a lock.
/// A missing or malformed artifact is a fatal startup error.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let data_dir = std::env::var("STORY_GEN_DATA").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_owned());
	let bind_addr =
		std::env::var("STORY_GEN_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_owned());

	let artifact = match Artifact::load(&data_dir) {
		Ok(artifact) => artifact,
		Err(error) => {
			log::error!("failed to load model artifact from {data_dir}: {error}");
			return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, error.to_string()));
		}
	};
	log::info!("listening on {bind_addr}");

	let shared = web::Data::new(artifact);
	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared.clone())
			.service(post_generate)
			.service(get_health)
	})
		.bind(bind_addr)?
		.run()
		.await
}
