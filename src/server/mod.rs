use crate::classifier::{Classifier, Prediction};
use crate::error::{Error, Result};
use crate::fetch::ImageFetcher;
use axum::{
	extract::{rejection::QueryRejection, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
	Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const BANNER: &str = "Image Classification API. Use /predict endpoint.";

#[derive(Debug, Clone)]
pub struct ServerSettings {
	pub host: String,
	pub port: u16,
}

#[derive(Clone)]
pub struct AppState {
	classifier: Option<Arc<Classifier>>,
	fetcher: ImageFetcher,
	model_path: PathBuf,
	device_name: String,
}

impl AppState {
	pub fn new(
		classifier: Option<Classifier>,
		fetcher: ImageFetcher,
		model_path: PathBuf,
		device_name: String,
	) -> Self {
		Self {
			classifier: classifier.map(Arc::new),
			fetcher,
			model_path,
			device_name,
		}
	}
}

#[derive(Debug, Default)]
pub struct PredictParams {
	pub img_url: Option<String>,
}

impl PredictParams {
	/// The first non-empty `img_url` wins; repeats and unknown keys are ignored.
	pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
		Self {
			img_url: pairs
				.into_iter()
				.find(|(key, value)| key == "img_url" && !value.is_empty())
				.map(|(_, value)| value),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
	pub prediction: String,
	pub probability: f32,
	pub categories: Vec<String>,
}

impl PredictResponse {
	pub fn new(prediction: &Prediction, categories: &[String]) -> Self {
		Self {
			prediction: prediction.label.clone(),
			probability: prediction.probability(),
			categories: categories.to_vec(),
		}
	}
}

#[derive(Serialize)]
pub struct HealthResponse {
	pub status: String,
	pub model_loaded: bool,
	pub model: String,
	pub architecture: Option<String>,
	pub device: String,
	pub categories: Vec<String>,
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let (status, message) = match self {
			Error::MissingImageUrl | Error::DownloadFailed(_) | Error::InvalidInput(_) => {
				(StatusCode::BAD_REQUEST, self.to_string())
			}
			Error::ModelUnavailable | Error::DecodeFailed(_) | Error::InferenceFailed(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
			}
			_ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
		};

		let body = Json(serde_json::json!({
			"error": message,
		}));

		(status, body).into_response()
	}
}

async fn home_handler() -> &'static str {
	BANNER
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
	let classifier = state.classifier.as_deref();

	Json(HealthResponse {
		status: if classifier.is_some() { "ok" } else { "degraded" }.to_string(),
		model_loaded: classifier.is_some(),
		model: state.model_path.display().to_string(),
		architecture: classifier.map(|c| c.architecture().to_string()),
		device: state.device_name.clone(),
		categories: classifier.map(|c| c.categories().to_vec()).unwrap_or_default(),
	})
}

async fn predict_handler(
	State(state): State<AppState>,
	query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<PredictResponse>> {
	let classifier = state.classifier.clone().ok_or(Error::ModelUnavailable)?;

	let params = match query {
		Ok(Query(pairs)) => PredictParams::from_pairs(pairs),
		Err(e) => {
			tracing::debug!("Unreadable query string: {}", e);
			PredictParams::default()
		}
	};
	let img_url = params.img_url.ok_or(Error::MissingImageUrl)?;

	tracing::debug!("Predicting for {}", img_url);

	let bytes = state.fetcher.fetch(&img_url).await.inspect_err(|e| {
		tracing::warn!("{}", e);
	})?;

	let model = Arc::clone(&classifier);
	let prediction = tokio::task::spawn_blocking(move || model.classify_bytes(&bytes))
		.await
		.map_err(|e| Error::InferenceFailed(e.to_string()))?
		.inspect_err(|e| tracing::warn!("{}", e))?;

	tracing::info!(
		"Predicted '{}' ({:.4}) for {}",
		prediction.label,
		prediction.probability(),
		img_url
	);

	Ok(Json(PredictResponse::new(&prediction, classifier.categories())))
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/", get(home_handler))
		.route("/predict", get(predict_handler))
		.route("/health", get(health_handler))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

pub async fn serve(settings: &ServerSettings, state: AppState) -> Result<()> {
	let app = create_router(state);
	let addr = format!("{}:{}", settings.host, settings.port);

	tracing::info!("Starting server on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.map_err(|e| Error::ConfigError(format!("Failed to bind to {}: {}", addr, e)))?;

	axum::serve(listener, app)
		.await
		.map_err(|e| Error::ConfigError(format!("Server error: {}", e)))?;

	Ok(())
}
