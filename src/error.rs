use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("Model not found: {0}")]
	ModelNotFound(String),

	#[error("Failed to load model: {0}")]
	ModelLoadFailed(String),

	#[error("Model not loaded")]
	ModelUnavailable,

	#[error("No image_url provided in parameters.")]
	MissingImageUrl,

	#[error("Invalid input: {0}")]
	InvalidInput(String),

	#[error("Failed to download image from URL: {0}")]
	DownloadFailed(String),

	#[error("Prediction failed: {0}")]
	DecodeFailed(String),

	#[error("Prediction failed: {0}")]
	InferenceFailed(String),

	#[error("Model download failed: {0}")]
	PullFailed(String),

	#[error("Configuration error: {0}")]
	ConfigError(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

impl From<toml::de::Error> for Error {
	fn from(err: toml::de::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

impl From<toml::ser::Error> for Error {
	fn from(err: toml::ser::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
