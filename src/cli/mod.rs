use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "imgclass")]
#[command(version, about = "Serve image classification predictions over HTTP", long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Start the HTTP API server (model loaded once at startup)
	Serve {
		/// Model bundle directory or registered model name
		#[arg(long, env = "IMGCLASS_MODEL", default_value = "export")]
		model: String,

		/// Device to run on (e.g., "cpu" or "cuda:0")
		#[arg(long, env = "IMGCLASS_DEVICE", default_value = "cpu")]
		device: String,

		/// Port to listen on
		#[arg(long, env = "IMGCLASS_PORT", default_value = "5000")]
		port: u16,

		/// Host to bind to
		#[arg(long, env = "IMGCLASS_HOST", default_value = "0.0.0.0")]
		host: String,

		/// Total timeout for downloading an image, in seconds
		#[arg(long, env = "IMGCLASS_FETCH_TIMEOUT_SECS", default_value = "30")]
		fetch_timeout_secs: u64,

		/// Largest image body accepted from a remote URL, in bytes
		#[arg(long, env = "IMGCLASS_MAX_IMAGE_BYTES", default_value = "20971520")]
		max_image_bytes: usize,
	},

	/// Classify a single image from a URL or a local file
	Predict {
		/// Image URL (http:// or https://) or local file path
		source: String,

		/// Model bundle directory or registered model name
		#[arg(long, env = "IMGCLASS_MODEL", default_value = "export")]
		model: String,

		/// Device to run on (e.g., "cpu" or "cuda:0")
		#[arg(long, env = "IMGCLASS_DEVICE", default_value = "cpu")]
		device: String,
	},

	/// Download a model bundle from HuggingFace
	Pull {
		/// HuggingFace repository ID holding config.json and the weights
		model: String,

		/// Optional alias for the model
		#[arg(long)]
		alias: Option<String>,
	},

	/// List pulled models
	List,
}
