mod classifier;
mod cli;
mod config;
mod error;
mod fetch;
mod model;
mod server;

#[cfg(test)]
mod test_support;

use candle_core::Device;
use clap::Parser;
use classifier::Classifier;
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use fetch::{FetchSettings, ImageFetcher};
use model::ModelDownloader;
use std::path::Path;
use std::time::Duration;

fn parse_device(device_str: &str) -> Result<Device> {
    match device_str {
        "cpu" => Ok(Device::Cpu),
        s if s.starts_with("cuda") => {
            let parts: Vec<&str> = s.split(':').collect();
            let ordinal = if parts.len() > 1 {
                parts[1].parse::<usize>().map_err(|_| {
                    error::Error::InvalidInput(format!("Invalid CUDA device: {}", s))
                })?
            } else {
                0
            };
            Device::new_cuda(ordinal).map_err(|e| {
                error::Error::ConfigError(format!("Failed to initialize CUDA device: {}", e))
            })
        }
        _ => Err(error::Error::InvalidInput(format!(
            "Unknown device: {}",
            device_str
        ))),
    }
}

/// Parses the device and loads the bundle. Every failure here is a model
/// load failure, so `serve` can degrade instead of exiting.
fn load_classifier(model_path: &Path, device: &str) -> Result<Classifier> {
    let device = parse_device(device)?;
    Classifier::load(model_path, device)
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            model,
            device,
            port,
            host,
            fetch_timeout_secs,
            max_image_bytes,
        } => {
            let model_path = model::resolve_bundle(&model, Config::locate);

            // A missing or broken bundle leaves the server up in a degraded state.
            let classifier = match load_classifier(&model_path, &device) {
                Ok(classifier) => Some(classifier),
                Err(e) => {
                    tracing::error!("Error loading model: {}", e);
                    None
                }
            };
            let model_loaded = classifier.is_some();

            let fetcher = ImageFetcher::new(&FetchSettings {
                timeout: Duration::from_secs(fetch_timeout_secs),
                max_bytes: max_image_bytes,
            })?;
            let settings = server::ServerSettings { host, port };
            let state = server::AppState::new(classifier, fetcher, model_path, device.clone());

            println!("🚀 imgclass server starting...");
            println!("   Device: {}", device);
            println!("   Model loaded: {}", model_loaded);
            println!("   Listening on: http://{}:{}", settings.host, settings.port);
            println!("   Health: http://{}:{}/health", settings.host, settings.port);
            println!("   Predict: http://{}:{}/predict?img_url=<url>", settings.host, settings.port);

            server::serve(&settings, state).await?;
        }

        Commands::Predict {
            source,
            model,
            device,
        } => {
            let model_path = model::resolve_bundle(&model, Config::locate);
            let classifier = load_classifier(&model_path, &device)?;

            let bytes = if is_remote(&source) {
                ImageFetcher::new(&FetchSettings::default())?
                    .fetch(&source)
                    .await?
            } else {
                std::fs::read(Path::new(&source))?
            };

            tracing::info!("Classifying {}", source);
            let prediction = classifier.classify_bytes(&bytes)?;
            let output = server::PredictResponse::new(&prediction, classifier.categories());

            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Pull { model, alias } => {
            let config = Config::from_env()?;
            let mut downloader = ModelDownloader::new(config)?;
            let model_info = downloader.pull(&model, alias)?;

            println!("✓ Successfully pulled model: {}", model);
            println!("  Repository: {}", model_info.hf_repo_id);
            println!("  Path: {:?}", model_info.model_path);
            if let Some(alias) = model_info.alias {
                println!("  Alias: {}", alias);
            }
        }

        Commands::List => {
            let config = Config::locate()?;
            let registry = model::ModelRegistry::load(&config)?;
            let models = registry.list_models();

            if models.is_empty() {
                println!("No models pulled.");
                println!("Use 'imgclass pull <repo-id>' to download a model bundle.");
            } else {
                println!("Pulled models:\n");
                for model in models {
                    println!("  {}", model.alias.as_ref().unwrap_or(&model.name));
                    println!("    Repository: {}", model.hf_repo_id);
                    println!("    Path: {:?}", model.model_path);
                    println!("    Downloaded: {}", model.downloaded_at);
                    if let Some(architecture) = &model.architecture {
                        println!("    Architecture: {}", architecture);
                    }
                    if let Some(classes) = model.num_classes {
                        println!("    Classes: {}", classes);
                    }
                    println!();
                }
            }
        }
    }

    Ok(())
}
