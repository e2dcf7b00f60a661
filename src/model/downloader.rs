use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::bundle::{self, BundleConfig};
use crate::model::{ModelInfo, ModelRegistry};
use hf_hub::api::sync::ApiBuilder;

pub struct ModelDownloader {
    config: Config,
    registry: ModelRegistry,
}

impl ModelDownloader {
    pub fn new(config: Config) -> Result<Self> {
        let registry = ModelRegistry::load(&config)?;
        Ok(Self { config, registry })
    }

    pub fn pull(&mut self, hf_repo_id: &str, alias: Option<String>) -> Result<ModelInfo> {
        tracing::info!("Pulling model bundle from HuggingFace: {}", hf_repo_id);

        let api = ApiBuilder::new()
            .with_cache_dir(self.config.models_dir.clone())
            .build()
            .map_err(|e| Error::PullFailed(e.to_string()))?;

        let repo = api.model(hf_repo_id.to_string());

        tracing::info!("Downloading bundle files...");

        let config_file = repo
            .get(bundle::CONFIG_FILE)
            .map_err(|e| Error::PullFailed(format!("Could not find config: {}", e)))?;

        let _weights_file = repo
            .get(bundle::WEIGHTS_FILE)
            .or_else(|_| repo.get(bundle::PYTORCH_WEIGHTS_FILE))
            .map_err(|e| Error::PullFailed(format!("Could not find model weights: {}", e)))?;

        let model_dir = config_file
            .parent()
            .ok_or_else(|| Error::PullFailed("Invalid model path".to_string()))?;

        bundle::ensure_safetensors(model_dir)?;
        let bundle_config = BundleConfig::load(model_dir)?;

        let name = alias.clone().unwrap_or_else(|| {
            hf_repo_id
                .split('/')
                .next_back()
                .unwrap_or(hf_repo_id)
                .to_string()
        });

        let model_info = ModelInfo {
            name: hf_repo_id.to_string(),
            hf_repo_id: hf_repo_id.to_string(),
            alias,
            model_path: model_dir.to_path_buf(),
            architecture: Some(bundle_config.architecture.to_string()),
            num_classes: Some(bundle_config.vocab.len()),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
        };

        self.registry.add_model(model_info.clone());
        self.registry.save(&self.config)?;

        tracing::info!("Model '{}' successfully pulled and registered", name);

        Ok(model_info)
    }
}
