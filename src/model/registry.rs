use crate::config::Config;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub hf_repo_id: String,
    pub alias: Option<String>,
    pub model_path: PathBuf,
    pub architecture: Option<String>,
    pub num_classes: Option<usize>,
    pub downloaded_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ModelRegistry {
    models: HashMap<String, ModelInfo>,
}

impl ModelRegistry {
    pub fn load(config: &Config) -> Result<Self> {
        if !config.registry_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config.registry_path)?;
        let registry: ModelRegistry = toml::from_str(&content)?;
        Ok(registry)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(&config.registry_path, content)?;
        Ok(())
    }

    pub fn add_model(&mut self, model: ModelInfo) {
        let key = model.alias.clone().unwrap_or_else(|| model.name.clone());
        self.models.insert(key, model);
    }

    pub fn get_model(&self, name: &str) -> Result<&ModelInfo> {
        self.models
            .get(name)
            .ok_or_else(|| Error::ModelNotFound(name.to_string()))
    }

    pub fn list_models(&self) -> Vec<&ModelInfo> {
        let mut models: Vec<_> = self.models.values().collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));
        models
    }
}

/// Maps `--model` to a bundle directory. An existing path wins, then a
/// registered name. Anything else is returned as a path so the loader
/// reports it. `locate` runs only when the path does not exist.
pub fn resolve_bundle<F>(model: &str, locate: F) -> PathBuf
where
    F: FnOnce() -> Result<Config>,
{
    let path = Path::new(model);
    if path.exists() {
        return path.to_path_buf();
    }

    match locate().and_then(|config| ModelRegistry::load(&config)) {
        Ok(registry) => match registry.get_model(model) {
            Ok(info) => info.model_path.clone(),
            Err(_) => path.to_path_buf(),
        },
        Err(e) => {
            tracing::warn!("Could not read model registry: {}", e);
            path.to_path_buf()
        }
    }
}
