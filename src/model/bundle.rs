use crate::error::{Error, Result};
use candle_core::{pickle, DType, Device, Tensor};
use candle_nn::{Func, VarBuilder};
use candle_transformers::models::resnet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";
pub const PYTORCH_WEIGHTS_FILE: &str = "pytorch_model.bin";

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Resnet18,
    Resnet34,
    Resnet50,
    Resnet101,
    Resnet152,
}

impl Architecture {
    /// Builds the network with a final layer of `num_classes` outputs.
    pub fn build(
        self,
        num_classes: usize,
        vb: VarBuilder<'static>,
    ) -> candle_core::Result<Func<'static>> {
        match self {
            Architecture::Resnet18 => resnet::resnet18(num_classes, vb),
            Architecture::Resnet34 => resnet::resnet34(num_classes, vb),
            Architecture::Resnet50 => resnet::resnet50(num_classes, vb),
            Architecture::Resnet101 => resnet::resnet101(num_classes, vb),
            Architecture::Resnet152 => resnet::resnet152(num_classes, vb),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Architecture::Resnet18 => "resnet18",
            Architecture::Resnet34 => "resnet34",
            Architecture::Resnet50 => "resnet50",
            Architecture::Resnet101 => "resnet101",
            Architecture::Resnet152 => "resnet152",
        };
        f.write_str(name)
    }
}

/// Contents of a bundle's `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    pub architecture: Architecture,
    pub vocab: Vec<String>,
    #[serde(default = "default_image_size")]
    pub image_size: usize,
    #[serde(default = "default_mean")]
    pub mean: [f32; 3],
    #[serde(default = "default_std")]
    pub std: [f32; 3],
}

fn default_image_size() -> usize {
    224
}

fn default_mean() -> [f32; 3] {
    IMAGENET_MEAN
}

fn default_std() -> [f32; 3] {
    IMAGENET_STD
}

impl BundleConfig {
    pub fn new(architecture: Architecture, vocab: Vec<String>) -> Self {
        Self {
            architecture,
            vocab,
            image_size: default_image_size(),
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    pub fn load(bundle_dir: &Path) -> Result<Self> {
        let config_path = bundle_dir.join(CONFIG_FILE);
        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            Error::ModelLoadFailed(format!("Failed to read {:?}: {}", config_path, e))
        })?;

        let config: BundleConfig = serde_json::from_str(&content)
            .map_err(|e| Error::ModelLoadFailed(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vocab.is_empty() {
            return Err(Error::ModelLoadFailed("Vocabulary is empty".to_string()));
        }
        if self.image_size == 0 {
            return Err(Error::ModelLoadFailed("image_size must be positive".to_string()));
        }
        if self.std.iter().any(|s| *s == 0.0) {
            return Err(Error::ModelLoadFailed("std entries must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Opens the bundle's weights without touching the bundle directory.
/// Safetensors are memory-mapped; a PyTorch checkpoint is read into memory.
pub fn var_builder(bundle_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors_file = bundle_dir.join(WEIGHTS_FILE);
    if safetensors_file.exists() {
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[safetensors_file], DType::F32, device)
                .map_err(|e| Error::ModelLoadFailed(format!("Failed to load safetensors: {}", e)))?
        };
        return Ok(vb);
    }

    let pytorch_file = bundle_dir.join(PYTORCH_WEIGHTS_FILE);
    if pytorch_file.exists() {
        let tensors = read_pytorch(&pytorch_file)?;
        return Ok(VarBuilder::from_tensors(tensors, DType::F32, device));
    }

    Err(Error::ModelLoadFailed(format!(
        "No {} or {} in {:?}",
        WEIGHTS_FILE, PYTORCH_WEIGHTS_FILE, bundle_dir
    )))
}

fn read_pytorch(pytorch_file: &Path) -> Result<HashMap<String, Tensor>> {
    let tensors_vec = pickle::read_all(pytorch_file)
        .map_err(|e| Error::ModelLoadFailed(format!("Failed to read PyTorch file: {}", e)))?;

    tracing::info!("Loading {} tensors from PyTorch checkpoint", tensors_vec.len());

    Ok(tensors_vec.into_iter().collect())
}

/// Rewrites a pulled PyTorch checkpoint as `model.safetensors` and removes
/// the checkpoint.
pub fn ensure_safetensors(bundle_dir: &Path) -> Result<()> {
    let pytorch_file = bundle_dir.join(PYTORCH_WEIGHTS_FILE);
    let safetensors_file = bundle_dir.join(WEIGHTS_FILE);

    if safetensors_file.exists() || !pytorch_file.exists() {
        return Ok(());
    }

    tracing::info!("Converting {} to {}...", PYTORCH_WEIGHTS_FILE, WEIGHTS_FILE);

    let tensors = read_pytorch(&pytorch_file)?;

    candle_core::safetensors::save(&tensors, &safetensors_file)
        .map_err(|e| Error::ModelLoadFailed(format!("Failed to save SafeTensors: {}", e)))?;

    tracing::info!("Converted to SafeTensors format");

    if let Err(e) = std::fs::remove_file(&pytorch_file) {
        tracing::warn!("Could not remove {}: {}", PYTORCH_WEIGHTS_FILE, e);
    }

    Ok(())
}
