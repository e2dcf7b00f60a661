mod preprocess;

use crate::error::{Error, Result};
use crate::model::{bundle, Architecture, BundleConfig};
use candle_core::{Device, Module, D};
use candle_nn::{Func, VarBuilder};
use image::DynamicImage;
use std::path::Path;

pub use preprocess::decode;

/// Output of a single-image inference.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub label: String,
    pub index: usize,
    pub probs: Vec<f32>,
}

impl Prediction {
    /// Probability of the predicted label.
    pub fn probability(&self) -> f32 {
        self.probs[self.index]
    }
}

/// A loaded image classifier. Read-only once constructed.
pub struct Classifier {
    architecture: Architecture,
    model: Func<'static>,
    vocab: Vec<String>,
    image_size: usize,
    mean: [f32; 3],
    std: [f32; 3],
    device: Device,
}

impl Classifier {
    pub fn load(bundle_dir: &Path, device: Device) -> Result<Self> {
        tracing::info!("Loading model bundle from: {:?}", bundle_dir);

        let config = BundleConfig::load(bundle_dir)?;
        let vb = bundle::var_builder(bundle_dir, &device)?;

        let classifier = Self::new(config, vb)?;

        tracing::info!("Model loaded successfully");
        tracing::info!("  Architecture: {}", classifier.architecture);
        tracing::info!("  Classes: {}", classifier.vocab.len());
        tracing::info!("  Image size: {}", classifier.image_size);

        Ok(classifier)
    }

    pub fn new(config: BundleConfig, vb: VarBuilder<'static>) -> Result<Self> {
        config.validate()?;

        let device = vb.device().clone();
        let model = config
            .architecture
            .build(config.vocab.len(), vb)
            .map_err(|e| Error::ModelLoadFailed(format!("Failed to build {}: {}", config.architecture, e)))?;

        Ok(Self {
            architecture: config.architecture,
            model,
            vocab: config.vocab,
            image_size: config.image_size,
            mean: config.mean,
            std: config.std,
            device,
        })
    }

    /// Decodes `bytes` and classifies the resulting image.
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Prediction> {
        let image = decode(bytes)?;
        self.predict(&image)
    }

    pub fn predict(&self, image: &DynamicImage) -> Result<Prediction> {
        let probs = self
            .forward(image)
            .map_err(|e| Error::InferenceFailed(e.to_string()))?;

        let index = argmax(&probs)
            .ok_or_else(|| Error::InferenceFailed("Model returned no scores".to_string()))?;
        let label = self
            .vocab
            .get(index)
            .cloned()
            .ok_or_else(|| Error::InferenceFailed(format!("Class index {} out of range", index)))?;

        Ok(Prediction { label, index, probs })
    }

    fn forward(&self, image: &DynamicImage) -> candle_core::Result<Vec<f32>> {
        let input = preprocess::to_tensor(image, self.image_size, &self.mean, &self.std, &self.device)?
            .unsqueeze(0)?;
        let logits = self.model.forward(&input)?;
        candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec1::<f32>()
    }

    pub fn categories(&self) -> &[String] {
        &self.vocab
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }
}

// First maximum wins on ties.
fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use candle_core::DType;
    use candle_nn::VarMap;

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn zero_weights_give_uniform_probabilities() {
        let classifier = test_support::zero_classifier(&["cat", "dog"]);

        let prediction = classifier.classify_bytes(&test_support::png_bytes(48, 48)).unwrap();
        assert_eq!(prediction.label, "cat");
        assert_eq!(prediction.index, 0);
        assert_eq!(prediction.probs.len(), 2);
        assert!((prediction.probability() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn text_payload_is_a_decode_failure() {
        let classifier = test_support::zero_classifier(&["cat", "dog"]);
        assert!(matches!(
            classifier.classify_bytes(b"hello, world"),
            Err(Error::DecodeFailed(_))
        ));
    }

    #[test]
    fn loads_bundle_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BundleConfig::new(
            Architecture::Resnet18,
            vec!["cat".to_string(), "dog".to_string(), "bird".to_string()],
        );
        config.image_size = 32;

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        Architecture::Resnet18.build(config.vocab.len(), vb).unwrap();
        varmap.save(dir.path().join(bundle::WEIGHTS_FILE)).unwrap();
        std::fs::write(
            dir.path().join(bundle::CONFIG_FILE),
            serde_json::to_string(&config).unwrap(),
        )
        .unwrap();

        let classifier = Classifier::load(dir.path(), Device::Cpu).unwrap();
        assert_eq!(classifier.categories(), &["cat", "dog", "bird"]);

        let prediction = classifier.classify_bytes(&test_support::png_bytes(40, 30)).unwrap();
        assert!(classifier.categories().contains(&prediction.label));
        assert!((0.0..=1.0).contains(&prediction.probability()));
        let total: f32 = prediction.probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-3);
    }

    #[test]
    fn weights_for_another_vocabulary_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = BundleConfig::new(Architecture::Resnet18, vec!["cat".to_string(), "dog".to_string()]);

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        Architecture::Resnet18.build(5, vb).unwrap();
        varmap.save(dir.path().join(bundle::WEIGHTS_FILE)).unwrap();
        std::fs::write(
            dir.path().join(bundle::CONFIG_FILE),
            serde_json::to_string(&config).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            Classifier::load(dir.path(), Device::Cpu),
            Err(Error::ModelLoadFailed(_))
        ));
    }

    #[test]
    fn missing_bundle_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Classifier::load(&dir.path().join("export"), Device::Cpu).is_err());
    }
}
