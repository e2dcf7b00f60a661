pub mod bundle;
pub mod downloader;
pub mod registry;

pub use bundle::{Architecture, BundleConfig};
pub use downloader::ModelDownloader;
pub use registry::{resolve_bundle, ModelInfo, ModelRegistry};
