use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem locations for pulled model bundles and their registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	pub data_dir: PathBuf,
	pub models_dir: PathBuf,
	pub registry_path: PathBuf,
}

impl Config {
	/// Resolves the locations from `IMGCLASS_DATA_DIR` or the platform data
	/// directory. Nothing is created.
	pub fn locate() -> crate::error::Result<Self> {
		match std::env::var("IMGCLASS_DATA_DIR") {
			Ok(data_dir) if !data_dir.is_empty() => Ok(Self::under(PathBuf::from(data_dir))),
			_ => {
				let project_dirs = ProjectDirs::from("", "", "imgclass").ok_or_else(|| {
					crate::error::Error::ConfigError("Could not determine data directory".to_string())
				})?;
				Ok(Self::under(project_dirs.data_dir().to_path_buf()))
			}
		}
	}

	/// Like [`Config::locate`], creating the directories.
	pub fn from_env() -> crate::error::Result<Self> {
		let config = Self::locate()?;
		config.create_dirs()?;
		Ok(config)
	}

	pub fn at(data_dir: PathBuf) -> crate::error::Result<Self> {
		let config = Self::under(data_dir);
		config.create_dirs()?;
		Ok(config)
	}

	pub fn under(data_dir: PathBuf) -> Self {
		let models_dir = data_dir.join("models");
		let registry_path = data_dir.join("models.toml");

		Self {
			data_dir,
			models_dir,
			registry_path,
		}
	}

	fn create_dirs(&self) -> crate::error::Result<()> {
		std::fs::create_dir_all(&self.data_dir)?;
		std::fs::create_dir_all(&self.models_dir)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn creates_layout_under_data_dir() {
		let dir = tempfile::tempdir().unwrap();
		let config = Config::at(dir.path().join("data")).unwrap();

		assert!(config.models_dir.is_dir());
		assert_eq!(config.registry_path, dir.path().join("data").join("models.toml"));
	}

	#[test]
	fn under_does_not_touch_the_filesystem() {
		let dir = tempfile::tempdir().unwrap();
		let config = Config::under(dir.path().join("data"));

		assert!(!config.data_dir.exists());
		assert!(!config.models_dir.exists());
	}
}
