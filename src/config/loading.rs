// Copyright 2025 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::{Config, LogLevel, OPENAI_API_KEY_ENV};

const LOG_LEVEL_ENV: &str = "CELLFILL_LOG_LEVEL";

impl Config {
	/// Environment variables take precedence over config file values
	fn apply_env_overrides(&mut self) {
		if let Ok(openai_key) = std::env::var(OPENAI_API_KEY_ENV) {
			if !openai_key.trim().is_empty() {
				self.providers.openai.api_key = Some(openai_key);
			}
		}

		if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
			match level.parse::<LogLevel>() {
				Ok(level) => self.log_level = level,
				Err(e) => eprintln!("Ignoring {}: {}", LOG_LEVEL_ENV, e),
			}
		}
	}

	/// Load configuration from the system-wide config file
	pub fn load() -> Result<Self> {
		let config_path = crate::directories::get_config_file_path()?;
		Self::load_or_create(&config_path)
	}

	/// Write the defaults to `path` first when no file exists there
	pub fn load_or_create(path: &Path) -> Result<Self> {
		if !path.exists() {
			Config::default().save_to_path(path)?;
		}
		Self::load_from_path(path)
	}

	/// Load configuration from a specific file path
	pub fn load_from_path(path: &Path) -> Result<Self> {
		let config_str = fs::read_to_string(path)
			.context(format!("Failed to read config from {}", path.display()))?;
		let mut config: Config =
			toml::from_str(&config_str).context("Failed to parse TOML configuration")?;

		// Store the config path for future saves
		config.config_path = Some(path.to_path_buf());
		config.apply_env_overrides();

		// Validation problems are not fatal on load
		if let Err(e) = config.validate() {
			eprintln!("Configuration validation warning: {}", e);
			eprintln!("The application will continue, but you may want to fix these issues.");
		}

		Ok(config)
	}

	/// Save configuration to file
	pub fn save(&self) -> Result<()> {
		let config_path = if let Some(path) = &self.config_path {
			path.clone()
		} else {
			crate::directories::get_config_file_path()?
		};
		self.save_to_path(&config_path)
	}

	/// Save configuration to a specific file path
	pub fn save_to_path(&self, path: &Path) -> Result<()> {
		// Validate before saving
		self.validate()?;

		// Ensure the parent directory exists
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).context(format!(
				"Failed to create config directory: {}",
				parent.display()
			))?;
		}

		let config_str =
			toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

		fs::write(path, config_str)
			.context(format!("Failed to write config to {}", path.display()))?;

		Ok(())
	}

	pub fn create_default_config() -> Result<std::path::PathBuf> {
		let config_path = crate::directories::get_config_file_path()?;

		if !config_path.exists() {
			Config::default().save_to_path(&config_path)?;
			println!("Created default configuration at {}", config_path.display());
		}

		Ok(config_path)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_save_and_reload() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("config.toml");

		let mut config = Config::default();
		config.models.advanced = "o3".to_string();
		config.fill.batch_size = 5;
		config.save_to_path(&path).unwrap();

		let loaded = Config::load_from_path(&path).unwrap();
		assert_eq!(loaded.models.advanced, "o3");
		assert_eq!(loaded.fill.batch_size, 5);
		assert_eq!(loaded.config_path(), Some(&path));
	}

	#[test]
	fn test_invalid_config_is_not_saved() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");

		let mut config = Config::default();
		config.fill.batch_size = 0;
		assert!(config.save_to_path(&path).is_err());
		assert!(!path.exists());
	}

	#[test]
	fn test_missing_file_is_created_with_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config").join("config.toml");

		let config = Config::load_or_create(&path).unwrap();
		assert!(path.exists());
		assert_eq!(config.models.fast, "gpt-4o-mini");
		assert_eq!(config.config_path(), Some(&path));

		let written = fs::read_to_string(&path).unwrap();
		assert!(written.contains("gpt-4o-mini"));
	}

	#[test]
	fn test_malformed_toml() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		fs::write(&path, "models = [").unwrap();
		assert!(Config::load_from_path(&path).is_err());
	}
}
