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

// Directory utilities for cross-platform data directory management

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the system-wide data directory for cellfill
///
/// - macOS: ~/.local/share/cellfill
/// - Linux: ~/.local/share/cellfill (following XDG Base Directory specification)
/// - Windows: %LOCALAPPDATA%/cellfill
pub fn get_cellfill_data_dir() -> Result<PathBuf> {
	let data_dir = match dirs::home_dir() {
		Some(home) => {
			#[cfg(target_os = "windows")]
			let path = match dirs::data_local_dir() {
				Some(dir) => dir.join("cellfill"),
				None => home.join("AppData").join("Local").join("cellfill"),
			};

			#[cfg(not(target_os = "windows"))]
			let path = home.join(".local").join("share").join("cellfill");

			path
		}
		None => {
			return Err(anyhow::anyhow!("Unable to determine home directory"));
		}
	};

	ensure_dir(&data_dir)?;
	Ok(data_dir)
}

fn ensure_dir(dir: &PathBuf) -> Result<()> {
	if !dir.exists() {
		fs::create_dir_all(dir)
			.context(format!("Failed to create directory: {}", dir.display()))?;
	}
	Ok(())
}

/// Get the configuration directory path
pub fn get_config_dir() -> Result<PathBuf> {
	let config_dir = get_cellfill_data_dir()?.join("config");
	ensure_dir(&config_dir)?;
	Ok(config_dir)
}

/// Get the logs directory path
pub fn get_logs_dir() -> Result<PathBuf> {
	let logs_dir = get_cellfill_data_dir()?.join("logs");
	ensure_dir(&logs_dir)?;
	Ok(logs_dir)
}

/// Get the default configuration file path
pub fn get_config_file_path() -> Result<PathBuf> {
	Ok(get_config_dir()?.join("config.toml"))
}

/// Display information about the data directory locations
pub fn print_directory_info() -> Result<()> {
	println!("Cellfill Data Directories:");
	println!("  Data Dir:   {}", get_cellfill_data_dir()?.display());
	println!("  Config Dir: {}", get_config_dir()?.display());
	println!("  Logs Dir:   {}", get_logs_dir()?.display());

	Ok(())
}
