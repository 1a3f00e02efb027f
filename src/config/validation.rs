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

use anyhow::{anyhow, Result};

use super::Config;

impl Config {
	/// Validate the configuration for common issues
	pub fn validate(&self) -> Result<()> {
		self.validate_models()?;
		self.validate_generation()?;
		self.validate_fill()?;
		Ok(())
	}

	pub fn validate_models(&self) -> Result<()> {
		let models = &self.models;
		for (name, value) in [
			("fast", &models.fast),
			("advanced", &models.advanced),
			("search_fallback", &models.search_fallback),
			("utility", &models.utility),
		] {
			if value.trim().is_empty() {
				return Err(anyhow!("Model for '{}' cannot be empty", name));
			}
		}

		if !models.supports_search(&models.search_fallback) {
			return Err(anyhow!(
				"Search fallback model '{}' must be listed in models.search_capable",
				models.search_fallback
			));
		}

		Ok(())
	}

	pub fn validate_generation(&self) -> Result<()> {
		let generation = &self.generation;
		if !(0.0..=2.0).contains(&generation.temperature) {
			return Err(anyhow!(
				"Temperature must be between 0.0 and 2.0, got {}",
				generation.temperature
			));
		}

		if generation.max_sources == 0 {
			return Err(anyhow!("max_sources must be at least 1"));
		}

		if generation.max_completion_tokens == 0 {
			return Err(anyhow!("max_completion_tokens must be at least 1"));
		}

		Ok(())
	}

	pub fn validate_fill(&self) -> Result<()> {
		if self.fill.batch_size == 0 {
			return Err(anyhow!("Fill batch size must be at least 1"));
		}

		if self.retry.max_retries > 10 {
			return Err(anyhow!(
				"max_retries too high: {}. Maximum allowed: 10",
				self.retry.max_retries
			));
		}

		Ok(())
	}
}
