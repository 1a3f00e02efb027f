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

use serde::{Deserialize, Serialize};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

fn default_openai_base_url() -> String {
	"https://api.openai.com/v1".to_string()
}

// Provider configurations - ONLY contain credentials and endpoint settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderConfig {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub api_key: Option<String>,
	#[serde(default = "default_openai_base_url")]
	pub base_url: String,
}

impl Default for ProviderConfig {
	fn default() -> Self {
		Self {
			api_key: None,
			base_url: default_openai_base_url(),
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ProvidersConfig {
	#[serde(default)]
	pub openai: ProviderConfig,
}
