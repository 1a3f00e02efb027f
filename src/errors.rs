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

// Error taxonomy shared by the generation pipeline and the HTTP surface

use thiserror::Error;

/// Every failure the generation pipeline can surface.
///
/// Unrecognized response shapes are deliberately absent: they degrade to the
/// "Not Found" sentinel instead of becoming errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CellError {
	/// Credential absent from configuration
	#[error("OpenAI API key not configured")]
	Configuration,

	/// Credential rejected by the backend
	#[error("Invalid API key")]
	Auth { detail: String },

	/// Rate limit or budget exhausted
	#[error("API quota exceeded")]
	Quota { detail: String },

	/// Malformed request, no network call was made
	#[error("{0}")]
	Validation(String),

	/// Any other backend failure
	#[error("Failed to generate content")]
	Backend { detail: String },
}

impl CellError {
	pub fn backend(detail: impl Into<String>) -> Self {
		Self::Backend {
			detail: detail.into(),
		}
	}

	/// Classify a backend failure from its HTTP status and message.
	pub fn from_backend_failure(status: Option<u16>, message: &str) -> Self {
		let lower = message.to_lowercase();
		if status == Some(401) || lower.contains("api key") || lower.contains("api_key") {
			return Self::Auth {
				detail: message.to_string(),
			};
		}
		if status == Some(429) || lower.contains("quota") {
			return Self::Quota {
				detail: message.to_string(),
			};
		}
		Self::backend(message)
	}

	/// HTTP status the serving layer answers with
	pub fn status_code(&self) -> u16 {
		match self {
			Self::Configuration => 500,
			Self::Auth { .. } => 401,
			Self::Quota { .. } => 429,
			Self::Validation(_) => 400,
			Self::Backend { .. } => 500,
		}
	}

	/// Terminal errors must never be retried.
	pub fn is_terminal(&self) -> bool {
		!matches!(self, Self::Backend { .. })
	}

	/// Credential problems are shared by every model, so model fallback is pointless.
	pub fn is_credential_error(&self) -> bool {
		matches!(
			self,
			Self::Configuration | Self::Auth { .. } | Self::Quota { .. }
		)
	}

	/// Backend detail for logs; never shown to users.
	pub fn detail(&self) -> &str {
		match self {
			Self::Auth { detail } | Self::Quota { detail } | Self::Backend { detail } => detail,
			Self::Validation(message) => message,
			Self::Configuration => "credential missing",
		}
	}
}
