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

// Backend abstraction: the injectable client the gateway talks to

use crate::config::Config;
use crate::errors::CellError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod openai;

pub use openai::OpenAiProvider;

/// Common token usage structure
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TokenUsage {
	pub input_tokens: u64,
	pub output_tokens: u64,
	pub total_tokens: u64,
	#[serde(default)]
	pub cost: Option<f64>, // Pre-calculated cost in USD, None for unknown models
	#[serde(default)]
	pub request_time_ms: Option<u64>,
}

/// Common exchange record for logging
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProviderExchange {
	pub request: serde_json::Value,
	pub response: serde_json::Value,
	pub timestamp: u64,
	pub usage: Option<TokenUsage>,
	pub provider: String,
}

impl ProviderExchange {
	pub fn new(
		request: serde_json::Value,
		response: serde_json::Value,
		usage: Option<TokenUsage>,
		provider: &str,
	) -> Self {
		Self {
			request,
			response,
			timestamp: SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.unwrap_or_default()
				.as_secs(),
			usage,
			provider: provider.to_string(),
		}
	}
}

/// Tool-augmented call: the model may (and is told to) search the web
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
	pub model: String,
	pub input: String,
	pub temperature: f32,
}

/// Plain completion call without tools
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
	pub model: String,
	pub system: Option<String>,
	pub user: String,
	pub temperature: f32,
	pub max_tokens: u32,
}

/// Citation metadata attached to output text
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
	UrlCitation {
		url: String,
		#[serde(default)]
		title: Option<String>,
	},
	#[serde(other)]
	Unknown,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
	OutputText {
		#[serde(default)]
		text: String,
		#[serde(default)]
		annotations: Vec<Annotation>,
	},
	Refusal {
		#[serde(default)]
		refusal: String,
	},
	#[serde(other)]
	Unknown,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
	Message {
		#[serde(default)]
		content: Vec<ContentPart>,
	},
	WebSearchCall {
		#[serde(default)]
		status: Option<String>,
	},
	#[serde(other)]
	Unknown,
}

/// Structured output of a tool-augmented call
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ToolOutput {
	#[serde(default)]
	pub output: Vec<OutputItem>,
}

impl ToolOutput {
	/// Text of the first output_text part of the last message, with its citation URLs
	pub fn final_text(&self) -> Option<(&str, Vec<&str>)> {
		let content = self.output.iter().rev().find_map(|item| match item {
			OutputItem::Message { content } => Some(content),
			OutputItem::WebSearchCall { .. } | OutputItem::Unknown => None,
		})?;

		content.iter().find_map(|part| match part {
			ContentPart::OutputText { text, annotations } => {
				let citations = annotations
					.iter()
					.filter_map(|annotation| match annotation {
						Annotation::UrlCitation { url, .. } => Some(url.as_str()),
						Annotation::Unknown => None,
					})
					.collect();
				Some((text.as_str(), citations))
			}
			ContentPart::Refusal { .. } | ContentPart::Unknown => None,
		})
	}

	pub fn search_calls(&self) -> usize {
		self.output
			.iter()
			.filter(|item| matches!(item, OutputItem::WebSearchCall { .. }))
			.count()
	}
}

/// Output of a plain completion call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOutput {
	pub text: Option<String>,
}

/// The two response shapes a backend can return
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyShape {
	ToolAugmented(ToolOutput),
	Completion(CompletionOutput),
}

impl ReplyShape {
	/// Answer text, if the shape carried any
	pub fn text(&self) -> Option<&str> {
		match self {
			ReplyShape::ToolAugmented(output) => output.final_text().map(|(text, _)| text),
			ReplyShape::Completion(output) => output.text.as_deref(),
		}
	}

	/// Backend-native citation URLs (never present on plain completions)
	pub fn citations(&self) -> Vec<&str> {
		match self {
			ReplyShape::ToolAugmented(output) => output
				.final_text()
				.map(|(_, citations)| citations)
				.unwrap_or_default(),
			ReplyShape::Completion(_) => Vec::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
	pub shape: ReplyShape,
	pub usage: Option<TokenUsage>,
}

impl ModelReply {
	pub fn cost(&self) -> f64 {
		self.usage.as_ref().and_then(|u| u.cost).unwrap_or(0.0)
	}
}

/// Trait every model backend implements
#[async_trait::async_trait]
pub trait ModelBackend: Send + Sync {
	/// Get the provider name (e.g., "openai")
	fn name(&self) -> &str;

	/// Whether a credential was resolved at construction
	fn is_configured(&self) -> bool;

	/// Send a tool-augmented request with web search enabled
	async fn tool_completion(&self, request: &ToolRequest) -> Result<ModelReply, CellError>;

	/// Send a plain chat completion request
	async fn chat_completion(&self, request: &ChatRequest) -> Result<ModelReply, CellError>;
}

/// Build the backend described by the configuration
pub fn create_backend(config: &Config) -> anyhow::Result<Arc<dyn ModelBackend>> {
	Ok(Arc::new(OpenAiProvider::from_config(config)?))
}
