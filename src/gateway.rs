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

// Model invocation gateway: one generation attempt, normalized to a value and sources

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{Config, GenerationConfig, ModelsConfig};
use crate::errors::CellError;
use crate::prompt::{build_cell_prompt, build_citation_prompt, RowContext};
use crate::providers::{ChatRequest, ModelBackend, ModelReply, ToolRequest};
use crate::sanitizer::{dedupe_urls, sanitize, sole_url, NOT_FOUND};
use crate::{log_debug, log_info};

const COMPLETION_USER_MESSAGE: &str = "Please find the information requested for this row.";

/// Cost/capability tier a column generates with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
	#[default]
	#[serde(alias = "fast-tier")]
	Fast,
	#[serde(alias = "advanced-tier")]
	Advanced,
}

impl ModelTier {
	pub fn model<'a>(&self, models: &'a ModelsConfig) -> &'a str {
		match self {
			ModelTier::Fast => &models.fast,
			ModelTier::Advanced => &models.advanced,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			ModelTier::Fast => "fast",
			ModelTier::Advanced => "advanced",
		}
	}
}

impl std::fmt::Display for ModelTier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What the caller asked to generate with
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModelSelection {
	/// Nothing requested: the always tool-capable model
	#[default]
	Default,
	Tier(ModelTier),
	Model(String),
}

impl ModelSelection {
	/// Tier names map to tiers, anything else is taken as a raw model id
	pub fn parse(value: Option<&str>) -> Self {
		match value.map(str::trim).filter(|v| !v.is_empty()) {
			None => ModelSelection::Default,
			Some(v) => match v.to_lowercase().as_str() {
				"fast" | "fast-tier" => ModelSelection::Tier(ModelTier::Fast),
				"advanced" | "advanced-tier" => ModelSelection::Tier(ModelTier::Advanced),
				_ => ModelSelection::Model(v.to_string()),
			},
		}
	}

	pub fn resolve(&self, models: &ModelsConfig) -> String {
		match self {
			ModelSelection::Default => models.search_fallback.clone(),
			ModelSelection::Tier(tier) => tier.model(models).to_string(),
			ModelSelection::Model(model) => model.clone(),
		}
	}
}

/// One cell generation, alive for a single invocation
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
	pub prompt: String,
	pub context: RowContext,
	pub column_key: String,
	pub row_data: BTreeMap<String, String>,
	pub model: ModelSelection,
}

/// Which call shape produced the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPath {
	ToolAugmented,
	FallbackModel,
	Completion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
	pub value: String,
	pub sources: Vec<String>,
	/// Source description stored on the cell
	pub source: String,
	pub model: String,
	pub path: CallPath,
	pub cost: f64,
}

/// Wire shape of a generation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
	pub value: String,
	pub source: String,
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl GenerationResult {
	pub fn failure(error: impl Into<String>) -> Self {
		Self {
			value: String::new(),
			source: String::new(),
			success: false,
			error: Some(error.into()),
		}
	}
}

impl From<&GenerationOutcome> for GenerationResult {
	fn from(outcome: &GenerationOutcome) -> Self {
		Self {
			value: outcome.value.clone(),
			source: outcome.source.clone(),
			success: true,
			error: None,
		}
	}
}

pub struct Gateway {
	backend: Arc<dyn ModelBackend>,
	models: ModelsConfig,
	generation: GenerationConfig,
}

impl Gateway {
	pub fn new(backend: Arc<dyn ModelBackend>, config: &Config) -> Self {
		Self {
			backend,
			models: config.models.clone(),
			generation: config.generation.clone(),
		}
	}

	pub fn backend(&self) -> &Arc<dyn ModelBackend> {
		&self.backend
	}

	pub fn models(&self) -> &ModelsConfig {
		&self.models
	}

	/// Execute one attempt: tool-augmented call, fallback model, then plain completion
	pub async fn generate(
		&self,
		request: &GenerationRequest,
	) -> Result<GenerationOutcome, CellError> {
		if !self.backend.is_configured() {
			return Err(CellError::Configuration);
		}
		if request.prompt.trim().is_empty() || request.column_key.trim().is_empty() {
			return Err(CellError::Validation(
				"Missing required fields: prompt and columnKey".to_string(),
			));
		}

		let model = request.model.resolve(&self.models);

		if self.models.supports_search(&model) {
			let prompt = build_cell_prompt(&request.prompt, &request.context, true)?;

			match self.tool_call(&model, &prompt).await {
				Ok(reply) => {
					return Ok(self
						.finish_tool_reply(request, &prompt, &model, reply, CallPath::ToolAugmented)
						.await);
				}
				Err(e) if e.is_credential_error() => return Err(e),
				Err(e) => {
					log_info!(
						"Web search call on {} failed ({}), trying {}",
						model,
						e.detail(),
						self.models.search_fallback
					);
				}
			}

			let fallback = self.models.search_fallback.clone();
			if fallback != model {
				match self.tool_call(&fallback, &prompt).await {
					Ok(reply) => {
						return Ok(self
							.finish_tool_reply(
								request,
								&prompt,
								&fallback,
								reply,
								CallPath::FallbackModel,
							)
							.await);
					}
					Err(e) if e.is_credential_error() => return Err(e),
					Err(e) => {
						log_info!(
							"Web search unavailable ({}), using plain completion",
							e.detail()
						);
					}
				}
			}
		}

		let prompt = build_cell_prompt(&request.prompt, &request.context, false)?;
		let reply = self
			.backend
			.chat_completion(&ChatRequest {
				model: model.clone(),
				system: Some(prompt),
				user: COMPLETION_USER_MESSAGE.to_string(),
				temperature: self.generation.temperature,
				max_tokens: self.generation.max_completion_tokens,
			})
			.await?;

		let cost = reply.cost();
		let (value, sources) = self.normalize(&reply);
		let source = describe_sources(&sources, || {
			completion_fallback_description(&request.context, &model)
		});

		Ok(GenerationOutcome {
			value,
			sources,
			source,
			model,
			path: CallPath::Completion,
			cost,
		})
	}

	async fn tool_call(&self, model: &str, prompt: &str) -> Result<ModelReply, CellError> {
		self.backend
			.tool_completion(&ToolRequest {
				model: model.to_string(),
				input: prompt.to_string(),
				temperature: self.generation.temperature,
			})
			.await
	}

	async fn finish_tool_reply(
		&self,
		request: &GenerationRequest,
		prompt: &str,
		model: &str,
		reply: ModelReply,
		path: CallPath,
	) -> GenerationOutcome {
		let mut cost = reply.cost();
		let (value, mut sources) = self.normalize(&reply);

		if sources.is_empty() && value != NOT_FOUND {
			let (enriched, enrichment_cost) = self.enrich_sources(prompt, &value, model).await;
			cost += enrichment_cost;
			if let Some(enriched) = enriched {
				sources = enriched;
			}
		}

		let source = describe_sources(&sources, || {
			tool_fallback_description(&request.context)
		});

		GenerationOutcome {
			value,
			sources,
			source,
			model: model.to_string(),
			path,
			cost,
		}
	}

	/// Clean value plus capped sources, citation annotations first
	fn normalize(&self, reply: &ModelReply) -> (String, Vec<String>) {
		let raw = match reply.shape.text().map(str::trim) {
			Some(raw) if !raw.is_empty() => raw,
			_ => {
				log_debug!("Reply carried no usable text");
				return (NOT_FOUND.to_string(), Vec::new());
			}
		};

		let sanitized = sanitize(raw);
		let value = if sanitized.is_not_found() {
			sole_url(raw).unwrap_or_else(|| NOT_FOUND.to_string())
		} else {
			sanitized.clean_text
		};

		let citations = reply.shape.citations().into_iter().map(str::to_string);
		let mut sources = dedupe_urls(citations.chain(sanitized.extracted_urls));
		sources.truncate(self.generation.max_sources);
		(value, sources)
	}

	/// Best effort: ask for an inline citation when the search answer had none
	async fn enrich_sources(
		&self,
		prompt: &str,
		answer: &str,
		model: &str,
	) -> (Option<Vec<String>>, f64) {
		let reply = self
			.backend
			.chat_completion(&ChatRequest {
				model: model.to_string(),
				system: None,
				user: build_citation_prompt(prompt, answer),
				temperature: self.generation.temperature,
				max_tokens: self.generation.max_completion_tokens,
			})
			.await;

		match reply {
			Ok(reply) => {
				let text = reply.shape.text().unwrap_or_default();
				let mut urls = sanitize(text).extracted_urls;
				urls.truncate(self.generation.max_sources);
				if urls.is_empty() {
					log_debug!("Citation follow-up supplied no sources");
					(None, reply.cost())
				} else {
					(Some(urls), reply.cost())
				}
			}
			Err(e) => {
				log_debug!("Citation follow-up failed: {}", e.detail());
				(None, 0.0)
			}
		}
	}
}

fn describe_sources<F>(sources: &[String], fallback: F) -> String
where
	F: FnOnce() -> String,
{
	if sources.is_empty() {
		fallback()
	} else {
		sources.join(", ")
	}
}

fn context_keys(context: &RowContext) -> String {
	context.keys().cloned().collect::<Vec<_>>().join(", ")
}

fn tool_fallback_description(context: &RowContext) -> String {
	if context.is_empty() {
		"Web search results".to_string()
	} else {
		format!("Company context: {}", context_keys(context))
	}
}

fn completion_fallback_description(context: &RowContext, model: &str) -> String {
	if context.is_empty() {
		format!("AI research using {}", model)
	} else {
		format!("AI research based on company context: {}", context_keys(context))
	}
}
