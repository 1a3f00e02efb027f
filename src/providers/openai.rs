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

// OpenAI provider implementation

use super::{
	ChatRequest, CompletionOutput, ModelBackend, ModelReply, ProviderExchange, ReplyShape,
	ToolOutput, ToolRequest, TokenUsage,
};
use crate::config::Config;
use crate::errors::CellError;
use crate::log_debug;
use reqwest::Client;
use std::time::Duration;

/// OpenAI pricing constants (per 1M tokens in USD)
const PRICING: &[(&str, f64, f64)] = &[
	// Model, Input price per 1M tokens, Output price per 1M tokens
	("gpt-4o", 2.50, 10.00),
	("gpt-4o-mini", 0.15, 0.60),
	("gpt-4o-2024-11-20", 2.50, 10.00),
	("gpt-4o-2024-08-06", 2.50, 10.00),
	("chatgpt-4o-latest", 2.50, 10.00),
	("gpt-4.1", 2.00, 8.00),
	("gpt-4.1-mini", 0.40, 1.60),
	("gpt-4.1-nano", 0.10, 0.40),
	("o3", 2.00, 8.00),
	("o3-mini", 1.10, 4.40),
	("o4-mini", 1.10, 4.40),
	("o1", 15.00, 60.00),
	("o1-mini", 3.00, 12.00),
	("gpt-4-turbo", 10.00, 30.00),
	("gpt-4", 30.00, 60.00),
	("gpt-3.5-turbo", 0.50, 1.50),
];

/// Calculate cost using the longest matching model prefix
pub fn calculate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> Option<f64> {
	PRICING
		.iter()
		.filter(|(pricing_model, _, _)| model.starts_with(pricing_model))
		.max_by_key(|(pricing_model, _, _)| pricing_model.len())
		.map(|(_, input_price, output_price)| {
			let input_cost = (input_tokens as f64 / 1_000_000.0) * input_price;
			let output_cost = (output_tokens as f64 / 1_000_000.0) * output_price;
			input_cost + output_cost
		})
}

/// Check if a model supports the temperature parameter
/// O-series reasoning models don't support temperature
fn supports_temperature(model: &str) -> bool {
	!is_reasoning_model(model)
}

fn is_reasoning_model(model: &str) -> bool {
	model.starts_with("o1")
		|| model.starts_with("o2")
		|| model.starts_with("o3")
		|| model.starts_with("o4")
}

/// OpenAI provider implementation
pub struct OpenAiProvider {
	client: Client,
	api_key: Option<String>,
	base_url: String,
}

impl OpenAiProvider {
	pub fn new(api_key: Option<String>, base_url: &str, timeout: Option<Duration>) -> reqwest::Result<Self> {
		let mut builder = Client::builder();
		if let Some(timeout) = timeout {
			builder = builder.timeout(timeout);
		}
		Ok(Self {
			client: builder.build()?,
			api_key,
			base_url: base_url.trim_end_matches('/').to_string(),
		})
	}

	/// Credential and endpoint are resolved once, here
	pub fn from_config(config: &Config) -> anyhow::Result<Self> {
		let timeout = match config.generation.request_timeout_seconds {
			0 => None,
			seconds => Some(Duration::from_secs(seconds)),
		};
		Ok(Self::new(
			config.openai_api_key().map(str::to_string),
			&config.providers.openai.base_url,
			timeout,
		)?)
	}

	async fn post_json(
		&self,
		endpoint: &str,
		request_body: &serde_json::Value,
	) -> Result<(serde_json::Value, u64), CellError> {
		let api_key = self.api_key.as_deref().ok_or(CellError::Configuration)?;
		let url = format!("{}/{}", self.base_url, endpoint);

		// Track API request time
		let api_start = std::time::Instant::now();

		let response = self
			.client
			.post(&url)
			.bearer_auth(api_key)
			.json(request_body)
			.send()
			.await
			.map_err(|e| {
				if e.is_timeout() {
					CellError::backend(format!("Request to {} timed out: {}", endpoint, e))
				} else {
					CellError::backend(format!("Request to {} failed: {}", endpoint, e))
				}
			})?;

		let status = response.status();
		let response_text = response
			.text()
			.await
			.map_err(|e| CellError::backend(format!("Failed to read response body: {}", e)))?;
		let api_time_ms = api_start.elapsed().as_millis() as u64;

		let response_json: serde_json::Value = match serde_json::from_str(&response_text) {
			Ok(json) => json,
			Err(e) => {
				if !status.is_success() {
					return Err(CellError::from_backend_failure(
						Some(status.as_u16()),
						&format!("OpenAI API error: HTTP {} | Raw response: {}", status, response_text),
					));
				}
				return Err(CellError::backend(format!(
					"Failed to parse response JSON: {}. Response: {}",
					e, response_text
				)));
			}
		};

		// Handle error responses, including errors in a 200 body
		if !status.is_success() || response_json.get("error").is_some_and(|e| !e.is_null()) {
			let mut error_details = vec![format!("HTTP {}", status)];

			if let Some(error_obj) = response_json.get("error") {
				if let Some(msg) = error_obj.get("message").and_then(|m| m.as_str()) {
					error_details.push(format!("Message: {}", msg));
				}
				if let Some(code) = error_obj.get("code").and_then(|c| c.as_str()) {
					error_details.push(format!("Code: {}", code));
				}
				if let Some(type_) = error_obj.get("type").and_then(|t| t.as_str()) {
					error_details.push(format!("Type: {}", type_));
				}
			}

			if error_details.len() == 1 {
				error_details.push(format!("Raw response: {}", response_text));
			}

			let full_error = format!("OpenAI API error: {}", error_details.join(" | "));
			let _ = crate::logger::log_error(self.name(), &full_error);
			return Err(CellError::from_backend_failure(
				Some(status.as_u16()),
				&full_error,
			));
		}

		Ok((response_json, api_time_ms))
	}

	fn record(
		&self,
		request_body: serde_json::Value,
		response_json: serde_json::Value,
		usage: Option<TokenUsage>,
	) {
		let exchange = ProviderExchange::new(request_body, response_json, usage, self.name());
		crate::logger::log_raw_exchange(&exchange);
	}
}

fn parse_usage(
	response_json: &serde_json::Value,
	model: &str,
	input_key: &str,
	output_key: &str,
	api_time_ms: u64,
) -> Option<TokenUsage> {
	let usage = response_json.get("usage")?;
	let input_tokens = usage.get(input_key).and_then(|v| v.as_u64()).unwrap_or(0);
	let output_tokens = usage.get(output_key).and_then(|v| v.as_u64()).unwrap_or(0);
	let total_tokens = usage
		.get("total_tokens")
		.and_then(|v| v.as_u64())
		.unwrap_or(input_tokens + output_tokens);

	Some(TokenUsage {
		input_tokens,
		output_tokens,
		total_tokens,
		cost: calculate_cost(model, input_tokens, output_tokens),
		request_time_ms: Some(api_time_ms),
	})
}

/// Responses API body with the web search tool forced on
pub fn build_tool_request_body(request: &ToolRequest) -> serde_json::Value {
	let mut request_body = serde_json::json!({
		"model": request.model,
		"input": request.input,
		"tools": [{"type": "web_search_preview"}],
		"tool_choice": {"type": "web_search_preview"},
	});
	if supports_temperature(&request.model) {
		request_body["temperature"] = serde_json::json!(request.temperature);
	}
	request_body
}

/// Chat Completions body
pub fn build_chat_request_body(request: &ChatRequest) -> serde_json::Value {
	let mut messages = Vec::new();
	if let Some(system) = &request.system {
		messages.push(serde_json::json!({"role": "system", "content": system}));
	}
	messages.push(serde_json::json!({"role": "user", "content": request.user}));

	let mut request_body = serde_json::json!({
		"model": request.model,
		"messages": messages,
	});

	if is_reasoning_model(&request.model) {
		request_body["max_completion_tokens"] = serde_json::json!(request.max_tokens);
	} else {
		request_body["max_tokens"] = serde_json::json!(request.max_tokens);
	}
	if supports_temperature(&request.model) {
		request_body["temperature"] = serde_json::json!(request.temperature);
	}
	request_body
}

/// Unrecognized shapes become an empty output rather than an error
pub fn parse_tool_output(response_json: &serde_json::Value) -> ToolOutput {
	match serde_json::from_value::<ToolOutput>(response_json.clone()) {
		Ok(output) => output,
		Err(e) => {
			log_debug!("Unrecognized tool output shape: {}", e);
			ToolOutput::default()
		}
	}
}

pub fn parse_completion_output(response_json: &serde_json::Value) -> CompletionOutput {
	let text = response_json
		.get("choices")
		.and_then(|choices| choices.get(0))
		.and_then(|choice| choice.get("message"))
		.and_then(|message| message.get("content"))
		.and_then(|content| content.as_str())
		.map(|s| s.to_string());

	if text.is_none() {
		log_debug!("Completion response carried no message content");
	}
	CompletionOutput { text }
}

#[async_trait::async_trait]
impl ModelBackend for OpenAiProvider {
	fn name(&self) -> &str {
		"openai"
	}

	fn is_configured(&self) -> bool {
		self.api_key.is_some()
	}

	async fn tool_completion(&self, request: &ToolRequest) -> Result<ModelReply, CellError> {
		let request_body = build_tool_request_body(request);
		let (response_json, api_time_ms) = self.post_json("responses", &request_body).await?;

		let usage = parse_usage(
			&response_json,
			&request.model,
			"input_tokens",
			"output_tokens",
			api_time_ms,
		);
		let output = parse_tool_output(&response_json);
		log_debug!(
			"{} returned {} output items ({} web searches) in {}ms",
			request.model,
			output.output.len(),
			output.search_calls(),
			api_time_ms
		);
		self.record(request_body, response_json, usage.clone());

		Ok(ModelReply {
			shape: ReplyShape::ToolAugmented(output),
			usage,
		})
	}

	async fn chat_completion(&self, request: &ChatRequest) -> Result<ModelReply, CellError> {
		let request_body = build_chat_request_body(request);
		let (response_json, api_time_ms) =
			self.post_json("chat/completions", &request_body).await?;

		let usage = parse_usage(
			&response_json,
			&request.model,
			"prompt_tokens",
			"completion_tokens",
			api_time_ms,
		);

		if let Some(reason) = response_json
			.get("choices")
			.and_then(|choices| choices.get(0))
			.and_then(|choice| choice.get("finish_reason"))
			.and_then(|fr| fr.as_str())
		{
			log_debug!("Finish reason: {}", reason);
		}

		let output = parse_completion_output(&response_json);
		self.record(request_body, response_json, usage.clone());

		Ok(ModelReply {
			shape: ReplyShape::Completion(output),
			usage,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cost_uses_longest_prefix() {
		let mini = calculate_cost("gpt-4o-mini", 1_000_000, 1_000_000).unwrap();
		assert!((mini - 0.75).abs() < 1e-9);

		let full = calculate_cost("gpt-4o", 1_000_000, 0).unwrap();
		assert!((full - 2.50).abs() < 1e-9);

		assert!(calculate_cost("unknown-model", 10, 10).is_none());
	}

	#[test]
	fn test_tool_request_body() {
		let body = build_tool_request_body(&ToolRequest {
			model: "gpt-4o".to_string(),
			input: "find it".to_string(),
			temperature: 0.1,
		});
		assert_eq!(body["tools"][0]["type"], "web_search_preview");
		assert_eq!(body["tool_choice"]["type"], "web_search_preview");
		assert!(body.get("temperature").is_some());
	}

	#[test]
	fn test_reasoning_models_skip_temperature() {
		let body = build_chat_request_body(&ChatRequest {
			model: "o3".to_string(),
			system: None,
			user: "hi".to_string(),
			temperature: 0.1,
			max_tokens: 10,
		});
		assert!(body.get("temperature").is_none());
		assert_eq!(body["max_completion_tokens"], 10);
		assert_eq!(body["messages"].as_array().unwrap().len(), 1);

		let body = build_chat_request_body(&ChatRequest {
			model: "gpt-3.5-turbo".to_string(),
			system: Some("sys".to_string()),
			user: "hi".to_string(),
			temperature: 0.0,
			max_tokens: 10,
		});
		assert_eq!(body["max_tokens"], 10);
		assert_eq!(body["messages"][0]["role"], "system");
	}

	#[test]
	fn test_parse_completion_output() {
		let output = parse_completion_output(&serde_json::json!({
			"choices": [{"message": {"role": "assistant", "content": "YES"}, "finish_reason": "stop"}]
		}));
		assert_eq!(output.text.as_deref(), Some("YES"));

		let output = parse_completion_output(&serde_json::json!({"choices": []}));
		assert!(output.text.is_none());
	}

	#[test]
	fn test_parse_tool_output_anomaly() {
		let output = parse_tool_output(&serde_json::json!({"output": "not a list"}));
		assert!(output.output.is_empty());
	}

	#[test]
	fn test_usage_cost() {
		let usage = parse_usage(
			&serde_json::json!({"usage": {"input_tokens": 1000, "output_tokens": 500}}),
			"gpt-4o-mini",
			"input_tokens",
			"output_tokens",
			12,
		)
		.unwrap();
		assert_eq!(usage.total_tokens, 1500);
		assert!(usage.cost.unwrap() > 0.0);
		assert_eq!(usage.request_time_ms, Some(12));
	}

	#[tokio::test]
	async fn test_missing_credential_fails_without_network() {
		let provider = OpenAiProvider::new(None, "http://127.0.0.1:9", None).unwrap();
		assert!(!provider.is_configured());
		let result = provider
			.chat_completion(&ChatRequest {
				model: "gpt-4o".to_string(),
				system: None,
				user: "hi".to_string(),
				temperature: 0.1,
				max_tokens: 10,
			})
			.await;
		assert_eq!(result.unwrap_err(), CellError::Configuration);
	}
}
