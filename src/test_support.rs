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

// Scripted in-memory backend for tests

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::CellError;
use crate::providers::{
	Annotation, ChatRequest, CompletionOutput, ContentPart, ModelBackend, ModelReply, OutputItem,
	ReplyShape, TokenUsage, ToolOutput, ToolRequest,
};

type Handler<R> = Box<dyn Fn(&R) -> Result<ModelReply, CellError> + Send + Sync>;

/// Replies are served from per-shape queues, or computed by a handler when one is set.
pub struct ScriptedBackend {
	configured: bool,
	tool_script: Mutex<VecDeque<Result<ModelReply, CellError>>>,
	chat_script: Mutex<VecDeque<Result<ModelReply, CellError>>>,
	tool_handler: Option<Handler<ToolRequest>>,
	chat_handler: Option<Handler<ChatRequest>>,
	latency: Duration,
	in_flight: AtomicUsize,
	peak_in_flight: AtomicUsize,
	pub tool_calls: Mutex<Vec<ToolRequest>>,
	pub chat_calls: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
	pub fn new() -> Self {
		Self {
			configured: true,
			tool_script: Mutex::new(VecDeque::new()),
			chat_script: Mutex::new(VecDeque::new()),
			tool_handler: None,
			chat_handler: None,
			latency: Duration::ZERO,
			in_flight: AtomicUsize::new(0),
			peak_in_flight: AtomicUsize::new(0),
			tool_calls: Mutex::new(Vec::new()),
			chat_calls: Mutex::new(Vec::new()),
		}
	}

	pub fn unconfigured() -> Self {
		Self {
			configured: false,
			..Self::new()
		}
	}

	pub fn push_tool(self, reply: Result<ModelReply, CellError>) -> Self {
		self.tool_script.lock().push_back(reply);
		self
	}

	pub fn push_chat(self, reply: Result<ModelReply, CellError>) -> Self {
		self.chat_script.lock().push_back(reply);
		self
	}

	pub fn with_tool_handler<F>(mut self, handler: F) -> Self
	where
		F: Fn(&ToolRequest) -> Result<ModelReply, CellError> + Send + Sync + 'static,
	{
		self.tool_handler = Some(Box::new(handler));
		self
	}

	pub fn with_chat_handler<F>(mut self, handler: F) -> Self
	where
		F: Fn(&ChatRequest) -> Result<ModelReply, CellError> + Send + Sync + 'static,
	{
		self.chat_handler = Some(Box::new(handler));
		self
	}

	/// Every call sleeps this long before replying
	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = latency;
		self
	}

	/// Most calls that were ever outstanding at once
	pub fn peak_in_flight(&self) -> usize {
		self.peak_in_flight.load(Ordering::SeqCst)
	}

	async fn simulate_latency(&self) {
		let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
		if !self.latency.is_zero() {
			tokio::time::sleep(self.latency).await;
		}
		self.in_flight.fetch_sub(1, Ordering::SeqCst);
	}

	pub fn tool_call_count(&self) -> usize {
		self.tool_calls.lock().len()
	}

	pub fn chat_call_count(&self) -> usize {
		self.chat_calls.lock().len()
	}

	pub fn tool_models(&self) -> Vec<String> {
		self.tool_calls.lock().iter().map(|r| r.model.clone()).collect()
	}
}

#[async_trait::async_trait]
impl ModelBackend for ScriptedBackend {
	fn name(&self) -> &str {
		"scripted"
	}

	fn is_configured(&self) -> bool {
		self.configured
	}

	async fn tool_completion(&self, request: &ToolRequest) -> Result<ModelReply, CellError> {
		self.tool_calls.lock().push(request.clone());
		self.simulate_latency().await;
		if let Some(handler) = &self.tool_handler {
			return handler(request);
		}
		self.tool_script
			.lock()
			.pop_front()
			.unwrap_or_else(|| Err(CellError::backend("no scripted tool reply")))
	}

	async fn chat_completion(&self, request: &ChatRequest) -> Result<ModelReply, CellError> {
		self.chat_calls.lock().push(request.clone());
		self.simulate_latency().await;
		if let Some(handler) = &self.chat_handler {
			return handler(request);
		}
		self.chat_script
			.lock()
			.pop_front()
			.unwrap_or_else(|| Err(CellError::backend("no scripted chat reply")))
	}
}

fn usage(cost: f64) -> Option<TokenUsage> {
	Some(TokenUsage {
		input_tokens: 100,
		output_tokens: 10,
		total_tokens: 110,
		cost: Some(cost),
		request_time_ms: Some(1),
	})
}

/// Tool-augmented reply with one message and the given citation URLs
pub fn tool_reply(text: &str, citations: &[&str]) -> ModelReply {
	tool_reply_with_cost(text, citations, 0.0)
}

pub fn tool_reply_with_cost(text: &str, citations: &[&str], cost: f64) -> ModelReply {
	let annotations = citations
		.iter()
		.map(|url| Annotation::UrlCitation {
			url: url.to_string(),
			title: None,
		})
		.collect();
	ModelReply {
		shape: ReplyShape::ToolAugmented(ToolOutput {
			output: vec![
				OutputItem::WebSearchCall {
					status: Some("completed".to_string()),
				},
				OutputItem::Message {
					content: vec![ContentPart::OutputText {
						text: text.to_string(),
						annotations,
					}],
				},
			],
		}),
		usage: usage(cost),
	}
}

pub fn chat_reply(text: &str) -> ModelReply {
	chat_reply_with_cost(text, 0.0)
}

pub fn chat_reply_with_cost(text: &str, cost: f64) -> ModelReply {
	ModelReply {
		shape: ReplyShape::Completion(CompletionOutput {
			text: Some(text.to_string()),
		}),
		usage: usage(cost),
	}
}
