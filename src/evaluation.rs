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

// A/B prompt evaluation across the fast and advanced tiers

use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::compare::ResultComparator;
use crate::config::Config;
use crate::gateway::{Gateway, GenerationRequest, ModelSelection, ModelTier};
use crate::retry::RetryPolicy;
use crate::sanitizer::NOT_FOUND;
use crate::sheet::{Sheet, SheetError};
use crate::{log_debug, log_info};

const TIERS: [ModelTier; 2] = [ModelTier::Fast, ModelTier::Advanced];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierOutput {
	pub value: String,
	pub cost: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl TierOutput {
	pub fn is_found(&self) -> bool {
		self.error.is_none() && !self.value.trim().is_empty() && self.value != NOT_FOUND
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowEvaluation {
	pub row: usize,
	pub fast: TierOutput,
	pub advanced: TierOutput,
	pub agrees: bool,
	pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptMetrics {
	pub prompt: String,
	pub rows: Vec<RowEvaluation>,
	/// Share of rows where the fast tier agrees with the advanced tier
	pub accuracy: f64,
	/// Share of outputs, across both tiers, that found an answer
	pub found_rate: f64,
	pub fast_cost: f64,
	pub advanced_cost: f64,
}

impl PromptMetrics {
	fn from_rows(prompt: &str, rows: Vec<RowEvaluation>) -> Self {
		let agreeing = rows.iter().filter(|r| r.agrees).count();
		let found = rows
			.iter()
			.map(|r| usize::from(r.fast.is_found()) + usize::from(r.advanced.is_found()))
			.sum();

		Self {
			prompt: prompt.to_string(),
			accuracy: percentage(agreeing, rows.len()),
			found_rate: percentage(found, rows.len() * 2),
			fast_cost: rows.iter().map(|r| r.fast.cost).sum(),
			advanced_cost: rows.iter().map(|r| r.advanced.cost).sum(),
			rows,
		}
	}

	pub fn total_cost(&self) -> f64 {
		self.fast_cost + self.advanced_cost
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PromptChoice {
	A,
	B,
}

/// Transient result of one A/B run; nothing is stored
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRun {
	pub column_id: String,
	pub prompt_a: PromptMetrics,
	pub prompt_b: PromptMetrics,
	/// Share of (row, prompt) pairs where the tiers disagree
	pub disagreement: f64,
	pub recommended: PromptChoice,
}

impl EvaluationRun {
	pub fn recommended_metrics(&self) -> &PromptMetrics {
		match self.recommended {
			PromptChoice::A => &self.prompt_a,
			PromptChoice::B => &self.prompt_b,
		}
	}
}

fn percentage(part: usize, whole: usize) -> f64 {
	if whole == 0 {
		0.0
	} else {
		part as f64 / whole as f64 * 100.0
	}
}

/// Higher accuracy wins, then lower cost, then A
fn recommend(a: &PromptMetrics, b: &PromptMetrics) -> PromptChoice {
	if b.accuracy > a.accuracy || (b.accuracy == a.accuracy && b.total_cost() < a.total_cost()) {
		PromptChoice::B
	} else {
		PromptChoice::A
	}
}

pub struct Evaluator {
	gateway: Arc<Gateway>,
	comparator: ResultComparator,
	retry: RetryPolicy,
}

impl Evaluator {
	pub fn new(gateway: Arc<Gateway>, config: &Config) -> Self {
		let comparator = ResultComparator::new(gateway.backend().clone(), config);
		Self {
			gateway,
			comparator,
			retry: RetryPolicy::from_config(&config.retry),
		}
	}

	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	pub async fn run(
		&self,
		sheet: &Sheet,
		column_id: &str,
		prompt_a: &str,
		prompt_b: &str,
	) -> Result<EvaluationRun, SheetError> {
		if sheet.column(column_id).is_none() {
			return Err(SheetError::UnknownColumn(column_id.to_string()));
		}
		for prompt in [prompt_a, prompt_b] {
			if prompt.trim().is_empty() {
				return Err(SheetError::MissingPrompt(column_id.to_string()));
			}
		}

		log_info!(
			"Evaluating two prompts over {} rows of '{}'",
			sheet.rows.len(),
			column_id
		);

		let mut rows_a = Vec::with_capacity(sheet.rows.len());
		let mut rows_b = Vec::with_capacity(sheet.rows.len());
		for index in 0..sheet.rows.len() {
			rows_a.push(self.evaluate_row(sheet, index, column_id, prompt_a).await);
			rows_b.push(self.evaluate_row(sheet, index, column_id, prompt_b).await);
		}

		let prompt_a = PromptMetrics::from_rows(prompt_a, rows_a);
		let prompt_b = PromptMetrics::from_rows(prompt_b, rows_b);

		let pairs = prompt_a.rows.len() + prompt_b.rows.len();
		let disagreeing = prompt_a
			.rows
			.iter()
			.chain(prompt_b.rows.iter())
			.filter(|r| !r.agrees)
			.count();

		let recommended = recommend(&prompt_a, &prompt_b);
		Ok(EvaluationRun {
			column_id: column_id.to_string(),
			disagreement: percentage(disagreeing, pairs),
			recommended,
			prompt_a,
			prompt_b,
		})
	}

	async fn evaluate_row(
		&self,
		sheet: &Sheet,
		index: usize,
		column_id: &str,
		prompt: &str,
	) -> RowEvaluation {
		let row = &sheet.rows[index];
		let context = sheet.row_context(row, column_id);
		let row_data: BTreeMap<String, String> = row
			.iter()
			.map(|(id, cell)| (id.clone(), cell.value.clone()))
			.collect();

		let requests: Vec<GenerationRequest> = TIERS
			.iter()
			.map(|&tier| GenerationRequest {
				prompt: prompt.to_string(),
				context: context.clone(),
				column_key: column_id.to_string(),
				row_data: row_data.clone(),
				model: ModelSelection::Tier(tier),
			})
			.collect();

		let mut outputs = join_all(requests.iter().map(|request| self.generate(request))).await;
		let advanced = outputs.pop().unwrap_or_default();
		let fast = outputs.pop().unwrap_or_default();

		let (agrees, confidence) = if fast.error.is_some() || advanced.error.is_some() {
			(false, 0)
		} else {
			match self.comparator.compare(&fast.value, &advanced.value).await {
				Ok(comparison) => (comparison.matched, comparison.confidence),
				Err(e) => {
					log_debug!("Comparison for row {} failed: {}", index, e.detail());
					(false, 0)
				}
			}
		};

		RowEvaluation {
			row: index,
			fast,
			advanced,
			agrees,
			confidence,
		}
	}

	async fn generate(&self, request: &GenerationRequest) -> TierOutput {
		let gateway = self.gateway.as_ref();
		match self.retry.run(move |_| gateway.generate(request)).await {
			Ok(outcome) => TierOutput {
				value: outcome.value,
				cost: outcome.cost,
				error: None,
			},
			Err(failure) => TierOutput {
				error: Some(failure.to_string()),
				..Default::default()
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::errors::CellError;
	use crate::sheet::{Column, InMemorySheet, SheetRepository};
	use crate::test_support::{chat_reply, chat_reply_with_cost, tool_reply_with_cost, ScriptedBackend};
	use std::time::Duration;

	fn company_url(text: &str) -> &'static str {
		if text.contains("Acme") {
			"https://acme.com"
		} else {
			"https://globex.com"
		}
	}

	fn result_line<'a>(text: &'a str, label: &str) -> &'a str {
		text.lines()
			.find_map(|line| line.strip_prefix(label))
			.unwrap_or_default()
	}

	fn backend() -> ScriptedBackend {
		ScriptedBackend::new()
			// Fast tier: the homepage prompt misses Globex
			.with_tool_handler(|request| {
				if request.input.contains("TASK: Find the homepage") && request.input.contains("Globex") {
					Ok(tool_reply_with_cost("Not Found", &[], 0.001))
				} else {
					Ok(tool_reply_with_cost(company_url(&request.input), &[], 0.001))
				}
			})
			.with_chat_handler(|request| {
				if request.model == "gpt-3.5-turbo" {
					let same = result_line(&request.user, "Result 1: ")
						== result_line(&request.user, "Result 2: ");
					return Ok(chat_reply(if same { "YES" } else { "NO" }));
				}
				let system = request.system.clone().unwrap_or_default();
				Ok(chat_reply_with_cost(company_url(&system), 0.01))
			})
	}

	fn sheet() -> Sheet {
		let sheet = InMemorySheet::new(Sheet::new(vec![
			Column::new("company", "Company Name"),
			Column::new("website", "Website"),
		]));
		for company in ["Acme Corp", "Globex"] {
			let row = sheet.add_row();
			sheet.update_cell(row, "company", company).unwrap();
		}
		sheet.snapshot()
	}

	fn build(backend: ScriptedBackend) -> (Evaluator, Arc<ScriptedBackend>) {
		let backend = Arc::new(backend);
		let config = Config::default();
		let gateway = Arc::new(Gateway::new(backend.clone(), &config));
		let evaluator = Evaluator::new(gateway, &config).with_retry(RetryPolicy {
			max_retries: 0,
			base_delay: Duration::ZERO,
		});
		(evaluator, backend)
	}

	#[tokio::test]
	async fn test_metrics_and_recommendation() {
		let (evaluator, backend) = build(backend());
		let run = evaluator
			.run(&sheet(), "website", "Find the website", "Find the homepage")
			.await
			.unwrap();

		assert_eq!(run.prompt_a.accuracy, 100.0);
		assert_eq!(run.prompt_b.accuracy, 50.0);
		assert_eq!(run.prompt_a.found_rate, 100.0);
		assert_eq!(run.prompt_b.found_rate, 75.0);
		assert_eq!(run.disagreement, 25.0);
		assert_eq!(run.recommended, PromptChoice::A);
		assert_eq!(run.recommended_metrics().prompt, "Find the website");

		assert!((run.prompt_a.fast_cost - 0.002).abs() < 1e-9);
		assert!((run.prompt_a.advanced_cost - 0.02).abs() < 1e-9);

		// Two rows x two prompts on each tier
		assert_eq!(backend.tool_call_count(), 4);
		assert!(backend
			.tool_calls
			.lock()
			.iter()
			.all(|call| call.model == "gpt-4o-mini"));
	}

	#[test]
	fn test_cost_breaks_accuracy_ties() {
		let a = PromptMetrics {
			prompt: "a".to_string(),
			rows: vec![],
			accuracy: 80.0,
			found_rate: 100.0,
			fast_cost: 0.02,
			advanced_cost: 0.2,
		};
		let b = PromptMetrics {
			prompt: "b".to_string(),
			fast_cost: 0.01,
			..a.clone()
		};
		assert_eq!(recommend(&a, &b), PromptChoice::B);
		assert_eq!(recommend(&a, &a), PromptChoice::A);
	}

	#[tokio::test]
	async fn test_tier_errors_count_as_disagreement() {
		let backend = backend().with_tool_handler(|_| {
			Err(CellError::from_backend_failure(Some(429), "Rate limit reached"))
		});
		let (evaluator, _) = build(backend);
		let run = evaluator
			.run(&sheet(), "website", "Find the website", "Find the homepage")
			.await
			.unwrap();

		assert_eq!(run.prompt_a.accuracy, 0.0);
		assert_eq!(run.disagreement, 100.0);
		assert_eq!(
			run.prompt_a.rows[0].fast.error.as_deref(),
			Some("API quota exceeded")
		);
		assert!(run.prompt_a.rows[0].advanced.is_found());
	}

	#[tokio::test]
	async fn test_rejects_unknown_column_and_blank_prompt() {
		let (evaluator, backend) = build(backend());
		assert!(matches!(
			evaluator.run(&sheet(), "nope", "a", "b").await,
			Err(SheetError::UnknownColumn(_))
		));
		assert!(matches!(
			evaluator.run(&sheet(), "website", "a", " ").await,
			Err(SheetError::MissingPrompt(_))
		));
		assert_eq!(backend.tool_call_count() + backend.chat_call_count(), 0);
	}
}
