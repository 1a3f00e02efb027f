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

// Semantic comparison of two generated values

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::errors::CellError;
use crate::log_debug;
use crate::prompt::{build_comparison_user_prompt, COMPARISON_SYSTEM_PROMPT};
use crate::providers::{ChatRequest, ModelBackend};
use crate::sanitizer::NOT_FOUND;

const JUDGE_MAX_TOKENS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
	#[serde(rename = "match")]
	pub matched: bool,
	/// 0-100
	pub confidence: u8,
}

fn is_blank(value: &str) -> bool {
	let value = value.trim();
	value.is_empty() || value == NOT_FOUND
}

/// Levenshtein similarity as a 0-100 percentage of the longer string
pub fn string_similarity(a: &str, b: &str) -> f64 {
	if a == b {
		return 100.0;
	}
	let a: Vec<char> = a.chars().collect();
	let b: Vec<char> = b.chars().collect();
	if a.is_empty() || b.is_empty() {
		return 0.0;
	}

	let longer = a.len().max(b.len());
	let distance = levenshtein(&a, &b);
	(longer - distance) as f64 / longer as f64 * 100.0
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
	let mut previous: Vec<usize> = (0..=b.len()).collect();
	let mut current = vec![0; b.len() + 1];

	for (i, ca) in a.iter().enumerate() {
		current[0] = i + 1;
		for (j, cb) in b.iter().enumerate() {
			let substitution = previous[j] + usize::from(ca != cb);
			current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
		}
		std::mem::swap(&mut previous, &mut current);
	}
	previous[b.len()]
}

/// Model judgment with string similarity as a floor on match and a ceiling otherwise
pub fn blend_confidence(matched: bool, similarity: f64) -> u8 {
	let confidence = if matched {
		similarity.max(80.0)
	} else {
		similarity.min(20.0)
	};
	confidence.round().clamp(0.0, 100.0) as u8
}

pub struct ResultComparator {
	backend: Arc<dyn ModelBackend>,
	model: String,
}

impl ResultComparator {
	pub fn new(backend: Arc<dyn ModelBackend>, config: &Config) -> Self {
		Self {
			backend,
			model: config.models.utility.clone(),
		}
	}

	/// The model sees the values in order, so swapping them may change the verdict
	pub async fn compare(&self, result1: &str, result2: &str) -> Result<Comparison, CellError> {
		if !self.backend.is_configured() {
			return Err(CellError::Configuration);
		}

		if is_blank(result1) || is_blank(result2) {
			let both = is_blank(result1) && is_blank(result2);
			return Ok(Comparison {
				matched: both,
				confidence: if both { 100 } else { 0 },
			});
		}

		let reply = self
			.backend
			.chat_completion(&ChatRequest {
				model: self.model.clone(),
				system: Some(COMPARISON_SYSTEM_PROMPT.to_string()),
				user: build_comparison_user_prompt(result1, result2),
				temperature: 0.0,
				max_tokens: JUDGE_MAX_TOKENS,
			})
			.await?;

		let verdict = reply
			.shape
			.text()
			.map(|t| t.trim().to_uppercase())
			.unwrap_or_else(|| "NO".to_string());
		let matched = verdict == "YES";

		let similarity = string_similarity(&result1.to_lowercase(), &result2.to_lowercase());
		log_debug!(
			"Judge said {} (similarity {:.1}%)",
			verdict,
			similarity
		);

		Ok(Comparison {
			matched,
			confidence: blend_confidence(matched, similarity),
		})
	}
}
