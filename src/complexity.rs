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

// Task complexity classification used to pick a model tier

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::errors::CellError;
use crate::gateway::ModelTier;
use crate::prompt::{build_complexity_user_prompt, COMPLEXITY_SYSTEM_PROMPT};
use crate::providers::{ChatRequest, ModelBackend};
use crate::{log_debug, log_info};

const CLASSIFIER_TEMPERATURE: f32 = 0.1;
const CLASSIFIER_MAX_TOKENS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
	Simple,
	#[default]
	Medium,
	Complex,
}

impl Complexity {
	/// Out-of-taxonomy answers land on the middle tier
	pub fn from_answer(answer: &str) -> Self {
		let word: String = answer
			.trim()
			.chars()
			.filter(|c| c.is_ascii_alphabetic())
			.collect::<String>()
			.to_lowercase();

		match word.as_str() {
			"simple" => Complexity::Simple,
			"complex" => Complexity::Complex,
			_ => Complexity::Medium,
		}
	}

	/// Cheap tier covers everything short of complex
	pub fn recommended_tier(&self) -> ModelTier {
		match self {
			Complexity::Simple | Complexity::Medium => ModelTier::Fast,
			Complexity::Complex => ModelTier::Advanced,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Complexity::Simple => "simple",
			Complexity::Medium => "medium",
			Complexity::Complex => "complex",
		}
	}
}

impl std::fmt::Display for Complexity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

pub struct ComplexityClassifier {
	backend: Arc<dyn ModelBackend>,
	model: String,
}

impl ComplexityClassifier {
	pub fn new(backend: Arc<dyn ModelBackend>, config: &Config) -> Self {
		Self {
			backend,
			model: config.models.utility.clone(),
		}
	}

	/// Backend errors are returned so callers can mirror credential problems
	pub async fn classify(&self, task: &str) -> Result<Complexity, CellError> {
		if !self.backend.is_configured() {
			return Err(CellError::Configuration);
		}
		if task.trim().is_empty() {
			return Err(CellError::Validation("Prompt is required".to_string()));
		}

		let reply = self
			.backend
			.chat_completion(&ChatRequest {
				model: self.model.clone(),
				system: Some(COMPLEXITY_SYSTEM_PROMPT.to_string()),
				user: build_complexity_user_prompt(task),
				temperature: CLASSIFIER_TEMPERATURE,
				max_tokens: CLASSIFIER_MAX_TOKENS,
			})
			.await?;

		let answer = reply.shape.text().unwrap_or_default();
		let complexity = Complexity::from_answer(answer);
		log_debug!("Classifier answered '{}' -> {}", answer.trim(), complexity);
		Ok(complexity)
	}

	/// Never fails: any error means the middle tier
	pub async fn classify_or_default(&self, task: &str) -> Complexity {
		match self.classify(task).await {
			Ok(complexity) => complexity,
			Err(e) => {
				log_info!("Complexity assessment failed ({}), assuming medium", e.detail());
				Complexity::Medium
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{chat_reply, ScriptedBackend};

	fn build(backend: ScriptedBackend) -> (ComplexityClassifier, Arc<ScriptedBackend>) {
		let backend = Arc::new(backend);
		(
			ComplexityClassifier::new(backend.clone(), &Config::default()),
			backend,
		)
	}

	#[test]
	fn test_answer_parsing() {
		assert_eq!(Complexity::from_answer("simple"), Complexity::Simple);
		assert_eq!(Complexity::from_answer(" Complex.\n"), Complexity::Complex);
		assert_eq!(Complexity::from_answer("MEDIUM"), Complexity::Medium);
		assert_eq!(Complexity::from_answer("urgent"), Complexity::Medium);
		assert_eq!(Complexity::from_answer(""), Complexity::Medium);
	}

	#[test]
	fn test_tier_policy() {
		assert_eq!(Complexity::Simple.recommended_tier(), ModelTier::Fast);
		assert_eq!(Complexity::Medium.recommended_tier(), ModelTier::Fast);
		assert_eq!(Complexity::Complex.recommended_tier(), ModelTier::Advanced);
		assert!(Complexity::Simple < Complexity::Complex);
	}

	#[tokio::test]
	async fn test_out_of_taxonomy_answer_is_medium() {
		let (classifier, backend) =
			build(ScriptedBackend::new().push_chat(Ok(chat_reply("urgent"))));

		let complexity = classifier.classify("Find the CEO's email").await.unwrap();
		assert_eq!(complexity, Complexity::Medium);

		let calls = backend.chat_calls.lock();
		assert_eq!(calls[0].model, "gpt-3.5-turbo");
		assert_eq!(calls[0].max_tokens, 10);
		assert!(calls[0].user.contains("Find the CEO's email"));
	}

	#[tokio::test]
	async fn test_classifies_complex() {
		let (classifier, _) =
			build(ScriptedBackend::new().push_chat(Ok(chat_reply("complex"))));
		let complexity = classifier
			.classify_or_default("Assess the competitive landscape")
			.await;
		assert_eq!(complexity, Complexity::Complex);
	}

	#[tokio::test]
	async fn test_backend_failure_defaults_to_medium() {
		let (classifier, _) = build(ScriptedBackend::new().push_chat(Err(
			CellError::from_backend_failure(Some(401), "Incorrect API key"),
		)));

		let err = classifier.classify("Find the website").await.unwrap_err();
		assert_eq!(err.status_code(), 401);

		let (classifier, _) =
			build(ScriptedBackend::new().push_chat(Err(CellError::backend("boom"))));
		assert_eq!(
			classifier.classify_or_default("Find the website").await,
			Complexity::Medium
		);
	}

	#[tokio::test]
	async fn test_blank_prompt_makes_no_call() {
		let (classifier, backend) = build(ScriptedBackend::new());
		assert!(matches!(
			classifier.classify("  ").await,
			Err(CellError::Validation(_))
		));
		assert_eq!(backend.chat_call_count(), 0);
	}
}
