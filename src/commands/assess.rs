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

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use cellfill::complexity::ComplexityClassifier;
use cellfill::config::Config;
use cellfill::providers::ModelBackend;

#[derive(Args, Debug)]
pub struct AssessArgs {
	/// Column prompt to classify
	pub prompt: String,
}

pub async fn execute(args: &AssessArgs, backend: Arc<dyn ModelBackend>, config: &Config) -> Result<()> {
	let classifier = ComplexityClassifier::new(backend, config);
	let complexity = classifier.classify_or_default(&args.prompt).await;
	let tier = complexity.recommended_tier();

	println!("Complexity: {}", complexity.to_string().bright_cyan());
	println!(
		"Suggested tier: {} ({})",
		tier.to_string().bright_green(),
		tier.model(&config.models)
	);
	Ok(())
}
