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
use std::path::PathBuf;
use std::sync::Arc;

use cellfill::config::Config;
use cellfill::evaluation::{EvaluationRun, Evaluator, PromptChoice, PromptMetrics};
use cellfill::gateway::Gateway;
use cellfill::providers::ModelBackend;
use cellfill::sheet::Sheet;

#[derive(Args, Debug)]
pub struct EvaluateArgs {
	/// Sheet snapshot (JSON) providing the rows
	pub sheet: PathBuf,

	/// Id of the column the prompts are written for
	pub column: String,

	/// First prompt
	#[arg(long = "prompt-a")]
	pub prompt_a: String,

	/// Second prompt
	#[arg(long = "prompt-b")]
	pub prompt_b: String,

	/// Output the full run as JSON
	#[arg(long)]
	pub json: bool,
}

fn print_metrics(label: &str, metrics: &PromptMetrics) {
	println!("{} {}", label.bold(), metrics.prompt);
	println!(
		"  accuracy {:.1}%  found {:.1}%  cost fast ${:.5} / advanced ${:.5}",
		metrics.accuracy, metrics.found_rate, metrics.fast_cost, metrics.advanced_cost
	);
	for row in &metrics.rows {
		let marker = if row.agrees {
			"=".bright_green()
		} else {
			"≠".bright_red()
		};
		println!(
			"  row {:>3} {} fast: {} | advanced: {}",
			row.row,
			marker,
			row.fast.error.as_deref().unwrap_or(&row.fast.value),
			row.advanced.error.as_deref().unwrap_or(&row.advanced.value)
		);
	}
}

fn print_run(run: &EvaluationRun) {
	print_metrics("Prompt A:", &run.prompt_a);
	print_metrics("Prompt B:", &run.prompt_b);
	println!("Tier disagreement: {:.1}%", run.disagreement);

	let label = match run.recommended {
		PromptChoice::A => "A",
		PromptChoice::B => "B",
	};
	println!(
		"{} prompt {}",
		"Recommended:".bright_green(),
		label.bold()
	);
}

pub async fn execute(
	args: &EvaluateArgs,
	backend: Arc<dyn ModelBackend>,
	config: &Config,
) -> Result<()> {
	let sheet = Sheet::load(&args.sheet)?;
	let gateway = Arc::new(Gateway::new(backend, config));
	let evaluator = Evaluator::new(gateway, config);

	let run = evaluator
		.run(&sheet, &args.column, &args.prompt_a, &args.prompt_b)
		.await?;

	if args.json {
		println!("{}", serde_json::to_string_pretty(&run)?);
	} else {
		print_run(&run);
	}
	Ok(())
}
