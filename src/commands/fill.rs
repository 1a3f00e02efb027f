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

use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use cellfill::config::Config;
use cellfill::gateway::{Gateway, GenerationRequest, GenerationResult, ModelSelection};
use cellfill::prompt::RowContext;
use cellfill::providers::ModelBackend;
use cellfill::retry::RetryPolicy;

#[derive(Args, Debug)]
pub struct FillArgs {
	/// Instruction for the cell
	#[arg(long)]
	pub prompt: String,

	/// Row context as key=value (can be used multiple times)
	#[arg(short, long = "context", value_name = "KEY=VALUE")]
	pub context: Vec<String>,

	/// Model tier (fast, advanced) or a model id
	#[arg(long)]
	pub model: Option<String>,

	/// Column key the value is generated for
	#[arg(long, default_value = "value")]
	pub column_key: String,

	/// Output the result as JSON
	#[arg(long)]
	pub json: bool,
}

fn parse_context(pairs: &[String]) -> Result<RowContext> {
	pairs
		.iter()
		.map(|pair| {
			let (key, value) = pair
				.split_once('=')
				.ok_or_else(|| anyhow!("Context must be in key=value format, got '{}'", pair))?;
			Ok((key.trim().to_string(), value.trim().to_string()))
		})
		.collect()
}

pub async fn execute(args: &FillArgs, backend: Arc<dyn ModelBackend>, config: &Config) -> Result<()> {
	let context = parse_context(&args.context)?;
	let request = GenerationRequest {
		prompt: args.prompt.clone(),
		row_data: context.clone(),
		context,
		column_key: args.column_key.clone(),
		model: ModelSelection::parse(args.model.as_deref()),
	};

	let gateway = Gateway::new(backend, config);
	let policy = RetryPolicy::from_config(&config.retry);
	let gateway = &gateway;
	let request = &request;

	match policy.run(move |_| gateway.generate(request)).await {
		Ok(outcome) => {
			if args.json {
				println!("{}", serde_json::to_string_pretty(&GenerationResult::from(&outcome))?);
			} else {
				println!("{}", outcome.value.bright_green());
				println!("{} {}", "Source:".dimmed(), outcome.source);
				println!(
					"{} {} ({:?}, ${:.5})",
					"Model:".dimmed(),
					outcome.model,
					outcome.path,
					outcome.cost
				);
			}
			Ok(())
		}
		Err(failure) => {
			if args.json {
				println!(
					"{}",
					serde_json::to_string_pretty(&GenerationResult::failure(failure.to_string()))?
				);
			}
			Err(anyhow!(failure))
		}
	}
}
