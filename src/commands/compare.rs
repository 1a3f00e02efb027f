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

use cellfill::compare::ResultComparator;
use cellfill::config::Config;
use cellfill::providers::ModelBackend;

#[derive(Args, Debug)]
pub struct CompareArgs {
	/// First value
	pub result1: String,

	/// Second value
	pub result2: String,
}

pub async fn execute(args: &CompareArgs, backend: Arc<dyn ModelBackend>, config: &Config) -> Result<()> {
	let comparator = ResultComparator::new(backend, config);
	let comparison = comparator.compare(&args.result1, &args.result2).await?;

	let verdict = if comparison.matched {
		"match".bright_green()
	} else {
		"no match".bright_red()
	};
	println!("{} (confidence {}%)", verdict, comparison.confidence);
	Ok(())
}
