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
use clap::{Parser, Subcommand};

use cellfill::config::{set_log_level, Config};
use cellfill::{log_error, logger, providers};

mod commands;

#[derive(Parser)]
#[command(name = "cellfill")]
#[command(version)]
#[command(about = "Cellfill fills spreadsheet cells with web-researched AI answers")]
struct CellfillArgs {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the HTTP API
	Serve(commands::ServeArgs),

	/// Generate a single cell value
	Fill(commands::FillArgs),

	/// Fill every empty cell of a column in a sheet snapshot
	FillColumn(commands::FillColumnArgs),

	/// Classify a prompt's complexity and suggest a model tier
	Assess(commands::AssessArgs),

	/// Check whether two generated values carry the same information
	Compare(commands::CompareArgs),

	/// A/B test two prompts across the fast and advanced tiers
	Evaluate(commands::EvaluateArgs),

	/// Show or change the configuration
	Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = CellfillArgs::parse();

	// Load configuration
	let config = Config::load()?;
	set_log_level(config.get_log_level());

	if config.log_exchanges {
		if let Err(e) = logger::enable_exchange_log() {
			log_error!("Exchange log disabled: {}", e);
		}
	}

	// Handle the config command separately
	if let Commands::Config(config_args) = &args.command {
		return commands::config::execute(config_args, config);
	}

	let backend = providers::create_backend(&config)?;

	match &args.command {
		Commands::Serve(serve_args) => commands::serve::execute(serve_args, backend, config).await,
		Commands::Fill(fill_args) => commands::fill::execute(fill_args, backend, &config).await,
		Commands::FillColumn(fill_args) => {
			commands::fill_column::execute(fill_args, backend, &config).await
		}
		Commands::Assess(assess_args) => {
			commands::assess::execute(assess_args, backend, &config).await
		}
		Commands::Compare(compare_args) => {
			commands::compare::execute(compare_args, backend, &config).await
		}
		Commands::Evaluate(evaluate_args) => {
			commands::evaluate::execute(evaluate_args, backend, &config).await
		}
		Commands::Config(_) => unreachable!(), // Already handled above
	}
}
