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

use cellfill::config::{Config, LogLevel, OPENAI_API_KEY_ENV};
use cellfill::directories;

#[derive(Args, Debug)]
pub struct ConfigArgs {
	/// Set log level (none, info, debug)
	#[arg(long)]
	pub log_level: Option<String>,

	/// Set the fast-tier model
	#[arg(long)]
	pub fast_model: Option<String>,

	/// Set the advanced-tier model
	#[arg(long)]
	pub advanced_model: Option<String>,

	/// Set the tool-capable fallback model
	#[arg(long)]
	pub search_fallback_model: Option<String>,

	/// Set the model used for classification and comparison
	#[arg(long)]
	pub utility_model: Option<String>,

	/// Record raw backend exchanges in the JSONL log
	#[arg(long)]
	pub log_exchanges: Option<bool>,

	/// Set the number of retries after the first attempt
	#[arg(long)]
	pub max_retries: Option<u32>,

	/// Set the per-request timeout in seconds (0 disables)
	#[arg(long)]
	pub timeout: Option<u64>,

	/// Set how many cells a column fill generates at once
	#[arg(long)]
	pub batch_size: Option<usize>,

	/// Show current configuration values with defaults
	#[arg(long)]
	pub show: bool,

	/// Validate configuration without making changes
	#[arg(long)]
	pub validate: bool,
}

// Handle the configuration command
pub fn execute(args: &ConfigArgs, mut config: Config) -> Result<()> {
	if args.show {
		show_configuration(&config)?;
		return Ok(());
	}

	// If validation flag is set, just validate and exit
	if args.validate {
		match config.validate() {
			Ok(()) => {
				println!("✅ Configuration is valid!");
				return Ok(());
			}
			Err(e) => {
				eprintln!("❌ Configuration validation failed: {}", e);
				return Err(e);
			}
		}
	}

	let mut modified = false;

	if let Some(level) = &args.log_level {
		match level.parse::<LogLevel>() {
			Ok(level) => {
				config.log_level = level;
				println!("Set log level to {:?}", level);
				modified = true;
			}
			Err(e) => {
				eprintln!("Error: {}", e);
				return Ok(());
			}
		}
	}

	for (value, target, label) in [
		(&args.fast_model, &mut config.models.fast, "fast-tier model"),
		(&args.advanced_model, &mut config.models.advanced, "advanced-tier model"),
		(
			&args.search_fallback_model,
			&mut config.models.search_fallback,
			"search fallback model",
		),
		(&args.utility_model, &mut config.models.utility, "utility model"),
	] {
		if let Some(model) = value {
			*target = model.clone();
			println!("Set {} to {}", label, model);
			modified = true;
		}
	}

	if let Some(enabled) = args.log_exchanges {
		config.log_exchanges = enabled;
		println!(
			"Exchange logging {}",
			if enabled { "enabled" } else { "disabled" }
		);
		modified = true;
	}

	if let Some(max_retries) = args.max_retries {
		config.retry.max_retries = max_retries;
		println!("Set max retries to {}", max_retries);
		modified = true;
	}

	if let Some(timeout) = args.timeout {
		config.generation.request_timeout_seconds = timeout;
		println!("Set request timeout to {}s", timeout);
		modified = true;
	}

	if let Some(batch_size) = args.batch_size {
		config.fill.batch_size = batch_size;
		println!("Set batch size to {}", batch_size);
		modified = true;
	}

	// If no modifications were made, create a default config
	if !modified {
		let config_path = directories::get_config_file_path()?;

		if config_path.exists() {
			println!(
				"Configuration file already exists at: {}",
				config_path.display()
			);
			println!("No changes were made to the configuration.");
		} else {
			let config_path = Config::create_default_config()?;
			println!(
				"Created default configuration file at: {}",
				config_path.display()
			);
		}
	} else {
		if let Err(e) = config.save() {
			eprintln!("Error saving configuration: {}", e);
			return Err(e);
		}
		println!("Configuration saved successfully");
	}

	Ok(())
}

fn show_configuration(config: &Config) -> Result<()> {
	println!("🔧 Cellfill Configuration\n");

	let config_path = directories::get_config_file_path()?;
	if config_path.exists() {
		println!("📁 Config file: {}", config_path.display());
	} else {
		println!(
			"📁 Config file: {} (not created yet)",
			config_path.display()
		);
	}
	println!();

	println!("🌍 System-wide Settings");
	println!("  Log level:                 {:?}", config.log_level);
	println!(
		"  Exchange log:              {}",
		if config.log_exchanges {
			"enabled"
		} else {
			"disabled"
		}
	);
	println!();

	println!("🤖 Models");
	println!("  Fast tier:                 {}", config.models.fast);
	println!("  Advanced tier:             {}", config.models.advanced);
	println!("  Search fallback:           {}", config.models.search_fallback);
	println!("  Utility:                   {}", config.models.utility);
	println!(
		"  Web search capable:        {}",
		config.models.search_capable.join(", ")
	);
	println!();

	println!("⚙️  Generation");
	println!("  Temperature:               {}", config.generation.temperature);
	println!(
		"  Max completion tokens:     {}",
		config.generation.max_completion_tokens
	);
	println!("  Max sources:               {}", config.generation.max_sources);
	println!(
		"  Request timeout:           {}",
		match config.generation.request_timeout_seconds {
			0 => "disabled".to_string(),
			seconds => format!("{}s", seconds),
		}
	);
	println!(
		"  Retries:                   {} (base delay {}ms)",
		config.retry.max_retries, config.retry.base_delay_ms
	);
	println!(
		"  Column fill:               batches of {}, {}ms apart",
		config.fill.batch_size, config.fill.batch_pause_ms
	);
	println!();

	println!("🌐 Server");
	println!(
		"  Address:                   {}:{}",
		config.server.host, config.server.port
	);
	println!();

	println!("🔑 Provider API keys");
	show_api_key_status(config);
	println!();

	directories::print_directory_info()?;
	Ok(())
}

fn show_api_key_status(config: &Config) {
	if std::env::var(OPENAI_API_KEY_ENV).is_ok() {
		println!(
			"  {:<15} ✅ Set via {} environment variable",
			"OpenAI", OPENAI_API_KEY_ENV
		);
	} else if config.openai_api_key().is_some() {
		println!("  {:<15} ✅ Set in config file", "OpenAI");
	} else {
		println!(
			"  {:<15} ❌ Not set (export {}=your-key)",
			"OpenAI", OPENAI_API_KEY_ENV
		);
	}
}
