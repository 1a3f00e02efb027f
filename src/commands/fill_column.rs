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
use cellfill::gateway::Gateway;
use cellfill::providers::ModelBackend;
use cellfill::sheet::{CellFiller, InMemorySheet, Sheet, SheetRepository};

#[derive(Args, Debug)]
pub struct FillColumnArgs {
	/// Sheet snapshot (JSON)
	pub sheet: PathBuf,

	/// Id of the column to fill
	pub column: String,

	/// Write the filled sheet here instead of back to the input file
	#[arg(long, short)]
	pub output: Option<PathBuf>,
}

pub async fn execute(
	args: &FillColumnArgs,
	backend: Arc<dyn ModelBackend>,
	config: &Config,
) -> Result<()> {
	let sheet = Arc::new(InMemorySheet::new(Sheet::load(&args.sheet)?));
	let gateway = Arc::new(Gateway::new(backend, config));
	let filler = CellFiller::new(sheet.clone(), gateway, config);

	let report = filler.fill_column(&args.column).await?;

	let output = args.output.as_ref().unwrap_or(&args.sheet);
	sheet.snapshot().save(output)?;

	println!(
		"{} {} filled, {} failed",
		"✓".bright_green(),
		report.filled.len(),
		report.failed.len()
	);
	for (row, error) in &report.failed {
		println!("  row {}: {}", row, error.bright_red());
	}
	println!("Saved to {}", output.display());
	Ok(())
}
