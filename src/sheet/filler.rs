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

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use super::{Cell, SheetError, SheetRepository};
use crate::config::{Config, FillConfig};
use crate::gateway::{Gateway, GenerationRequest, ModelSelection};
use crate::retry::RetryPolicy;
use crate::{log_debug, log_info};

/// Outcome of filling a column's empty cells
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillReport {
	pub column_id: String,
	pub filled: Vec<usize>,
	pub failed: Vec<(usize, String)>,
}

/// Writes generated values into a sheet
pub struct CellFiller {
	sheet: Arc<dyn SheetRepository>,
	gateway: Arc<Gateway>,
	retry: RetryPolicy,
	fill: FillConfig,
}

impl CellFiller {
	pub fn new(sheet: Arc<dyn SheetRepository>, gateway: Arc<Gateway>, config: &Config) -> Self {
		Self {
			sheet,
			gateway,
			retry: RetryPolicy::from_config(&config.retry),
			fill: config.fill.clone(),
		}
	}

	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	pub fn with_fill(mut self, fill: FillConfig) -> Self {
		self.fill = fill;
		self
	}

	/// Generate one cell and write the value or the error into it
	pub async fn generate_cell(&self, row: usize, column_id: &str) -> Result<Cell, SheetError> {
		let column = self
			.sheet
			.column(column_id)
			.ok_or_else(|| SheetError::UnknownColumn(column_id.to_string()))?;
		let prompt = column
			.active_prompt()
			.ok_or_else(|| SheetError::MissingPrompt(column_id.to_string()))?
			.to_string();

		let snapshot = self.sheet.snapshot();
		let row_cells = snapshot.rows.get(row).ok_or(SheetError::UnknownRow(row))?;
		let request = GenerationRequest {
			prompt,
			context: snapshot.row_context(row_cells, column_id),
			column_key: column.id.clone(),
			row_data: row_cells
				.iter()
				.map(|(id, cell)| (id.clone(), cell.value.clone()))
				.collect(),
			model: ModelSelection::Tier(column.model),
		};

		self.sheet.set_cell(row, column_id, Cell::generating())?;

		let gateway = self.gateway.as_ref();
		let request = &request;
		let cell = match self.retry.run(move |_| gateway.generate(request)).await {
			Ok(outcome) => Cell {
				value: outcome.value,
				source: Some(outcome.source),
				..Default::default()
			},
			Err(failure) => {
				log_debug!("Cell ({}, {}) failed: {}", row, column_id, failure);
				Cell::failed(failure.to_string())
			}
		};

		self.sheet.set_cell(row, column_id, cell.clone())?;
		Ok(cell)
	}

	pub async fn retry_cell(&self, row: usize, column_id: &str) -> Result<Cell, SheetError> {
		self.generate_cell(row, column_id).await
	}

	/// Fill every empty cell of a column in fixed-size batches, issued in row order
	pub async fn fill_column(&self, column_id: &str) -> Result<FillReport, SheetError> {
		let column = self
			.sheet
			.column(column_id)
			.ok_or_else(|| SheetError::UnknownColumn(column_id.to_string()))?;
		if column.active_prompt().is_none() {
			return Err(SheetError::MissingPrompt(column_id.to_string()));
		}

		let snapshot = self.sheet.snapshot();
		let empty_rows: Vec<usize> = snapshot
			.rows
			.iter()
			.enumerate()
			.filter(|(_, row)| row.get(column_id).map_or(true, Cell::is_empty))
			.map(|(index, _)| index)
			.collect();

		log_info!(
			"Filling {} empty cells in '{}'",
			empty_rows.len(),
			column.name
		);

		let mut report = FillReport {
			column_id: column_id.to_string(),
			..Default::default()
		};
		let batch_size = self.fill.batch_size.max(1);
		let pause = Duration::from_millis(self.fill.batch_pause_ms);
		let batches: Vec<&[usize]> = empty_rows.chunks(batch_size).collect();

		for (index, batch) in batches.iter().enumerate() {
			let results = join_all(batch.iter().map(|&row| self.generate_cell(row, column_id))).await;

			for (&row, result) in batch.iter().zip(results) {
				match result {
					Ok(cell) => match cell.error {
						Some(error) => report.failed.push((row, error)),
						None => report.filled.push(row),
					},
					Err(e) => report.failed.push((row, e.to_string())),
				}
			}

			if index + 1 < batches.len() && !pause.is_zero() {
				sleep(pause).await;
			}
		}

		log_info!(
			"Column '{}': {} filled, {} failed",
			column.name,
			report.filled.len(),
			report.failed.len()
		);
		Ok(report)
	}
}
