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

// Spreadsheet state: columns, rows and cells behind a repository trait

mod filler;

pub use filler::{CellFiller, FillReport};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::gateway::ModelTier;
use crate::prompt::RowContext;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetError {
	#[error("Unknown column '{0}'")]
	UnknownColumn(String),

	#[error("Row {0} does not exist")]
	UnknownRow(usize),

	#[error("Cannot delete the last column")]
	LastColumn,

	#[error("Column '{0}' has no prompt")]
	MissingPrompt(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
	#[serde(default)]
	pub value: String,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub is_generating: bool,
	/// Comma-joined URLs or a description of where the value came from
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl Cell {
	pub fn with_value(value: impl Into<String>) -> Self {
		Self {
			value: value.into(),
			..Default::default()
		}
	}

	pub fn generating() -> Self {
		Self {
			is_generating: true,
			..Default::default()
		}
	}

	pub fn failed(error: impl Into<String>) -> Self {
		Self {
			error: Some(error.into()),
			..Default::default()
		}
	}

	pub fn is_empty(&self) -> bool {
		self.value.trim().is_empty()
	}

	/// Hostnames of the source URLs, for compact display
	pub fn source_hosts(&self) -> Vec<String> {
		self.source
			.as_deref()
			.unwrap_or_default()
			.split(',')
			.filter_map(|part| url::Url::parse(part.trim()).ok())
			.filter_map(|url| url.host_str().map(str::to_string))
			.collect()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
	pub id: String,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub prompt: Option<String>,
	#[serde(default, rename = "isAIColumn")]
	pub is_ai_column: bool,
	#[serde(default)]
	pub model: ModelTier,
}

impl Column {
	pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			prompt: None,
			is_ai_column: false,
			model: ModelTier::default(),
		}
	}

	pub fn with_prompt(mut self, prompt: &str) -> Self {
		self.set_prompt(prompt);
		self
	}

	/// A column is AI-filled exactly when it has a non-blank prompt
	pub fn set_prompt(&mut self, prompt: &str) {
		let prompt = prompt.trim();
		if prompt.is_empty() {
			self.prompt = None;
			self.is_ai_column = false;
		} else {
			self.prompt = Some(prompt.to_string());
			self.is_ai_column = true;
		}
	}

	pub fn active_prompt(&self) -> Option<&str> {
		self.prompt.as_deref().filter(|p| self.is_ai_column && !p.trim().is_empty())
	}
}

/// Column id -> cell
pub type Row = BTreeMap<String, Cell>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
	#[serde(default)]
	pub columns: Vec<Column>,
	#[serde(default)]
	pub rows: Vec<Row>,
}

impl Sheet {
	pub fn new(columns: Vec<Column>) -> Self {
		Self {
			columns,
			rows: Vec::new(),
		}
	}

	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read sheet from {}", path.display()))?;
		let mut sheet: Sheet = serde_json::from_str(&content)
			.with_context(|| format!("Failed to parse sheet {}", path.display()))?;
		sheet.backfill();
		Ok(sheet)
	}

	pub fn save(&self, path: &Path) -> Result<()> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent)
				.with_context(|| format!("Failed to create {}", parent.display()))?;
		}
		let content = serde_json::to_string_pretty(self).context("Failed to serialize sheet")?;
		std::fs::write(path, content)
			.with_context(|| format!("Failed to write sheet to {}", path.display()))?;
		Ok(())
	}

	pub fn column(&self, id: &str) -> Option<&Column> {
		self.columns.iter().find(|c| c.id == id)
	}

	/// Every row gets an entry for every column
	fn backfill(&mut self) {
		for row in &mut self.rows {
			for column in &self.columns {
				row.entry(column.id.clone()).or_default();
			}
		}
	}

	/// Sibling values keyed by column display name, target column and blanks excluded
	pub fn row_context(&self, row: &Row, exclude_column: &str) -> RowContext {
		self.columns
			.iter()
			.filter(|column| column.id != exclude_column)
			.filter_map(|column| {
				let cell = row.get(&column.id)?;
				(!cell.is_empty()).then(|| (column.name.clone(), cell.value.clone()))
			})
			.collect()
	}
}

/// Storage seam for spreadsheet state
pub trait SheetRepository: Send + Sync {
	fn snapshot(&self) -> Sheet;
	fn column(&self, id: &str) -> Option<Column>;
	fn row(&self, index: usize) -> Option<Row>;
	fn row_count(&self) -> usize;

	fn add_column(&self, name: &str) -> Column;
	fn delete_column(&self, id: &str) -> Result<(), SheetError>;
	fn update_column_name(&self, id: &str, name: &str) -> Result<(), SheetError>;
	fn update_column_prompt(&self, id: &str, prompt: &str) -> Result<(), SheetError>;
	fn update_column_model(&self, id: &str, model: ModelTier) -> Result<(), SheetError>;

	/// Returns the index of the new row
	fn add_row(&self) -> usize;
	fn set_cell(&self, row: usize, column_id: &str, cell: Cell) -> Result<(), SheetError>;

	fn update_cell(&self, row: usize, column_id: &str, value: &str) -> Result<(), SheetError> {
		self.set_cell(row, column_id, Cell::with_value(value))
	}

	fn clear_cell(&self, row: usize, column_id: &str) -> Result<(), SheetError> {
		self.set_cell(row, column_id, Cell::default())
	}
}

/// Memory-resident sheet; lost when the process exits
#[derive(Debug, Default)]
pub struct InMemorySheet {
	state: RwLock<Sheet>,
}

impl InMemorySheet {
	pub fn new(mut sheet: Sheet) -> Self {
		sheet.backfill();
		Self {
			state: RwLock::new(sheet),
		}
	}

	fn with_column<F>(&self, id: &str, update: F) -> Result<(), SheetError>
	where
		F: FnOnce(&mut Column),
	{
		let mut sheet = self.state.write();
		let column = sheet
			.columns
			.iter_mut()
			.find(|c| c.id == id)
			.ok_or_else(|| SheetError::UnknownColumn(id.to_string()))?;
		update(column);
		Ok(())
	}
}

impl SheetRepository for InMemorySheet {
	fn snapshot(&self) -> Sheet {
		self.state.read().clone()
	}

	fn column(&self, id: &str) -> Option<Column> {
		self.state.read().column(id).cloned()
	}

	fn row(&self, index: usize) -> Option<Row> {
		self.state.read().rows.get(index).cloned()
	}

	fn row_count(&self) -> usize {
		self.state.read().rows.len()
	}

	fn add_column(&self, name: &str) -> Column {
		let column = Column::new(
			format!("col_{}", uuid::Uuid::new_v4().simple()),
			name,
		);
		let mut sheet = self.state.write();
		for row in &mut sheet.rows {
			row.insert(column.id.clone(), Cell::default());
		}
		sheet.columns.push(column.clone());
		column
	}

	fn delete_column(&self, id: &str) -> Result<(), SheetError> {
		let mut sheet = self.state.write();
		let position = sheet
			.columns
			.iter()
			.position(|c| c.id == id)
			.ok_or_else(|| SheetError::UnknownColumn(id.to_string()))?;
		if sheet.columns.len() == 1 {
			return Err(SheetError::LastColumn);
		}
		sheet.columns.remove(position);
		for row in &mut sheet.rows {
			row.remove(id);
		}
		Ok(())
	}

	fn update_column_name(&self, id: &str, name: &str) -> Result<(), SheetError> {
		self.with_column(id, |column| column.name = name.to_string())
	}

	fn update_column_prompt(&self, id: &str, prompt: &str) -> Result<(), SheetError> {
		self.with_column(id, |column| column.set_prompt(prompt))
	}

	fn update_column_model(&self, id: &str, model: ModelTier) -> Result<(), SheetError> {
		self.with_column(id, |column| column.model = model)
	}

	fn add_row(&self) -> usize {
		let mut sheet = self.state.write();
		let row: Row = sheet
			.columns
			.iter()
			.map(|c| (c.id.clone(), Cell::default()))
			.collect();
		sheet.rows.push(row);
		sheet.rows.len() - 1
	}

	fn set_cell(&self, row: usize, column_id: &str, cell: Cell) -> Result<(), SheetError> {
		let mut sheet = self.state.write();
		if sheet.column(column_id).is_none() {
			return Err(SheetError::UnknownColumn(column_id.to_string()));
		}
		let target = sheet.rows.get_mut(row).ok_or(SheetError::UnknownRow(row))?;
		target.insert(column_id.to_string(), cell);
		Ok(())
	}
}
