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

// Exchange log - one JSONL file per day with typed entries

use anyhow::Result;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::providers::{ProviderExchange, TokenUsage};

lazy_static::lazy_static! {
	// None while exchange logging is disabled
	static ref EXCHANGE_LOG: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Enable exchange logging into the daily file under the logs directory
pub fn enable_exchange_log() -> Result<PathBuf> {
	let path = get_log_file()?;
	enable_exchange_log_at(path.clone());
	Ok(path)
}

/// Enable exchange logging into an explicit file
pub fn enable_exchange_log_at(path: PathBuf) {
	*EXCHANGE_LOG.lock() = Some(path);
}

pub fn disable_exchange_log() {
	*EXCHANGE_LOG.lock() = None;
}

/// Daily log file path
pub fn get_log_file() -> Result<PathBuf> {
	let logs_dir = crate::directories::get_logs_dir()?;
	let now = chrono::Local::now();
	Ok(logs_dir.join(format!("exchanges_{}.jsonl", now.format("%Y-%m-%d"))))
}

/// Log RAW API request (what we send to the API)
pub fn log_api_request(provider: &str, request: &serde_json::Value) -> Result<()> {
	write_entry(serde_json::json!({
		"type": "API_REQUEST",
		"timestamp": get_timestamp(),
		"provider": provider,
		"data": request
	}))
}

/// Log RAW API response (what we get from the API) with processed usage data
pub fn log_api_response(
	provider: &str,
	response: &serde_json::Value,
	usage: Option<&TokenUsage>,
) -> Result<()> {
	write_entry(serde_json::json!({
		"type": "API_RESPONSE",
		"timestamp": get_timestamp(),
		"provider": provider,
		"data": response,
		"usage": usage
	}))
}

/// Log errors for debugging
pub fn log_error(provider: &str, error: &str) -> Result<()> {
	write_entry(serde_json::json!({
		"type": "ERROR",
		"timestamp": get_timestamp(),
		"provider": provider,
		"error": error
	}))
}

/// Log both halves of an exchange; logging failures never fail a request
pub fn log_raw_exchange(exchange: &ProviderExchange) {
	let result = log_api_request(&exchange.provider, &exchange.request).and_then(|_| {
		log_api_response(&exchange.provider, &exchange.response, exchange.usage.as_ref())
	});
	if let Err(e) = result {
		crate::log_debug!("Failed to write exchange log: {}", e);
	}
}

fn write_entry(entry: serde_json::Value) -> Result<()> {
	let guard = EXCHANGE_LOG.lock();
	if let Some(path) = guard.as_ref() {
		append_to_log(path, &serde_json::to_string(&entry)?)?;
	}
	Ok(())
}

/// Helper to get timestamp
fn get_timestamp() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

/// Helper to append to log file ensuring single lines
fn append_to_log(log_file: &Path, content: &str) -> Result<()> {
	let mut file = OpenOptions::new()
		.create(true)
		.append(true)
		.open(log_file)?;

	// Ensure content is on a single line - replace any newlines with spaces
	let single_line_content = content.replace(['\n', '\r'], " ");
	writeln!(file, "{}", single_line_content)?;
	Ok(())
}
