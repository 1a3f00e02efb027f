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

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Re-export all modules
pub mod loading;
pub mod providers;
pub mod validation;

pub use providers::*;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
	#[serde(rename = "none")]
	#[default]
	None,
	#[serde(rename = "info")]
	Info,
	#[serde(rename = "debug")]
	Debug,
}

impl LogLevel {
	/// Check if info logging is enabled
	pub fn is_info_enabled(&self) -> bool {
		matches!(self, LogLevel::Info | LogLevel::Debug)
	}

	/// Check if debug logging is enabled
	pub fn is_debug_enabled(&self) -> bool {
		matches!(self, LogLevel::Debug)
	}
}

impl std::str::FromStr for LogLevel {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"none" => Ok(LogLevel::None),
			"info" => Ok(LogLevel::Info),
			"debug" => Ok(LogLevel::Debug),
			other => Err(anyhow::anyhow!(
				"Invalid log level '{}'. Valid values: none, info, debug",
				other
			)),
		}
	}
}

// Default functions
fn default_fast_model() -> String {
	"gpt-4o-mini".to_string()
}

fn default_advanced_model() -> String {
	"gpt-4.1".to_string()
}

fn default_search_fallback_model() -> String {
	"gpt-4o".to_string()
}

fn default_utility_model() -> String {
	"gpt-3.5-turbo".to_string()
}

fn default_search_capable() -> Vec<String> {
	vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()]
}

fn default_temperature() -> f32 {
	0.1
}

fn default_max_completion_tokens() -> u32 {
	500
}

fn default_max_sources() -> usize {
	3
}

fn default_request_timeout_seconds() -> u64 {
	60 // 0 disables the client-side deadline
}

fn default_max_retries() -> u32 {
	2 // initial attempt + 2 retries
}

fn default_base_delay_ms() -> u64 {
	1000
}

fn default_batch_size() -> usize {
	3
}

fn default_batch_pause_ms() -> u64 {
	1000
}

fn default_host() -> String {
	"127.0.0.1".to_string()
}

fn default_port() -> u16 {
	3000
}

/// Model identifiers for each tier and helper task
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelsConfig {
	#[serde(default = "default_fast_model")]
	pub fast: String,
	#[serde(default = "default_advanced_model")]
	pub advanced: String,
	// Always tool-capable model used when the selected one rejects web search
	#[serde(default = "default_search_fallback_model")]
	pub search_fallback: String,
	// Classification and comparison
	#[serde(default = "default_utility_model")]
	pub utility: String,
	#[serde(default = "default_search_capable")]
	pub search_capable: Vec<String>,
}

impl Default for ModelsConfig {
	fn default() -> Self {
		Self {
			fast: default_fast_model(),
			advanced: default_advanced_model(),
			search_fallback: default_search_fallback_model(),
			utility: default_utility_model(),
			search_capable: default_search_capable(),
		}
	}
}

impl ModelsConfig {
	/// Whether the web-search tool may be requested for this model
	pub fn supports_search(&self, model: &str) -> bool {
		self.search_capable.iter().any(|m| m == model)
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GenerationConfig {
	#[serde(default = "default_temperature")]
	pub temperature: f32,
	#[serde(default = "default_max_completion_tokens")]
	pub max_completion_tokens: u32,
	#[serde(default = "default_max_sources")]
	pub max_sources: usize,
	#[serde(default = "default_request_timeout_seconds")]
	pub request_timeout_seconds: u64,
}

impl Default for GenerationConfig {
	fn default() -> Self {
		Self {
			temperature: default_temperature(),
			max_completion_tokens: default_max_completion_tokens(),
			max_sources: default_max_sources(),
			request_timeout_seconds: default_request_timeout_seconds(),
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	#[serde(default = "default_base_delay_ms")]
	pub base_delay_ms: u64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: default_max_retries(),
			base_delay_ms: default_base_delay_ms(),
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FillConfig {
	#[serde(default = "default_batch_size")]
	pub batch_size: usize,
	#[serde(default = "default_batch_pause_ms")]
	pub batch_pause_ms: u64,
}

impl Default for FillConfig {
	fn default() -> Self {
		Self {
			batch_size: default_batch_size(),
			batch_pause_ms: default_batch_pause_ms(),
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
	#[serde(default = "default_host")]
	pub host: String,
	#[serde(default = "default_port")]
	pub port: u16,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: default_host(),
			port: default_port(),
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
	#[serde(default)]
	pub log_level: LogLevel,

	// Append raw backend exchanges to the JSONL log
	#[serde(default)]
	pub log_exchanges: bool,

	#[serde(default)]
	pub providers: ProvidersConfig,
	#[serde(default)]
	pub models: ModelsConfig,
	#[serde(default)]
	pub generation: GenerationConfig,
	#[serde(default)]
	pub retry: RetryConfig,
	#[serde(default)]
	pub fill: FillConfig,
	#[serde(default)]
	pub server: ServerConfig,

	#[serde(skip)]
	config_path: Option<PathBuf>,
}

impl Config {
	/// Get the global log level (system-wide setting)
	pub fn get_log_level(&self) -> LogLevel {
		self.log_level
	}

	/// Credential resolved at load time, if any
	pub fn openai_api_key(&self) -> Option<&str> {
		self.providers
			.openai
			.api_key
			.as_deref()
			.filter(|key| !key.trim().is_empty())
	}

	pub fn config_path(&self) -> Option<&PathBuf> {
		self.config_path.as_ref()
	}
}

// Logging macros for different log levels
// These macros check the process-wide log level and only print if appropriate.
// Generation runs on tokio worker threads, so the level cannot be thread-local.

lazy_static::lazy_static! {
	static ref CURRENT_LOG_LEVEL: RwLock<LogLevel> = RwLock::new(LogLevel::None);
}

/// Set the level used by the logging macros
pub fn set_log_level(level: LogLevel) {
	*CURRENT_LOG_LEVEL.write() = level;
}

pub fn current_log_level() -> LogLevel {
	*CURRENT_LOG_LEVEL.read()
}

/// Info logging macro with automatic cyan coloring
/// Shows info messages when log level is Info OR Debug
#[macro_export]
macro_rules! log_info {
	($fmt:expr) => {
		if $crate::config::current_log_level().is_info_enabled() {
			use colored::Colorize;
			println!("{}", $fmt.cyan());
		}
	};
	($fmt:expr, $($arg:expr),* $(,)?) => {
		if $crate::config::current_log_level().is_info_enabled() {
			use colored::Colorize;
			println!("{}", format!($fmt, $($arg),*).cyan());
		}
	};
}

/// Debug logging macro with automatic bright blue coloring
#[macro_export]
macro_rules! log_debug {
	($fmt:expr) => {
		if $crate::config::current_log_level().is_debug_enabled() {
			use colored::Colorize;
			println!("{}", $fmt.bright_blue());
		}
	};
	($fmt:expr, $($arg:expr),* $(,)?) => {
		if $crate::config::current_log_level().is_debug_enabled() {
			use colored::Colorize;
			println!("{}", format!($fmt, $($arg),*).bright_blue());
		}
	};
}

/// Error logging macro with automatic bright red coloring
/// Always visible regardless of log level (errors should always be shown)
#[macro_export]
macro_rules! log_error {
	($fmt:expr) => {{
		use colored::Colorize;
		eprintln!("{}", $fmt.bright_red());
	}};
	($fmt:expr, $($arg:expr),* $(,)?) => {{
		use colored::Colorize;
		eprintln!("{}", format!($fmt, $($arg),*).bright_red());
	}};
}
