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

// Bounded retries with exponential backoff around a generation attempt

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::errors::CellError;
use crate::log_debug;

/// Why the controller gave up
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetryFailure {
	/// Not worth retrying, surfaced after the attempt that produced it
	#[error("{error}")]
	Terminal { attempts: u32, error: CellError },

	#[error("Failed after {attempts} attempts: {last}")]
	Exhausted { attempts: u32, last: CellError },
}

impl RetryFailure {
	pub fn error(&self) -> &CellError {
		match self {
			Self::Terminal { error, .. } => error,
			Self::Exhausted { last, .. } => last,
		}
	}

	pub fn attempts(&self) -> u32 {
		match self {
			Self::Terminal { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
		}
	}

	pub fn status_code(&self) -> u16 {
		self.error().status_code()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_retries: u32,
	pub base_delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self::from_config(&RetryConfig::default())
	}
}

impl RetryPolicy {
	pub fn from_config(config: &RetryConfig) -> Self {
		Self {
			max_retries: config.max_retries,
			base_delay: Duration::from_millis(config.base_delay_ms),
		}
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_retries.saturating_add(1)
	}

	/// Wait before the attempt following zero-based attempt `n`
	pub fn delay_after(&self, attempt: u32) -> Duration {
		self.base_delay
			.checked_mul(2_u32.saturating_pow(attempt.min(16)))
			.unwrap_or(Duration::MAX)
	}

	/// Run `operation` until it succeeds, fails terminally or the budget runs out
	pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, RetryFailure>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = Result<T, CellError>>,
	{
		let max_attempts = self.max_attempts();
		let mut attempt = 0;

		loop {
			match operation(attempt).await {
				Ok(value) => return Ok(value),
				Err(error) if is_terminal_failure(&error) => {
					log_debug!("Attempt {} failed terminally: {}", attempt + 1, error.detail());
					return Err(RetryFailure::Terminal {
						attempts: attempt + 1,
						error,
					});
				}
				Err(error) => {
					log_debug!(
						"Attempt {}/{} failed: {}",
						attempt + 1,
						max_attempts,
						error.detail()
					);
					if attempt + 1 >= max_attempts {
						return Err(RetryFailure::Exhausted {
							attempts: attempt + 1,
							last: error,
						});
					}

					let delay = self.delay_after(attempt);
					if !delay.is_zero() {
						sleep(delay).await;
					}
					attempt += 1;
				}
			}
		}
	}
}

/// Credential and quota problems never clear up by waiting
fn is_terminal_failure(error: &CellError) -> bool {
	if error.is_terminal() {
		return true;
	}
	let detail = error.detail().to_lowercase();
	detail.contains("api key") || detail.contains("quota")
}
