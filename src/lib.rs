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

// Main lib.rs file that exports our modules
pub mod compare;
pub mod complexity;
pub mod config;
pub mod directories;
pub mod errors;
pub mod evaluation;
pub mod gateway;
pub mod logger;
pub mod prompt;
pub mod providers;
pub mod retry;
pub mod sanitizer;
pub mod server;
pub mod sheet;

#[cfg(test)]
mod test_support;

// Re-export commonly used items for convenience
pub use config::Config;
pub use errors::CellError;
pub use gateway::{Gateway, GenerationOutcome, GenerationRequest, GenerationResult, ModelTier};
