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

pub mod assess;
pub mod compare;
pub mod config;
pub mod evaluate;
pub mod fill;
pub mod fill_column;
pub mod serve;

// Re-export all the command structs
pub use assess::AssessArgs;
pub use compare::CompareArgs;
pub use config::ConfigArgs;
pub use evaluate::EvaluateArgs;
pub use fill::FillArgs;
pub use fill_column::FillColumnArgs;
pub use serve::ServeArgs;
