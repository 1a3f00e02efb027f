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

// Prompt construction for cell generation, classification and comparison

use std::collections::BTreeMap;

use crate::errors::CellError;
use crate::sanitizer::NOT_FOUND;

/// Sibling cell values keyed by readable column name
pub type RowContext = BTreeMap<String, String>;

const NO_CONTEXT: &str = "No additional context provided";

/// Taxonomy prompt for the complexity classifier
pub const COMPLEXITY_SYSTEM_PROMPT: &str = r#"You are a task complexity analyzer. Classify the given spreadsheet task as "simple", "medium" or "complex".

SIMPLE tasks:
- Looking up contact data such as emails, phone numbers or websites
- Retrieving a single fact with a clear answer (founding year, headquarters)

MEDIUM tasks:
- Research that needs several sources or some verification
- Light interpretation or summarizing of common business information

COMPLEX tasks:
- Deep analysis, multi-step reasoning or expert knowledge
- Subjective, strategic, financial or technical assessments

Respond with exactly ONE word: simple, medium or complex. No explanations."#;

/// System prompt for the semantic equivalence judge
pub const COMPARISON_SYSTEM_PROMPT: &str = r#"You compare two generated spreadsheet values and decide whether they carry essentially the same information.

RULES:
1. Judge meaning and facts, not formatting, extra words or phrasing
2. URLs match when they point to the same site or company
3. Emails match when they belong to the same contact or domain
4. Phone numbers match when the digits are the same, whatever the format
5. Different spellings of the same company name match

Answer ONLY "YES" or "NO"."#;

/// Drop blank values and render `key: value` lines
pub fn format_context(context: &RowContext) -> String {
	context
		.iter()
		.filter(|(_, value)| !value.trim().is_empty())
		.map(|(key, value)| format!("{}: {}", key, value))
		.collect::<Vec<_>>()
		.join("\n")
}

/// Build the directive for one cell.
///
/// Web search is mandated only when the active model can use the tool.
/// A blank instruction is rejected so no generation is attempted.
pub fn build_cell_prompt(
	instruction: &str,
	context: &RowContext,
	search_enabled: bool,
) -> Result<String, CellError> {
	if instruction.trim().is_empty() {
		return Err(CellError::Validation("Prompt is required".to_string()));
	}

	let context_block = format_context(context);
	let context_block = if context_block.is_empty() {
		NO_CONTEXT.to_string()
	} else {
		context_block
	};

	let research_rule = if search_enabled {
		"ALWAYS search the web for current information before answering - this is REQUIRED. Do not rely on training data alone."
	} else {
		"Research the requested information from the task and the context provided."
	};

	let closing = if search_enabled {
		"Search the web for current information and return only the requested information, nothing else."
	} else {
		"Return only the requested information, nothing else."
	};

	Ok(format!(
		"You are a business research assistant filling spreadsheet cells with accurate, up-to-date information.

RULES:
1. {research_rule}
2. Return ONLY the literal answer. The text goes straight into a spreadsheet cell: no explanations, no extra words.
3. If you cannot find the information, return exactly \"{NOT_FOUND}\".
4. Websites: return the full URL including https://
5. Emails: return a single valid business email address
6. Phone numbers: use a standard format such as 1-800-555-0123
7. Prefer official company sources and reliable business directories.

CONTEXT:
{context_block}

TASK: {instruction}

{closing}"
	))
}

/// Follow-up asking the model to restate an answer with an explicit citation
pub fn build_citation_prompt(original_prompt: &str, answer: &str) -> String {
	format!(
		"{original_prompt}

A previous answer to this task was: {answer}

Restate that answer and append the page it came from in exactly this format: <answer> (Source: <url>)
Return nothing else."
	)
}

pub fn build_complexity_user_prompt(task: &str) -> String {
	format!("Analyze this prompt: \"{}\"", task)
}

pub fn build_comparison_user_prompt(result_a: &str, result_b: &str) -> String {
	format!(
		"Compare these two results:

Result 1: {result_a}
Result 2: {result_b}

Do they contain essentially the same information? Answer YES or NO only."
	)
}
