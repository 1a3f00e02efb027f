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

//! Response sanitizer: turns freeform model output into a display value
//! plus the ordered, duplicate-free list of source URLs it mentioned.
//!
//! Extraction runs in a fixed priority order:
//!
//! 1. `(Source: <url>)` citation markers, stripped and captured
//! 2. markdown links `[label](url)`, stripped and captured, label dropped
//! 3. parenthesized URLs `(https://...)`, stripped and captured
//! 4. parenthesized bare domains `(example.com)`, stripped but NOT captured
//! 5. remaining `http(s)://` tokens, stripped and captured
//! 6. domains after a cue word ("from", "source:", "found on", "via"),
//!    captured as `https://<domain>` while the text is left untouched
//!
//! The whole pipeline is re-applied until the text stops changing, so the
//! output is a fixed point: sanitizing clean text never alters it.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashSet;

/// Value used when no answer could be located
pub const NOT_FOUND: &str = "Not Found";

lazy_static! {
	static ref SOURCE_CITATION: Regex =
		Regex::new(r"(?i)\(\s*source:\s*(https?://[^\s)]+)\s*\)").unwrap();
	static ref MARKDOWN_LINK: Regex =
		Regex::new(r#"\[([^\]]*)\]\(\s*([^)\s]+)(?:\s+"[^"]*")?\s*\)"#).unwrap();
	static ref PAREN_URL: Regex = Regex::new(r"\((https?://[^\s)]+)\)").unwrap();
	static ref PAREN_DOMAIN: Regex = Regex::new(r"\([a-zA-Z0-9.-]+\.[a-zA-Z]{2,}\)").unwrap();
	static ref BARE_URL: Regex =
		Regex::new(r#"https?://[^\s<>"'()\[\]]*[^\s<>"'()\[\].,;:!?]"#).unwrap();
	static ref CUE_DOMAIN: Regex = Regex::new(
		r"(?i)\b(?:from|source:|found on|via)\s+((?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,})\b"
	)
	.unwrap();
	static ref SOLE_URL: Regex =
		Regex::new(r#"^https?://[^\s<>"'()\[\]]*[^\s<>"'()\[\].,;:!?]$"#).unwrap();
	static ref EMPTY_PARENS: Regex = Regex::new(r"\(\s*\)").unwrap();
	static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
	static ref REPEATED_PERIODS: Regex = Regex::new(r"(?:\s*\.){2,}").unwrap();
	static ref REPEATED_COMMAS: Regex = Regex::new(r"(?:\s*,){2,}").unwrap();
	static ref SPACE_BEFORE_PUNCT: Regex = Regex::new(r"\s+([.,!?;:)])").unwrap();
	static ref TRAILING_OPEN_PAREN: Regex = Regex::new(r"\s*\($").unwrap();
	static ref LEADING_CLOSE_PAREN: Regex = Regex::new(r"^\)\s*").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
	pub clean_text: String,
	pub extracted_urls: Vec<String>,
}

impl Sanitized {
	pub fn is_not_found(&self) -> bool {
		self.clean_text == NOT_FOUND
	}
}

/// Strip citation markup and URLs from model output
pub fn sanitize(raw: &str) -> Sanitized {
	let mut urls = Vec::new();
	let mut text = raw.to_string();

	// Passes only remove or normalize text, so this settles
	loop {
		let next = single_pass(&text, &mut urls);
		if next == text {
			break;
		}
		text = next;
	}

	let clean_text = if text.trim().is_empty() {
		NOT_FOUND.to_string()
	} else {
		text
	};

	Sanitized {
		clean_text,
		extracted_urls: dedupe_urls(urls),
	}
}

/// Order-preserving de-duplication
pub fn dedupe_urls<I, S>(urls: I) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut seen = HashSet::new();
	urls.into_iter()
		.map(Into::into)
		.filter(|url: &String| !url.is_empty() && seen.insert(url.clone()))
		.collect()
}

/// The answer itself is a single URL (a "website" cell, typically)
pub fn sole_url(raw: &str) -> Option<String> {
	let candidate = raw.trim().trim_end_matches('.');
	if SOLE_URL.is_match(candidate) && url::Url::parse(candidate).is_ok() {
		Some(candidate.to_string())
	} else {
		None
	}
}

fn single_pass(text: &str, urls: &mut Vec<String>) -> String {
	let text = strip_capturing(&SOURCE_CITATION, text, 1, urls);
	let text = strip_capturing(&MARKDOWN_LINK, &text, 2, urls);
	let text = strip_capturing(&PAREN_URL, &text, 1, urls);
	// Ambiguous: a bare domain is not recorded as a source here
	let text = PAREN_DOMAIN.replace_all(&text, "").into_owned();
	let text = strip_capturing(&BARE_URL, &text, 0, urls);
	collect_cue_domains(&text, urls);
	tidy(&text)
}

fn strip_capturing(pattern: &Regex, text: &str, group: usize, urls: &mut Vec<String>) -> String {
	pattern
		.replace_all(text, |caps: &Captures| {
			if let Some(url) = caps.get(group) {
				urls.push(url.as_str().trim().to_string());
			}
			String::new()
		})
		.into_owned()
}

fn collect_cue_domains(text: &str, urls: &mut Vec<String>) {
	for caps in CUE_DOMAIN.captures_iter(text) {
		let Some(domain) = caps.get(1) else {
			continue;
		};
		// "from jane.doe@acme.com" names a mailbox, not a site
		if text[domain.end()..].starts_with('@') {
			continue;
		}
		urls.push(format!("https://{}", domain.as_str().to_lowercase()));
	}
}

/// Whitespace and punctuation repair after removals
fn tidy(text: &str) -> String {
	let mut text = text.to_string();
	while EMPTY_PARENS.is_match(&text) {
		text = EMPTY_PARENS.replace_all(&text, " ").into_owned();
	}
	let text = WHITESPACE.replace_all(&text, " ");
	let text = REPEATED_PERIODS.replace_all(&text, ".");
	let text = REPEATED_COMMAS.replace_all(&text, ",");
	let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
	let text = text.trim();
	let text = TRAILING_OPEN_PAREN.replace(text, "");
	let text = LEADING_CLOSE_PAREN.replace(&text, "");
	text.trim().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn urls(result: &Sanitized) -> Vec<&str> {
		result.extracted_urls.iter().map(String::as_str).collect()
	}

	#[test]
	fn test_markdown_link_and_citation_deduplicated() {
		let result = sanitize("Acme's site is [here](https://acme.com) (Source: https://acme.com)");
		assert_eq!(result.clean_text, "Acme's site is");
		assert_eq!(urls(&result), vec!["https://acme.com"]);
	}

	#[test]
	fn test_priority_order() {
		let result =
			sanitize("See https://c.com and [b](https://b.com) (Source: https://a.com) via d.io");
		assert_eq!(
			urls(&result),
			vec!["https://a.com", "https://b.com", "https://c.com", "https://d.io"]
		);
		assert_eq!(result.clean_text, "See and via d.io");
	}

	#[test]
	fn test_markdown_title_is_dropped() {
		let result = sanitize(r#"Call [the office](https://acme.com/contact "Contact us") today"#);
		assert_eq!(result.clean_text, "Call today");
		assert_eq!(urls(&result), vec!["https://acme.com/contact"]);
	}

	#[test]
	fn test_parenthesized_url() {
		let result = sanitize("1-800-555-0123 (https://acme.com/contact)");
		assert_eq!(result.clean_text, "1-800-555-0123");
		assert_eq!(urls(&result), vec!["https://acme.com/contact"]);
	}

	#[test]
	fn test_parenthesized_domain_is_stripped_without_capture() {
		let result = sanitize("Acme Corp (acme.com)");
		assert_eq!(result.clean_text, "Acme Corp");
		assert!(result.extracted_urls.is_empty());
	}

	#[test]
	fn test_cue_word_domain_is_captured_and_kept() {
		let result = sanitize("Founded in 1999, according to data from Crunchbase.com.");
		assert_eq!(
			result.clean_text,
			"Founded in 1999, according to data from Crunchbase.com."
		);
		assert_eq!(urls(&result), vec!["https://crunchbase.com"]);

		let result = sanitize("Listed on the directory, found on yellowpages.com");
		assert_eq!(urls(&result), vec!["https://yellowpages.com"]);
	}

	#[test]
	fn test_domain_asymmetry_between_parens_and_cue_words() {
		// Same domain, different treatment depending on how it is mentioned
		let parenthesized = sanitize("Acme (acme.com)");
		let cued = sanitize("Acme via acme.com");
		assert!(parenthesized.extracted_urls.is_empty());
		assert_eq!(urls(&cued), vec!["https://acme.com"]);
	}

	#[test]
	fn test_email_after_cue_word_is_not_a_domain() {
		let result = sanitize("Reach out to sales from jane.doe@acme.com");
		assert!(result.extracted_urls.is_empty());
		assert_eq!(result.clean_text, "Reach out to sales from jane.doe@acme.com");
	}

	#[test]
	fn test_trailing_punctuation_stays_out_of_url() {
		let result = sanitize("Visit https://acme.com/contact.");
		assert_eq!(urls(&result), vec!["https://acme.com/contact"]);
		assert_eq!(result.clean_text, "Visit.");
	}

	#[test]
	fn test_punctuation_repair() {
		let result = sanitize("The answer is 42 ([source](https://x.com)).");
		assert_eq!(result.clean_text, "The answer is 42.");

		let result = sanitize("Acme, [link](https://x.com), Inc");
		assert_eq!(result.clean_text, "Acme, Inc");

		assert_eq!(sanitize("Acme Corp (").clean_text, "Acme Corp");
		assert_eq!(sanitize(") Acme").clean_text, "Acme");
	}

	#[test]
	fn test_empty_result_is_sentinel() {
		let result = sanitize("[](https://acme.com)");
		assert_eq!(result.clean_text, NOT_FOUND);
		assert!(result.is_not_found());
		assert_eq!(urls(&result), vec!["https://acme.com"]);

		assert_eq!(sanitize("   \n\t ").clean_text, NOT_FOUND);
		assert_eq!(sanitize("").clean_text, NOT_FOUND);
	}

	#[test]
	fn test_idempotent_on_own_output() {
		let corpus = [
			"Acme's site is [here](https://acme.com) (Source: https://acme.com)",
			"See https://c.com and [b](https://b.com) (Source: https://a.com) via d.io",
			"Acme (acme .com) is listed",
			"Phone: 1-800-555-0123 . . (https://acme.com)",
			"info@acme.com , , (Source: https://acme.com/contact)",
			"Not Found",
			"Plain answer with no markup",
			"... [x](y) ((https://a.b)) https://z.io/path?q=1, done",
			"",
		];
		let nested = format!("Acme {}https://acme.com{}", "(".repeat(12), ")".repeat(12));
		let corpus = corpus.iter().copied().chain([nested.as_str()]);

		for raw in corpus {
			let first = sanitize(raw);
			let second = sanitize(&first.clean_text);
			assert_eq!(second.clean_text, first.clean_text, "input: {:?}", raw);
			for url in &second.extracted_urls {
				assert!(
					first.extracted_urls.contains(url),
					"second pass found new url {} for {:?}",
					url,
					raw
				);
			}
		}

		assert_eq!(sanitize(&nested).clean_text, "Acme");
	}

	#[test]
	fn test_deterministic() {
		let raw = "Acme [a](https://a.com) https://b.com via c.com (d.com)";
		assert_eq!(sanitize(raw), sanitize(raw));
	}

	#[test]
	fn test_dedupe_urls_preserves_order() {
		let merged = dedupe_urls(vec!["https://b.com", "https://a.com", "https://b.com", ""]);
		assert_eq!(merged, vec!["https://b.com", "https://a.com"]);
	}

	#[test]
	fn test_sole_url() {
		assert_eq!(
			sole_url(" https://www.riotgames.com "),
			Some("https://www.riotgames.com".to_string())
		);
		assert_eq!(
			sole_url("https://acme.com/about."),
			Some("https://acme.com/about".to_string())
		);
		assert_eq!(sole_url("Acme https://acme.com"), None);
		assert_eq!(sole_url("acme.com"), None);
	}
}
