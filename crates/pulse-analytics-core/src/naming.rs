// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Property name conversion.

use serde::{Deserialize, Serialize};

/// How custom property names are rewritten before they go on the wire.
///
/// Word boundaries are lower-to-upper case transitions and the separators
/// `_`, `-`, `.` and space. `FirstName`, `first_name` and `first-name` all
/// split into `first` + `name`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameFormat {
	/// Keep names exactly as given.
	#[default]
	AsIs,
	/// `first.name`
	Dotted,
	/// `first_name`
	Underscored,
	/// `First name`
	SentenceCase,
	/// `First Name`
	TitleCase,
	/// `first name`
	LowerCase,
}

impl NameFormat {
	pub fn apply(&self, name: &str) -> String {
		if *self == NameFormat::AsIs {
			return name.to_string();
		}

		let words = split_words(name);
		if words.is_empty() {
			return name.to_string();
		}

		match self {
			NameFormat::AsIs => name.to_string(),
			NameFormat::Dotted => join_lower(&words, "."),
			NameFormat::Underscored => join_lower(&words, "_"),
			NameFormat::LowerCase => join_lower(&words, " "),
			NameFormat::TitleCase => words
				.iter()
				.map(|w| capitalize(w))
				.collect::<Vec<_>>()
				.join(" "),
			NameFormat::SentenceCase => {
				let mut out = capitalize(&words[0]);
				for word in &words[1..] {
					out.push(' ');
					out.push_str(&word.to_lowercase());
				}
				out
			}
		}
	}
}

fn split_words(name: &str) -> Vec<String> {
	let mut words = Vec::new();
	let mut current = String::new();
	let mut prev_lower = false;

	for c in name.chars() {
		if matches!(c, '_' | '-' | '.' | ' ') {
			if !current.is_empty() {
				words.push(std::mem::take(&mut current));
			}
			prev_lower = false;
			continue;
		}
		if c.is_uppercase() && prev_lower && !current.is_empty() {
			words.push(std::mem::take(&mut current));
		}
		prev_lower = c.is_lowercase() || c.is_ascii_digit();
		current.push(c);
	}
	if !current.is_empty() {
		words.push(current);
	}
	words
}

fn join_lower(words: &[String], sep: &str) -> String {
	words
		.iter()
		.map(|w| w.to_lowercase())
		.collect::<Vec<_>>()
		.join(sep)
}

fn capitalize(word: &str) -> String {
	let mut chars = word.chars();
	match chars.next() {
		Some(first) => first
			.to_uppercase()
			.chain(chars.flat_map(char::to_lowercase))
			.collect(),
		None => String::new(),
	}
}
