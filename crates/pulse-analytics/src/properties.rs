// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Helper for building event and profile properties.

use pulse_analytics_core::{Extractable, RawValue, ToRawValue};

/// An ordered property bag.
///
/// Entries keep insertion order; when the same name is inserted twice both
/// entries are kept and the later one wins once the message is assembled.
///
/// # Example
///
/// ```
/// use pulse_analytics::Properties;
///
/// let props = Properties::new()
///     .insert("button_name", "checkout")
///     .insert("page", "/cart")
///     .insert("price", 99.99)
///     .insert("is_premium", true);
/// assert_eq!(props.len(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
	entries: Vec<(String, RawValue)>,
}

impl Properties {
	/// Creates a new empty Properties builder.
	pub fn new() -> Self {
		Self {
			entries: Vec::new(),
		}
	}

	/// Appends a key-value pair.
	///
	/// The value can be anything implementing [`ToRawValue`]: strings,
	/// numbers, booleans, timestamps, sequences and nested maps.
	pub fn insert<K, V>(mut self, key: K, value: V) -> Self
	where
		K: Into<String>,
		V: ToRawValue,
	{
		self.entries.push((key.into(), value.to_raw()));
		self
	}

	/// Appends all entries of `other` after this one's.
	pub fn merge(mut self, other: Properties) -> Self {
		self.entries.extend(other.entries);
		self
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Returns the number of entries, counting repeated names.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Gets the last value inserted under `key`.
	pub fn get(&self, key: &str) -> Option<&RawValue> {
		self
			.entries
			.iter()
			.rev()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v)
	}
}

impl Extractable for Properties {
	fn entries(&self) -> pulse_analytics_core::Result<Vec<(String, RawValue)>> {
		Ok(self.entries.clone())
	}
}

impl<K: Into<String>, V: ToRawValue> FromIterator<(K, V)> for Properties {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			entries: iter
				.into_iter()
				.map(|(k, v)| (k.into(), v.to_raw()))
				.collect(),
		}
	}
}
