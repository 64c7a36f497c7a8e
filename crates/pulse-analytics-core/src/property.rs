// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Semantic property identifiers.
//!
//! A [`PropertyId`] names a property by meaning ("the distinct id") rather
//! than by its wire spelling, which differs between message kinds
//! (`distinct_id` on events, `$distinct_id` on profile updates).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A property with message-kind specific wire handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyId {
	Token,
	DistinctId,
	Event,
	Time,
	Ip,
	IgnoreTime,
	InsertId,
	Alias,
	Amount,
	PropertyNames,
}

impl PropertyId {
	/// Identifiers recognized when they appear as keys in loose input.
	///
	/// `Event`, `Alias`, `Amount` and `PropertyNames` are only ever supplied
	/// at the call site, so a user property called `amount` stays custom.
	pub const RECOGNIZED: [PropertyId; 6] = [
		PropertyId::Token,
		PropertyId::DistinctId,
		PropertyId::Time,
		PropertyId::Ip,
		PropertyId::IgnoreTime,
		PropertyId::InsertId,
	];

	/// Canonical snake_case name, used in logs and error messages.
	pub fn as_str(&self) -> &'static str {
		match self {
			PropertyId::Token => "token",
			PropertyId::DistinctId => "distinct_id",
			PropertyId::Event => "event",
			PropertyId::Time => "time",
			PropertyId::Ip => "ip",
			PropertyId::IgnoreTime => "ignore_time",
			PropertyId::InsertId => "insert_id",
			PropertyId::Alias => "alias",
			PropertyId::Amount => "amount",
			PropertyId::PropertyNames => "property_names",
		}
	}

	/// Resolves a raw input key to a recognized identifier.
	///
	/// Matching ignores a leading `$`, underscores and case, so
	/// `distinct_id`, `$distinct_id`, `DistinctId` and `distinctId` all
	/// resolve to [`PropertyId::DistinctId`].
	pub fn from_raw_name(name: &str) -> Option<PropertyId> {
		let normalized: String = name
			.strip_prefix('$')
			.unwrap_or(name)
			.chars()
			.filter(|c| *c != '_')
			.flat_map(char::to_lowercase)
			.collect();

		Self::RECOGNIZED
			.into_iter()
			.find(|id| id.as_str().replace('_', "") == normalized)
	}
}

impl fmt::Display for PropertyId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Key of an extracted property: either a recognized identifier or a custom
/// name (already converted with the configured name format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
	Special(PropertyId),
	Custom(String),
}

impl PropertyKey {
	pub fn is_special(&self) -> bool {
		matches!(self, PropertyKey::Special(_))
	}
}

impl From<PropertyId> for PropertyKey {
	fn from(id: PropertyId) -> Self {
		PropertyKey::Special(id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn resolves_common_spellings() {
		for raw in ["distinct_id", "$distinct_id", "DistinctId", "distinctId"] {
			assert_eq!(PropertyId::from_raw_name(raw), Some(PropertyId::DistinctId), "{raw}");
		}
		assert_eq!(PropertyId::from_raw_name("$time"), Some(PropertyId::Time));
		assert_eq!(PropertyId::from_raw_name("IP"), Some(PropertyId::Ip));
		assert_eq!(PropertyId::from_raw_name("ignore_time"), Some(PropertyId::IgnoreTime));
		assert_eq!(PropertyId::from_raw_name("$insert_id"), Some(PropertyId::InsertId));
		assert_eq!(PropertyId::from_raw_name("token"), Some(PropertyId::Token));
	}

	#[test]
	fn call_site_identifiers_are_not_recognized() {
		assert_eq!(PropertyId::from_raw_name("event"), None);
		assert_eq!(PropertyId::from_raw_name("amount"), None);
		assert_eq!(PropertyId::from_raw_name("alias"), None);
		assert_eq!(PropertyId::from_raw_name("plan"), None);
	}

	proptest! {
		#[test]
		fn custom_names_never_resolve(name in "custom_[a-z]{1,12}") {
			prop_assert_eq!(PropertyId::from_raw_name(&name), None);
		}
	}
}
