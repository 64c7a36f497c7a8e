// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Message kinds and their routing categories.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
	Track,
	Alias,
	PeopleSet,
	PeopleSetOnce,
	PeopleAdd,
	PeopleAppend,
	PeopleUnion,
	PeopleUnset,
	PeopleDelete,
	PeopleTrackCharge,
	/// A whole batch, only produced by batch introspection.
	Batch,
}

/// Destination category of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
	/// Event ingestion.
	Track,
	/// Profile updates.
	Engage,
}

impl MessageKind {
	/// Returns the routing category, or `None` for [`MessageKind::Batch`].
	pub fn category(&self) -> Option<Category> {
		match self {
			MessageKind::Track | MessageKind::Alias => Some(Category::Track),
			MessageKind::PeopleSet
			| MessageKind::PeopleSetOnce
			| MessageKind::PeopleAdd
			| MessageKind::PeopleAppend
			| MessageKind::PeopleUnion
			| MessageKind::PeopleUnset
			| MessageKind::PeopleDelete
			| MessageKind::PeopleTrackCharge => Some(Category::Engage),
			MessageKind::Batch => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			MessageKind::Track => "track",
			MessageKind::Alias => "alias",
			MessageKind::PeopleSet => "people_set",
			MessageKind::PeopleSetOnce => "people_set_once",
			MessageKind::PeopleAdd => "people_add",
			MessageKind::PeopleAppend => "people_append",
			MessageKind::PeopleUnion => "people_union",
			MessageKind::PeopleUnset => "people_unset",
			MessageKind::PeopleDelete => "people_delete",
			MessageKind::PeopleTrackCharge => "people_track_charge",
			MessageKind::Batch => "batch",
		}
	}
}

impl fmt::Display for MessageKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
