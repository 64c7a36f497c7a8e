// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Built messages and introspection results.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pulse_analytics_core::{Category, MessageKind};
use serde_json::{Map, Value};

use crate::config::JsonSerializer;
use crate::error::{AnalyticsError, Result};

/// A fully assembled wire message.
///
/// The mapping is fixed at construction; JSON and base64 forms are rendered
/// on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
	kind: MessageKind,
	data: Map<String, Value>,
}

impl Message {
	pub(crate) fn new(kind: MessageKind, data: Map<String, Value>) -> Self {
		Self { kind, data }
	}

	pub fn kind(&self) -> MessageKind {
		self.kind
	}

	/// Routing category; always `Some` for built messages.
	pub fn category(&self) -> Option<Category> {
		self.kind.category()
	}

	/// The canonical property mapping.
	pub fn data(&self) -> &Map<String, Value> {
		&self.data
	}

	pub fn into_data(self) -> Map<String, Value> {
		self.data
	}

	pub fn to_json(&self, serializer: &dyn JsonSerializer) -> Result<String> {
		serializer.serialize(&Value::Object(self.data.clone()))
	}

	pub fn to_base64(&self, serializer: &dyn JsonSerializer) -> Result<String> {
		Ok(encode(&self.to_json(serializer)?))
	}
}

pub(crate) fn encode(json: &str) -> String {
	STANDARD.encode(json)
}

/// Result of building a message (or a batch) purely for inspection.
///
/// Each stage fills in its field; the first failure lands in `error` and the
/// later fields stay `None`.
#[derive(Debug)]
pub struct MessageTest {
	pub kind: MessageKind,
	/// The canonical mapping, or an array of mappings for a batch.
	pub data: Option<Value>,
	pub json: Option<String>,
	pub base64: Option<String>,
	pub error: Option<AnalyticsError>,
}

impl MessageTest {
	pub(crate) fn failed(kind: MessageKind, error: AnalyticsError) -> Self {
		Self {
			kind,
			data: None,
			json: None,
			base64: None,
			error: Some(error),
		}
	}

	/// Renders `data` and records every stage that succeeds.
	pub(crate) fn render(kind: MessageKind, data: Value, serializer: &dyn JsonSerializer) -> Self {
		let mut test = Self {
			kind,
			data: None,
			json: None,
			base64: None,
			error: None,
		};
		match serializer.serialize(&data) {
			Ok(json) => {
				test.base64 = Some(encode(&json));
				test.json = Some(json);
			}
			Err(e) => test.error = Some(e),
		}
		test.data = Some(data);
		test
	}

	pub fn is_ok(&self) -> bool {
		self.error.is_none()
	}
}
