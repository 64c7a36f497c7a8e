// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sending one batch to one endpoint.

use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{IpAddressHandling, JsonSerializer};
use crate::error::Result;
use crate::message::{encode, Message};
use crate::transport::{AsyncTransport, Transport};

/// Ingestion endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
	Track,
	Engage,
	/// Historical events; requires the API key.
	Import,
}

impl Endpoint {
	pub fn path(&self) -> &'static str {
		match self {
			Endpoint::Track => "track",
			Endpoint::Engage => "engage",
			Endpoint::Import => "import",
		}
	}

	pub fn requires_api_key(&self) -> bool {
		matches!(self, Endpoint::Import)
	}

	/// Full URL below `base_url`, with the ip query when configured.
	pub fn url(&self, base_url: &str, ip: IpAddressHandling) -> String {
		match ip.query() {
			Some(query) => format!("{base_url}/{}?{query}", self.path()),
			None => format!("{base_url}/{}", self.path()),
		}
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.path())
	}
}

/// Where and how a batch goes.
#[derive(Clone, Copy)]
pub(crate) struct Target<'a> {
	pub endpoint: Endpoint,
	pub url: &'a str,
	pub api_key: Option<&'a str>,
	pub serializer: &'a dyn JsonSerializer,
}

/// The batch as a JSON array of mappings.
pub(crate) fn batch_value(batch: &[Message]) -> Value {
	Value::Array(
		batch
			.iter()
			.map(|m| Value::Object(m.data().clone()))
			.collect(),
	)
}

/// Serializes and base64-encodes `batch`.
pub(crate) fn render_batch(batch: &[Message], serializer: &dyn JsonSerializer) -> Result<String> {
	let json = serializer.serialize(&batch_value(batch))?;
	Ok(encode(&json))
}

/// Posts `batch` through `transport`.
///
/// Serialization failures are returned and the transport is not called.
/// Transport errors are logged and reported as `Ok(false)`.
pub(crate) fn dispatch(transport: &dyn Transport, target: Target<'_>, batch: &[Message]) -> Result<bool> {
	let payload = render_batch(batch, target.serializer)?;
	debug!(endpoint = %target.endpoint, count = batch.len(), "dispatching batch");

	match Transport::post(transport, target.url, &payload, target.api_key) {
		Ok(accepted) => Ok(accepted),
		Err(e) => {
			warn!(endpoint = %target.endpoint, error = %e, "transport failed");
			Ok(false)
		}
	}
}

pub(crate) async fn dispatch_async(
	transport: &dyn AsyncTransport,
	target: Target<'_>,
	batch: &[Message],
) -> Result<bool> {
	let payload = render_batch(batch, target.serializer)?;
	debug!(endpoint = %target.endpoint, count = batch.len(), "dispatching batch");

	match AsyncTransport::post(transport, target.url, &payload, target.api_key).await {
		Ok(accepted) => Ok(accepted),
		Err(e) => {
			warn!(endpoint = %target.endpoint, error = %e, "transport failed");
			Ok(false)
		}
	}
}
