// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics client.

use std::path::PathBuf;

use pulse_analytics_core::{ExtractError, MessageKind, PropertyId};
use thiserror::Error;

/// Analytics client errors.
#[derive(Debug, Error)]
pub enum AnalyticsError {
	/// Walking the caller's properties failed.
	#[error("failed to extract properties: {0}")]
	Extract(#[from] ExtractError),

	/// A property value could not be coerced to its wire type.
	#[error("invalid value for {property}: {reason}")]
	InvalidProperty {
		property: PropertyId,
		reason: String,
	},

	/// The message kind cannot be used for this operation.
	#[error("unsupported message kind for {operation}: {kind}")]
	UnsupportedKind {
		operation: &'static str,
		kind: MessageKind,
	},

	/// Rendering a message or batch to JSON failed.
	#[error("serialization error: {0}")]
	Serialization(String),

	/// The transport reported an error instead of a result.
	#[error("transport error: {0}")]
	Transport(#[from] TransportError),

	/// The import endpoint was used without an API key.
	#[error("API key is required for the import endpoint")]
	MissingApiKey,

	/// A custom base URL is empty or not http(s).
	#[error("invalid base URL: {0}")]
	InvalidBaseUrl(String),

	/// Loading a secret from the environment failed.
	#[error("failed to read secret file for {var} at {}: {source}", .path.display())]
	SecretEnv {
		var: String,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

impl From<serde_json::Error> for AnalyticsError {
	fn from(err: serde_json::Error) -> Self {
		AnalyticsError::Serialization(err.to_string())
	}
}

/// Errors raised by a transport instead of a success/failure answer.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("HTTP request failed: {0}")]
	Request(#[from] reqwest::Error),

	#[error("{0}")]
	Other(String),
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
