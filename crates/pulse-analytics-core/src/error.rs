// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for property extraction.

use thiserror::Error;

/// Errors raised while walking a loosely-typed input.
///
/// Unsupported values are not errors; they are dropped. These variants cover
/// inputs that cannot be walked at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
	#[error("input nesting exceeds {max} levels")]
	TooDeep { max: usize },

	#[error("input is not a key/value container: {0}")]
	NotAContainer(&'static str),

	#[error("failed to walk serialized input: {0}")]
	Serialization(String),
}

impl From<serde_json::Error> for ExtractError {
	fn from(err: serde_json::Error) -> Self {
		ExtractError::Serialization(err.to_string())
	}
}

/// A specialized `Result` type for extraction.
pub type Result<T> = std::result::Result<T, ExtractError>;
