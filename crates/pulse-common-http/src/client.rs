// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP client builders with a consistent User-Agent header.

use std::env::consts::{ARCH, OS};

use reqwest::{blocking, ClientBuilder};

/// Creates an async HTTP client builder with the standard User-Agent header.
///
/// # Example
/// ```ignore
/// let client = pulse_common_http::builder()
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	reqwest::Client::builder().user_agent(user_agent())
}

/// Creates a blocking HTTP client builder with the standard User-Agent header.
///
/// The blocking client owns a private runtime. Build it outside of async
/// contexts.
pub fn blocking_builder() -> blocking::ClientBuilder {
	blocking::Client::builder().user_agent(user_agent())
}

/// Returns the standard User-Agent string.
///
/// Format: `pulse-analytics/{os}-{arch}/{version}`
pub fn user_agent() -> String {
	format!(
		"pulse-analytics/{}-{}/{}",
		OS,
		ARCH,
		env!("CARGO_PKG_VERSION")
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		assert!(ua.starts_with("pulse-analytics/"));
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 3);
		assert_eq!(parts[2], env!("CARGO_PKG_VERSION"));
	}

	#[test]
	fn async_builder_builds() {
		assert!(builder().build().is_ok());
	}
}
