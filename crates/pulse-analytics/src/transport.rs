// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Transports that deliver encoded batches to the ingestion service.
//!
//! A transport answers one question: did the service accept this payload?
//! `Ok(false)` and `Err(_)` both count as a failed batch; the error form only
//! carries more detail for the logs.

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::TransportError;

/// Blocking transport.
pub trait Transport: Send + Sync {
	/// Posts `payload` (base64-encoded JSON) to `url`.
	///
	/// `api_key` is only set for endpoints that require elevated credentials.
	fn post(&self, url: &str, payload: &str, api_key: Option<&str>) -> Result<bool, TransportError>;
}

impl<F> Transport for F
where
	F: Fn(&str, &str, Option<&str>) -> Result<bool, TransportError> + Send + Sync,
{
	fn post(&self, url: &str, payload: &str, api_key: Option<&str>) -> Result<bool, TransportError> {
		self(url, payload, api_key)
	}
}

/// Non-blocking transport, suspended at the network call.
#[async_trait]
pub trait AsyncTransport: Send + Sync {
	async fn post(&self, url: &str, payload: &str, api_key: Option<&str>)
		-> Result<bool, TransportError>;
}

/// Async closures receive owned arguments so the returned future can outlive
/// the call.
#[async_trait]
impl<F, Fut> AsyncTransport for F
where
	F: Fn(String, String, Option<String>) -> Fut + Send + Sync,
	Fut: Future<Output = Result<bool, TransportError>> + Send,
{
	async fn post(
		&self,
		url: &str,
		payload: &str,
		api_key: Option<&str>,
	) -> Result<bool, TransportError> {
		self(url.to_string(), payload.to_string(), api_key.map(str::to_string)).await
	}
}

/// Default blocking transport backed by `reqwest::blocking`.
///
/// The payload is sent as the `data` form field and the API key, when
/// present, as the HTTP basic auth user. The service answers `1` on success.
/// The HTTP client is built on first use.
#[derive(Debug)]
pub struct HttpTransport {
	timeout: Duration,
	client: OnceLock<reqwest::blocking::Client>,
}

impl HttpTransport {
	pub fn new(timeout: Duration) -> Self {
		Self {
			timeout,
			client: OnceLock::new(),
		}
	}

	fn client(&self) -> Result<&reqwest::blocking::Client, TransportError> {
		if let Some(client) = self.client.get() {
			return Ok(client);
		}
		let client = pulse_common_http::blocking_builder()
			.timeout(self.timeout)
			.build()?;
		Ok(self.client.get_or_init(|| client))
	}
}

impl Transport for HttpTransport {
	fn post(&self, url: &str, payload: &str, api_key: Option<&str>) -> Result<bool, TransportError> {
		let mut request = self.client()?.post(url).form(&[("data", payload)]);
		if let Some(key) = api_key {
			request = request.basic_auth(key, None::<&str>);
		}

		let response = request.send()?;
		let status = response.status();
		let body = response.text()?;
		debug!(url = %url, status = status.as_u16(), "ingestion response");

		Ok(accepted(status, &body))
	}
}

/// Default non-blocking transport backed by `reqwest`.
#[derive(Debug)]
pub struct AsyncHttpTransport {
	timeout: Duration,
	client: OnceLock<reqwest::Client>,
}

impl AsyncHttpTransport {
	pub fn new(timeout: Duration) -> Self {
		Self {
			timeout,
			client: OnceLock::new(),
		}
	}

	fn client(&self) -> Result<&reqwest::Client, TransportError> {
		if let Some(client) = self.client.get() {
			return Ok(client);
		}
		let client = pulse_common_http::builder().timeout(self.timeout).build()?;
		Ok(self.client.get_or_init(|| client))
	}
}

#[async_trait]
impl AsyncTransport for AsyncHttpTransport {
	async fn post(
		&self,
		url: &str,
		payload: &str,
		api_key: Option<&str>,
	) -> Result<bool, TransportError> {
		let mut request = self.client()?.post(url).form(&[("data", payload)]);
		if let Some(key) = api_key {
			request = request.basic_auth(key, None::<&str>);
		}

		let response = request.send().await?;
		let status = response.status();
		let body = response.text().await?;
		debug!(url = %url, status = status.as_u16(), "ingestion response");

		Ok(accepted(status, &body))
	}
}

fn accepted(status: reqwest::StatusCode, body: &str) -> bool {
	status.is_success() && body.trim() == "1"
}
