// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client configuration.
//!
//! Every setting is optional on [`Config`]. The client resolves each one at
//! construction time in this order:
//!
//! 1. the instance config passed to [`ClientBuilder::config`]
//! 2. the host-wide defaults passed to [`ClientBuilder::defaults`]
//! 3. the built-in default
//!
//! [`ClientBuilder::config`]: crate::ClientBuilder::config
//! [`ClientBuilder::defaults`]: crate::ClientBuilder::defaults

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::{env, fs};

use pulse_analytics_core::NameFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroize;

use crate::error::{AnalyticsError, Result};
use crate::transport::{AsyncHttpTransport, AsyncTransport, HttpTransport, Transport};

/// Default timeout of the built-in HTTP transports.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Renders a canonical value as JSON text.
pub trait JsonSerializer: Send + Sync {
	fn serialize(&self, value: &Value) -> Result<String>;
}

/// The built-in serializer, backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJsonSerializer;

impl JsonSerializer for SerdeJsonSerializer {
	fn serialize(&self, value: &Value) -> Result<String> {
		Ok(serde_json::to_string(value)?)
	}
}

/// Receives message build failures.
pub trait ErrorLog: Send + Sync {
	fn log(&self, message: &str, error: &AnalyticsError);
}

impl<F> ErrorLog for F
where
	F: Fn(&str, &AnalyticsError) + Send + Sync,
{
	fn log(&self, message: &str, error: &AnalyticsError) {
		self(message, error)
	}
}

/// Whether the service should derive geolocation from the request IP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpAddressHandling {
	/// Send no `ip` query parameter.
	#[default]
	None,
	/// `?ip=1`
	UseRequestIp,
	/// `?ip=0`
	IgnoreRequestIp,
}

impl IpAddressHandling {
	pub(crate) fn query(&self) -> Option<&'static str> {
		match self {
			IpAddressHandling::None => None,
			IpAddressHandling::UseRequestIp => Some("ip=1"),
			IpAddressHandling::IgnoreRequestIp => Some("ip=0"),
		}
	}
}

/// Where data is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataResidency {
	#[default]
	Us,
	Eu,
	/// A custom base URL, e.g. an ingestion proxy.
	Custom(String),
}

impl DataResidency {
	/// Returns the base URL without a trailing slash.
	pub fn base_url(&self) -> Result<String> {
		match self {
			DataResidency::Us => Ok("https://api.mixpanel.com".to_string()),
			DataResidency::Eu => Ok("https://api-eu.mixpanel.com".to_string()),
			DataResidency::Custom(url) => {
				let trimmed = url.trim().trim_end_matches('/');
				if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
					return Err(AnalyticsError::InvalidBaseUrl(url.clone()));
				}
				Ok(trimmed.to_string())
			}
		}
	}
}

/// Optional client settings.
#[derive(Clone, Default)]
pub struct Config {
	pub name_format: Option<NameFormat>,
	pub ip_address_handling: Option<IpAddressHandling>,
	pub data_residency: Option<DataResidency>,
	/// Timeout of the built-in transports; ignored by custom transports.
	pub request_timeout: Option<Duration>,
	pub serializer: Option<Arc<dyn JsonSerializer>>,
	pub transport: Option<Arc<dyn Transport>>,
	pub async_transport: Option<Arc<dyn AsyncTransport>>,
	pub error_log: Option<Arc<dyn ErrorLog>>,
}

impl Config {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn name_format(mut self, format: NameFormat) -> Self {
		self.name_format = Some(format);
		self
	}

	pub fn ip_address_handling(mut self, handling: IpAddressHandling) -> Self {
		self.ip_address_handling = Some(handling);
		self
	}

	pub fn data_residency(mut self, residency: DataResidency) -> Self {
		self.data_residency = Some(residency);
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = Some(timeout);
		self
	}

	pub fn serializer(mut self, serializer: impl JsonSerializer + 'static) -> Self {
		self.serializer = Some(Arc::new(serializer));
		self
	}

	pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
		self.transport = Some(Arc::new(transport));
		self
	}

	pub fn async_transport(mut self, transport: impl AsyncTransport + 'static) -> Self {
		self.async_transport = Some(Arc::new(transport));
		self
	}

	pub fn error_log(mut self, log: impl ErrorLog + 'static) -> Self {
		self.error_log = Some(Arc::new(log));
		self
	}

	/// Resolves every setting against `defaults`, then the built-ins.
	pub(crate) fn resolve(&self, defaults: &Config) -> Result<ResolvedConfig> {
		let timeout = self
			.request_timeout
			.or(defaults.request_timeout)
			.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

		let residency = self
			.data_residency
			.clone()
			.or_else(|| defaults.data_residency.clone())
			.unwrap_or_default();

		Ok(ResolvedConfig {
			name_format: self.name_format.or(defaults.name_format).unwrap_or_default(),
			ip_address_handling: self
				.ip_address_handling
				.or(defaults.ip_address_handling)
				.unwrap_or_default(),
			base_url: residency.base_url()?,
			serializer: self
				.serializer
				.clone()
				.or_else(|| defaults.serializer.clone())
				.unwrap_or_else(|| Arc::new(SerdeJsonSerializer)),
			transport: self
				.transport
				.clone()
				.or_else(|| defaults.transport.clone())
				.unwrap_or_else(|| Arc::new(HttpTransport::new(timeout))),
			async_transport: self
				.async_transport
				.clone()
				.or_else(|| defaults.async_transport.clone())
				.unwrap_or_else(|| Arc::new(AsyncHttpTransport::new(timeout))),
			error_log: self.error_log.clone().or_else(|| defaults.error_log.clone()),
		})
	}
}

impl fmt::Debug for Config {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Config")
			.field("name_format", &self.name_format)
			.field("ip_address_handling", &self.ip_address_handling)
			.field("data_residency", &self.data_residency)
			.field("request_timeout", &self.request_timeout)
			.field("serializer", &self.serializer.is_some())
			.field("transport", &self.transport.is_some())
			.field("async_transport", &self.async_transport.is_some())
			.field("error_log", &self.error_log.is_some())
			.finish()
	}
}

/// Settings after resolution; every pluggable has a value.
#[derive(Clone)]
pub(crate) struct ResolvedConfig {
	pub name_format: NameFormat,
	pub ip_address_handling: IpAddressHandling,
	pub base_url: String,
	pub serializer: Arc<dyn JsonSerializer>,
	pub transport: Arc<dyn Transport>,
	pub async_transport: Arc<dyn AsyncTransport>,
	pub error_log: Option<Arc<dyn ErrorLog>>,
}

/// A credential that never shows up in logs and is zeroed on drop.
#[derive(Clone, Zeroize, PartialEq, Eq)]
#[zeroize(drop)]
pub struct ApiKey(String);

impl ApiKey {
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	/// Call sites must opt in to seeing the key.
	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for ApiKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("ApiKey([REDACTED])")
	}
}

impl fmt::Display for ApiKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[REDACTED]")
	}
}

/// Loads a value using the `VAR` / `VAR_FILE` convention.
///
/// `VAR_FILE` wins when set; a single trailing newline is stripped from the
/// file content. Returns `Ok(None)` when neither is set.
pub fn load_env(var: &str) -> Result<Option<String>> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|source| AnalyticsError::SecretEnv {
			var: file_var.clone(),
			path: path.clone(),
			source,
		})?;
		return Ok(Some(
			content.strip_suffix('\n').unwrap_or(&content).to_string(),
		));
	}

	Ok(env::var(var).ok())
}
