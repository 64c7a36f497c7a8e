// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The analytics client.

use std::env;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use pulse_analytics_core::{extract, Extractable, MessageKind, PropertyKey, ToRawValue};
use serde_json::Value;
use tracing::{info, warn};

use crate::assemble::{assemble, AssemblyContext};
use crate::batch::partition;
use crate::config::{load_env, ApiKey, Config, DataResidency, ResolvedConfig};
use crate::dispatch::{batch_value, Endpoint};
use crate::error::{AnalyticsError, Result};
use crate::message::{Message, MessageTest};
use crate::request::MessageRequest;
use crate::rules::rule_set;
use crate::send::{self, Route, SendResult};

/// Environment variable holding the project token.
pub const TOKEN_ENV: &str = "PULSE_ANALYTICS_TOKEN";
/// Environment variable holding the API key used by imports.
pub const API_KEY_ENV: &str = "PULSE_ANALYTICS_API_KEY";
/// Environment variable overriding the ingestion base URL.
pub const BASE_URL_ENV: &str = "PULSE_ANALYTICS_BASE_URL";

/// Builder for constructing a [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
	token: Option<String>,
	api_key: Option<ApiKey>,
	config: Config,
	defaults: Config,
	super_properties: Option<Box<dyn Extractable>>,
}

impl ClientBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a builder from `PULSE_ANALYTICS_TOKEN`,
	/// `PULSE_ANALYTICS_API_KEY` and `PULSE_ANALYTICS_BASE_URL`.
	///
	/// The token and API key also honor the `*_FILE` variants.
	pub fn from_env() -> Result<Self> {
		let mut builder = Self::new();
		if let Some(token) = load_env(TOKEN_ENV)? {
			builder = builder.token(token);
		}
		if let Some(key) = load_env(API_KEY_ENV)? {
			builder = builder.api_key(key);
		}
		if let Ok(url) = env::var(BASE_URL_ENV) {
			builder.config = builder.config.data_residency(DataResidency::Custom(url));
		}
		Ok(builder)
	}

	/// Sets the project token carried by every message.
	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());
		self
	}

	/// Sets the API key; only needed for [`Client::import`].
	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.api_key = Some(ApiKey::new(key));
		self
	}

	/// Sets the instance configuration.
	///
	/// Unset fields of `config` fall back to [`ClientBuilder::defaults`].
	pub fn config(mut self, config: Config) -> Self {
		// A base URL from the environment survives unless `config` sets one.
		let residency = self.config.data_residency.take();
		self.config = config;
		if self.config.data_residency.is_none() {
			self.config.data_residency = residency;
		}
		self
	}

	/// Sets the host-wide default configuration.
	pub fn defaults(mut self, defaults: Config) -> Self {
		self.defaults = defaults;
		self
	}

	/// Properties merged into messages built by this client.
	///
	/// They are extracted once, when the client is built.
	pub fn super_properties(mut self, properties: impl Extractable + 'static) -> Self {
		self.super_properties = Some(Box::new(properties));
		self
	}

	/// Builds the client.
	///
	/// Fails on an invalid base URL or super properties that cannot be
	/// extracted.
	pub fn build(self) -> Result<Client> {
		let config = self.config.resolve(&self.defaults)?;

		let super_properties: Vec<(PropertyKey, Value)> = match &self.super_properties {
			Some(properties) => extract(properties.as_ref(), config.name_format)?,
			None => Vec::new(),
		};

		info!(
			base_url = %config.base_url,
			token_set = self.token.is_some(),
			api_key_set = self.api_key.is_some(),
			super_properties = super_properties.len(),
			"analytics client initialized"
		);

		Ok(Client {
			inner: Arc::new(ClientInner {
				token: self.token,
				api_key: self.api_key,
				config,
				super_properties: super_properties.into(),
			}),
		})
	}
}

impl fmt::Debug for ClientBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientBuilder")
			.field("token", &self.token)
			.field("api_key", &self.api_key)
			.field("config", &self.config)
			.field("defaults", &self.defaults)
			.field("super_properties", &self.super_properties.is_some())
			.finish()
	}
}

struct ClientInner {
	token: Option<String>,
	api_key: Option<ApiKey>,
	config: ResolvedConfig,
	super_properties: Arc<[(PropertyKey, Value)]>,
}

/// Builds and sends analytics messages.
///
/// Cheap to clone; clones share configuration and super properties.
///
/// # Example
///
/// ```no_run
/// use pulse_analytics::{Client, MessageRequest, Properties};
///
/// # fn main() -> pulse_analytics::Result<()> {
/// let client = Client::builder()
///     .token("project-token")
///     .super_properties(Properties::new().insert("app_version", "1.4.0"))
///     .build()?;
///
/// let props = Properties::new().insert("plan", "pro");
/// let sent = client.send_one(&MessageRequest::track("signup").distinct_id("user-123").properties(&props));
/// # let _ = sent;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
	inner: Arc<ClientInner>,
}

impl Client {
	/// Creates a new builder for constructing a Client.
	pub fn builder() -> ClientBuilder {
		ClientBuilder::new()
	}

	pub fn token(&self) -> Option<&str> {
		self.inner.token.as_deref()
	}

	/// The super properties as extracted at construction.
	pub fn super_properties(&self) -> &[(PropertyKey, Value)] {
		&self.inner.super_properties
	}

	/// Builds a message, returning the failure.
	pub fn try_message(&self, request: &MessageRequest<'_>) -> Result<Message> {
		let kind = request.kind();
		let rules = rule_set(kind).ok_or(AnalyticsError::UnsupportedKind {
			operation: "message",
			kind,
		})?;
		let ctx = AssemblyContext {
			token: self.token(),
			super_properties: &self.inner.super_properties,
			name_format: self.inner.config.name_format,
		};
		let properties = request.user_properties().map(|p| p as &dyn Extractable);
		let data = assemble(rules, &ctx, properties, request.extra(), Utc::now())?;
		Ok(Message::new(kind, data))
	}

	/// Builds a message. Failures are logged and yield `None`.
	pub fn message(&self, request: &MessageRequest<'_>) -> Option<Message> {
		match self.try_message(request) {
			Ok(message) => Some(message),
			Err(e) => {
				self.report_build_failure(request.kind(), &e);
				None
			}
		}
	}

	/// Builds and renders a message without sending it.
	pub fn test(&self, request: &MessageRequest<'_>) -> MessageTest {
		match self.try_message(request) {
			Ok(message) => MessageTest::render(
				message.kind(),
				Value::Object(message.into_data()),
				self.inner.config.serializer.as_ref(),
			),
			Err(e) => MessageTest::failed(request.kind(), e),
		}
	}

	/// Builds and sends one message. Returns whether it was accepted.
	pub fn send_one(&self, request: &MessageRequest<'_>) -> bool {
		match self.message(request) {
			Some(message) => self.send([message]).success,
			None => false,
		}
	}

	pub async fn send_one_async(&self, request: &MessageRequest<'_>) -> bool {
		match self.message(request) {
			Some(message) => self.send_async([message]).await.success,
			None => false,
		}
	}

	/// Sends an event.
	pub fn track<E: Extractable + Sync>(&self, event: &str, distinct_id: impl ToRawValue, properties: &E) -> bool {
		self.send_one(
			&MessageRequest::track(event)
				.distinct_id(distinct_id)
				.properties(properties),
		)
	}

	pub async fn track_async<E: Extractable + Sync>(
		&self,
		event: &str,
		distinct_id: impl ToRawValue,
		properties: &E,
	) -> bool {
		let request = MessageRequest::track(event)
			.distinct_id(distinct_id)
			.properties(properties);
		self.send_one_async(&request).await
	}

	/// Sends historical events to the import endpoint.
	///
	/// Requires an API key; engage-like messages still go to the engage
	/// endpoint.
	pub fn import(&self, messages: impl IntoIterator<Item = Message>) -> Result<SendResult> {
		let route = self.import_route()?;
		Ok(send::send(&self.inner.config, route, messages))
	}

	pub async fn import_async(&self, messages: impl IntoIterator<Item = Message>) -> Result<SendResult> {
		let route = self.import_route()?;
		Ok(send::send_async(&self.inner.config, route, messages).await)
	}

	/// Sends messages in batches, track-like first.
	pub fn send(&self, messages: impl IntoIterator<Item = Message>) -> SendResult {
		send::send(&self.inner.config, Route::DEFAULT, messages)
	}

	pub async fn send_async(&self, messages: impl IntoIterator<Item = Message>) -> SendResult {
		send::send_async(&self.inner.config, Route::DEFAULT, messages).await
	}

	/// Renders the batches [`Client::send`] would dispatch, one
	/// [`MessageTest`] per batch.
	pub fn send_test(&self, messages: impl IntoIterator<Item = Message>) -> Vec<MessageTest> {
		let partition = partition(messages);
		partition
			.track
			.iter()
			.chain(partition.engage.iter())
			.map(|batch| {
				MessageTest::render(
					MessageKind::Batch,
					batch_value(batch),
					self.inner.config.serializer.as_ref(),
				)
			})
			.collect()
	}

	fn import_route(&self) -> Result<Route<'_>> {
		let key = self.inner.api_key.as_ref().ok_or(AnalyticsError::MissingApiKey)?;
		Ok(Route {
			track: Endpoint::Import,
			api_key: Some(key.expose()),
		})
	}

	fn report_build_failure(&self, kind: MessageKind, error: &AnalyticsError) {
		warn!(kind = %kind, error = %error, "failed to build message");
		if let Some(log) = &self.inner.config.error_log {
			log.log(&format!("failed to build {kind} message"), error);
		}
	}
}

impl fmt::Debug for Client {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Client")
			.field("token", &self.inner.token)
			.field("api_key", &self.inner.api_key)
			.field("base_url", &self.inner.config.base_url)
			.field("super_properties", &self.inner.super_properties.len())
			.finish()
	}
}
