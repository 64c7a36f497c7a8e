// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pulse analytics client.
//!
//! Turns loose property bags into event and profile messages for a
//! Mixpanel-compatible ingestion service and sends them in batches.
//!
//! # Features
//!
//! - **Loose input**: anything implementing [`Extractable`], including maps,
//!   `serde_json` values and serializable structs via [`Serialized`]
//! - **Precedence**: call-site values beat the property bag, which beats
//!   super properties
//! - **Batching**: at most [`MAX_BATCH_SIZE`] messages per request, with
//!   per-batch success reporting
//! - **Blocking or async**: pluggable [`Transport`] and [`AsyncTransport`]
//!
//! # Example
//!
//! ```no_run
//! use pulse_analytics::{Client, MessageRequest, Properties};
//!
//! # fn main() -> pulse_analytics::Result<()> {
//! let client = Client::builder().token("project-token").build()?;
//!
//! let profile = Properties::new().insert("name", "Ada").insert("plan", "pro");
//! let messages: Vec<_> = [
//!     MessageRequest::track("signup").distinct_id("user-123"),
//!     MessageRequest::people_set("user-123").properties(&profile),
//! ]
//! .iter()
//! .filter_map(|request| client.message(request))
//! .collect();
//!
//! let result = client.send(messages);
//! for batch in &result.failed_batches {
//!     eprintln!("{} messages were rejected", batch.len());
//! }
//! # Ok(())
//! # }
//! ```

mod assemble;
mod batch;
mod client;
mod config;
mod dispatch;
mod error;
mod message;
mod properties;
mod request;
mod rules;
mod send;
mod transport;

pub use batch::{partition, Partition, MAX_BATCH_SIZE};
pub use client::{Client, ClientBuilder, API_KEY_ENV, BASE_URL_ENV, TOKEN_ENV};
pub use config::{
	load_env, ApiKey, Config, DataResidency, ErrorLog, IpAddressHandling, JsonSerializer,
	SerdeJsonSerializer, DEFAULT_REQUEST_TIMEOUT,
};
pub use dispatch::Endpoint;
pub use error::{AnalyticsError, Result, TransportError};
pub use message::{Message, MessageTest};
pub use properties::Properties;
pub use request::MessageRequest;
pub use send::SendResult;
pub use transport::{AsyncHttpTransport, AsyncTransport, HttpTransport, Transport};

// Re-export core types for convenience
pub use pulse_analytics_core::{
	Category, ExtractError, Extractable, MessageKind, NameFormat, PropertyId, PropertyKey, RawValue,
	Serialized, ToRawValue,
};
