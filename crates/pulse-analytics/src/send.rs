// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Send orchestration: partition, dispatch each batch, collect outcomes.

use tracing::warn;

use crate::batch::partition;
use crate::config::ResolvedConfig;
use crate::dispatch::{dispatch, dispatch_async, Endpoint, Target};
use crate::message::Message;

/// Outcome of one send call.
///
/// Every dispatched batch lands in exactly one of the two lists, with its
/// messages in input order, so failed batches can be resubmitted as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendResult {
	/// True when every batch was accepted; vacuously true for no batches.
	pub success: bool,
	pub sent_batches: Vec<Vec<Message>>,
	pub failed_batches: Vec<Vec<Message>>,
}

impl SendResult {
	fn new() -> Self {
		Self {
			success: true,
			..Self::default()
		}
	}

	fn record(&mut self, batch: Vec<Message>, accepted: bool) {
		if accepted {
			self.sent_batches.push(batch);
		} else {
			self.success = false;
			self.failed_batches.push(batch);
		}
	}

	pub fn failed_messages(&self) -> impl Iterator<Item = &Message> {
		self.failed_batches.iter().flatten()
	}
}

/// Endpoint routing and credentials for one send call.
#[derive(Clone, Copy)]
pub(crate) struct Route<'a> {
	/// Endpoint for track-like batches; engage-like batches always go to
	/// [`Endpoint::Engage`].
	pub track: Endpoint,
	pub api_key: Option<&'a str>,
}

impl Route<'static> {
	pub(crate) const DEFAULT: Self = Route {
		track: Endpoint::Track,
		api_key: None,
	};
}

fn routed(
	config: &ResolvedConfig,
	route: Route<'_>,
	messages: impl IntoIterator<Item = Message>,
) -> Vec<(Endpoint, String, Vec<Message>)> {
	let partition = partition(messages);
	let track_url = route.track.url(&config.base_url, config.ip_address_handling);
	let engage_url = Endpoint::Engage.url(&config.base_url, config.ip_address_handling);

	let track = partition
		.track
		.into_iter()
		.map(|batch| (route.track, track_url.clone(), batch));
	let engage = partition
		.engage
		.into_iter()
		.map(|batch| (Endpoint::Engage, engage_url.clone(), batch));
	track.chain(engage).collect()
}

fn target<'a>(
	config: &'a ResolvedConfig,
	route: Route<'a>,
	endpoint: Endpoint,
	url: &'a str,
) -> Target<'a> {
	Target {
		endpoint,
		url,
		api_key: if endpoint.requires_api_key() {
			route.api_key
		} else {
			None
		},
		serializer: config.serializer.as_ref(),
	}
}

/// Dispatches track batches, then engage batches, in input order.
pub(crate) fn send(
	config: &ResolvedConfig,
	route: Route<'_>,
	messages: impl IntoIterator<Item = Message>,
) -> SendResult {
	let mut result = SendResult::new();
	for (endpoint, url, batch) in routed(config, route, messages) {
		let accepted = match dispatch(
			config.transport.as_ref(),
			target(config, route, endpoint, &url),
			&batch,
		) {
			Ok(accepted) => accepted,
			Err(e) => {
				warn!(endpoint = %endpoint, error = %e, "failed to render batch");
				false
			}
		};
		result.record(batch, accepted);
	}
	result
}

pub(crate) async fn send_async(
	config: &ResolvedConfig,
	route: Route<'_>,
	messages: impl IntoIterator<Item = Message>,
) -> SendResult {
	let mut result = SendResult::new();
	for (endpoint, url, batch) in routed(config, route, messages) {
		let accepted = match dispatch_async(
			config.async_transport.as_ref(),
			target(config, route, endpoint, &url),
			&batch,
		)
		.await
		{
			Ok(accepted) => accepted,
			Err(e) => {
				warn!(endpoint = %endpoint, error = %e, "failed to render batch");
				false
			}
		};
		result.record(batch, accepted);
	}
	result
}
