// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Splitting messages into endpoint-sized batches.

use pulse_analytics_core::Category;
use tracing::warn;

use crate::message::Message;

/// Maximum number of messages the service accepts in one request.
pub const MAX_BATCH_SIZE: usize = 50;

/// Batches grouped by routing category. No batch is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
	pub track: Vec<Vec<Message>>,
	pub engage: Vec<Vec<Message>>,
}

impl Partition {
	pub fn batch_count(&self) -> usize {
		self.track.len() + self.engage.len()
	}
}

/// Classifies `messages` by category, keeping input order, and chunks each
/// category into batches of at most [`MAX_BATCH_SIZE`].
pub fn partition<I>(messages: I) -> Partition
where
	I: IntoIterator<Item = Message>,
{
	let mut track = Vec::new();
	let mut engage = Vec::new();

	for message in messages {
		match message.category() {
			Some(Category::Track) => track.push(message),
			Some(Category::Engage) => engage.push(message),
			None => warn!(kind = %message.kind(), "skipping message without a routing category"),
		}
	}

	Partition {
		track: chunk(track),
		engage: chunk(engage),
	}
}

fn chunk(messages: Vec<Message>) -> Vec<Vec<Message>> {
	let mut batches = Vec::with_capacity(messages.len().div_ceil(MAX_BATCH_SIZE));
	let mut iter = messages.into_iter().peekable();
	while iter.peek().is_some() {
		batches.push(iter.by_ref().take(MAX_BATCH_SIZE).collect());
	}
	batches
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use pulse_analytics_core::MessageKind;
	use serde_json::{Map, Value};

	fn message(kind: MessageKind, n: usize) -> Message {
		let mut data = Map::new();
		data.insert("n".to_string(), Value::from(n));
		Message::new(kind, data)
	}

	#[test]
	fn empty_input_has_no_batches() {
		let p = partition(Vec::new());
		assert!(p.track.is_empty());
		assert!(p.engage.is_empty());
	}

	#[test]
	fn hundred_twenty_tracks() {
		let p = partition((0..120).map(|n| message(MessageKind::Track, n)));
		let sizes: Vec<usize> = p.track.iter().map(Vec::len).collect();
		assert_eq!(sizes, vec![50, 50, 20]);
		assert!(p.engage.is_empty());
	}

	#[test]
	fn mixed_kinds_are_routed() {
		let messages = vec![
			message(MessageKind::Track, 0),
			message(MessageKind::PeopleSet, 1),
			message(MessageKind::Alias, 2),
			message(MessageKind::PeopleDelete, 3),
		];
		let p = partition(messages);
		assert_eq!(p.track.len(), 1);
		assert_eq!(p.engage.len(), 1);
		assert_eq!(p.track[0][1].kind(), MessageKind::Alias);
		assert_eq!(p.engage[0][1].kind(), MessageKind::PeopleDelete);
	}

	#[test]
	fn batch_kind_is_skipped() {
		let p = partition(vec![message(MessageKind::Batch, 0)]);
		assert_eq!(p.batch_count(), 0);
	}

	proptest! {
		#[test]
		fn batches_reproduce_input(n in 0usize..400) {
			let input: Vec<Message> = (0..n).map(|i| message(MessageKind::PeopleSet, i)).collect();
			let p = partition(input.clone());

			prop_assert_eq!(p.engage.len(), n.div_ceil(MAX_BATCH_SIZE));
			prop_assert!(p.engage.iter().all(|b| !b.is_empty() && b.len() <= MAX_BATCH_SIZE));
			let flattened: Vec<Message> = p.engage.into_iter().flatten().collect();
			prop_assert_eq!(flattened, input);
		}

		#[test]
		fn partition_is_deterministic(kinds in proptest::collection::vec(any::<bool>(), 0..200)) {
			let input: Vec<Message> = kinds
				.iter()
				.enumerate()
				.map(|(i, track)| {
					let kind = if *track { MessageKind::Track } else { MessageKind::PeopleAdd };
					message(kind, i)
				})
				.collect();
			prop_assert_eq!(partition(input.clone()), partition(input));
		}
	}
}
