// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-call message requests.

use pulse_analytics_core::{Extractable, MessageKind, PropertyId, RawValue, ToRawValue};

/// What to build: the message kind, an optional property bag and the
/// call-site properties.
///
/// Call-site properties always win over same-named entries in the bag.
///
/// # Example
///
/// ```
/// use pulse_analytics::{MessageRequest, Properties};
///
/// let props = Properties::new().insert("plan", "pro");
/// let request = MessageRequest::track("signup")
///     .distinct_id("user-123")
///     .properties(&props);
/// assert_eq!(request.kind(), pulse_analytics::MessageKind::Track);
/// ```
#[derive(Clone)]
pub struct MessageRequest<'a> {
	kind: MessageKind,
	properties: Option<&'a (dyn Extractable + Sync)>,
	extra: Vec<(PropertyId, RawValue)>,
}

impl<'a> MessageRequest<'a> {
	fn new(kind: MessageKind) -> Self {
		Self {
			kind,
			properties: None,
			extra: Vec::new(),
		}
	}

	fn with(mut self, id: PropertyId, value: impl ToRawValue) -> Self {
		self.extra.retain(|(existing, _)| *existing != id);
		self.extra.push((id, value.to_raw()));
		self
	}

	/// An event.
	pub fn track(event: impl Into<String>) -> Self {
		Self::new(MessageKind::Track).with(PropertyId::Event, event.into())
	}

	/// Links `alias` to the existing `distinct_id`.
	pub fn alias(distinct_id: impl ToRawValue, alias: impl ToRawValue) -> Self {
		Self::new(MessageKind::Alias)
			.with(PropertyId::DistinctId, distinct_id)
			.with(PropertyId::Alias, alias)
	}

	/// Sets profile properties, overwriting existing values.
	pub fn people_set(distinct_id: impl ToRawValue) -> Self {
		Self::new(MessageKind::PeopleSet).with(PropertyId::DistinctId, distinct_id)
	}

	/// Sets profile properties only where they are not set yet.
	pub fn people_set_once(distinct_id: impl ToRawValue) -> Self {
		Self::new(MessageKind::PeopleSetOnce).with(PropertyId::DistinctId, distinct_id)
	}

	/// Increments numeric profile properties.
	pub fn people_add(distinct_id: impl ToRawValue) -> Self {
		Self::new(MessageKind::PeopleAdd).with(PropertyId::DistinctId, distinct_id)
	}

	/// Appends values to list profile properties.
	pub fn people_append(distinct_id: impl ToRawValue) -> Self {
		Self::new(MessageKind::PeopleAppend).with(PropertyId::DistinctId, distinct_id)
	}

	/// Merges values into list profile properties without duplicates.
	pub fn people_union(distinct_id: impl ToRawValue) -> Self {
		Self::new(MessageKind::PeopleUnion).with(PropertyId::DistinctId, distinct_id)
	}

	/// Removes the named profile properties.
	pub fn people_unset<I, S>(distinct_id: impl ToRawValue, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let names: Vec<String> = names.into_iter().map(Into::into).collect();
		Self::new(MessageKind::PeopleUnset)
			.with(PropertyId::DistinctId, distinct_id)
			.with(PropertyId::PropertyNames, names)
	}

	/// Deletes the whole profile.
	pub fn people_delete(distinct_id: impl ToRawValue) -> Self {
		Self::new(MessageKind::PeopleDelete).with(PropertyId::DistinctId, distinct_id)
	}

	/// Records a transaction on the profile. The time defaults to now.
	pub fn people_track_charge(distinct_id: impl ToRawValue, amount: impl ToRawValue) -> Self {
		Self::new(MessageKind::PeopleTrackCharge)
			.with(PropertyId::DistinctId, distinct_id)
			.with(PropertyId::Amount, amount)
	}

	pub fn distinct_id(self, distinct_id: impl ToRawValue) -> Self {
		self.with(PropertyId::DistinctId, distinct_id)
	}

	/// The loose property bag for this message.
	///
	/// The bag must be `Sync` so async sends holding the request stay `Send`.
	pub fn properties<E: Extractable + Sync>(mut self, properties: &'a E) -> Self {
		self.properties = Some(properties);
		self
	}

	pub fn time(self, time: impl ToRawValue) -> Self {
		self.with(PropertyId::Time, time)
	}

	pub fn ip(self, ip: impl Into<String>) -> Self {
		self.with(PropertyId::Ip, ip.into())
	}

	/// Keeps the profile's "last seen" time unchanged.
	pub fn ignore_time(self, ignore: bool) -> Self {
		self.with(PropertyId::IgnoreTime, ignore)
	}

	/// Deduplication id for events.
	pub fn insert_id(self, insert_id: impl Into<String>) -> Self {
		self.with(PropertyId::InsertId, insert_id.into())
	}

	pub fn kind(&self) -> MessageKind {
		self.kind
	}

	pub(crate) fn user_properties(&self) -> Option<&'a (dyn Extractable + Sync)> {
		self.properties
	}

	pub(crate) fn extra(&self) -> &[(PropertyId, RawValue)] {
		&self.extra
	}
}

impl std::fmt::Debug for MessageRequest<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MessageRequest")
			.field("kind", &self.kind)
			.field("properties", &self.properties.is_some())
			.field("extra", &self.extra)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn modifiers_replace_earlier_values() {
		let request = MessageRequest::track("e").distinct_id("a").distinct_id("b");
		let ids: Vec<_> = request
			.extra()
			.iter()
			.filter(|(id, _)| *id == PropertyId::DistinctId)
			.collect();
		assert_eq!(ids.len(), 1);
		assert_eq!(ids[0].1, RawValue::String("b".to_string()));
	}

	#[test]
	fn unset_carries_names_in_order() {
		let request = MessageRequest::people_unset("u1", ["age", "city"]);
		assert_eq!(request.kind(), MessageKind::PeopleUnset);
		let names = request
			.extra()
			.iter()
			.find(|(id, _)| *id == PropertyId::PropertyNames)
			.map(|(_, v)| v.clone());
		assert_eq!(
			names,
			Some(RawValue::Seq(vec![
				RawValue::String("age".to_string()),
				RawValue::String("city".to_string()),
			]))
		);
	}

	#[test]
	fn charge_carries_amount() {
		let request = MessageRequest::people_track_charge("u1", 9.5);
		assert!(request
			.extra()
			.iter()
			.any(|(id, v)| *id == PropertyId::Amount && *v == RawValue::Float(9.5)));
	}
}
