// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Precedence-ordered assembly of the canonical property mapping.
//!
//! Layers are merged lowest first, so a later layer wins on collision:
//!
//! 1. super properties, filtered by the kind's policy
//! 2. properties extracted from the caller's property bag
//! 3. call-site properties (event name, distinct id, explicit time, ...)
//!
//! The client token is applied over all layers; a `token` key in the
//! layers only counts when the client has none.
//!
//! The merged identifiers are then bound to their wire names and coerced,
//! and per-kind defaults are filled in.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use pulse_analytics_core::{extract, normalize, Extractable, NameFormat, PropertyId, PropertyKey, RawValue};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{AnalyticsError, Result};
use crate::rules::{
	to_epoch_seconds, to_names, to_number, OperationFilter, Payload, RuleSet, Scope, SuperProperties,
};

const CHARGE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Client-level inputs shared by every message built by one client.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AssemblyContext<'a> {
	pub token: Option<&'a str>,
	pub super_properties: &'a [(PropertyKey, Value)],
	pub name_format: NameFormat,
}

#[derive(Default)]
struct Layers {
	special: BTreeMap<PropertyId, Value>,
	custom: Map<String, Value>,
}

impl Layers {
	fn put(&mut self, key: PropertyKey, value: Value) {
		match key {
			PropertyKey::Special(id) => {
				self.special.insert(id, value);
			}
			PropertyKey::Custom(name) => {
				// Re-inserting keeps the first position in an ordered map;
				// remove first so last-seen also decides placement.
				self.custom.remove(&name);
				self.custom.insert(name, value);
			}
		}
	}
}

/// Builds the canonical mapping for one message.
///
/// Deterministic for the same inputs and `now`.
pub(crate) fn assemble(
	rules: &RuleSet,
	ctx: &AssemblyContext<'_>,
	user: Option<&dyn Extractable>,
	extra: &[(PropertyId, RawValue)],
	now: DateTime<Utc>,
) -> Result<Map<String, Value>> {
	let mut layers = Layers::default();

	for (key, value) in ctx.super_properties {
		if key.is_special() || rules.super_properties == SuperProperties::All {
			layers.put(key.clone(), value.clone());
		}
	}

	if let Some(user) = user {
		for (key, value) in extract(user, ctx.name_format)? {
			layers.put(key, value);
		}
	}

	for (id, raw) in extra {
		match normalize(raw.clone(), 0)? {
			Some(value) => layers.put((*id).into(), value),
			None => trace!(property = %id, "ignoring empty call-site property"),
		}
	}

	if let Some(token) = ctx.token {
		layers.put(PropertyId::Token.into(), Value::String(token.to_string()));
	}

	if rules.default_time && !layers.special.contains_key(&PropertyId::Time) {
		layers
			.special
			.insert(PropertyId::Time, Value::from(now.timestamp()));
	}

	if rules.requires_distinct_id && !layers.special.contains_key(&rules.distinct_id) {
		debug!(kind = %rules.kind, "message has no distinct id; omitting it");
	}

	let Layers {
		mut special,
		custom,
	} = layers;

	let mut root = Map::new();
	let mut properties = Map::new();

	for (name, value) in rules.fixed {
		root.insert((*name).to_string(), Value::String((*value).to_string()));
	}

	match rules.payload {
		Payload::Properties => properties = custom,
		Payload::None => {}
		Payload::Operation { key, filter } => {
			root.insert(key.to_string(), Value::Object(filter_operation(filter, custom)));
		}
		Payload::Names(key) => {
			let names = match special.remove(&PropertyId::PropertyNames) {
				Some(value) => to_names(PropertyId::PropertyNames, value)?,
				None => Value::Array(Vec::new()),
			};
			root.insert(key.to_string(), names);
		}
		Payload::Delete(key) => {
			root.insert(key.to_string(), Value::String(String::new()));
		}
		Payload::Charge => {
			let transaction = charge(&mut special, now)?;
			let mut append = Map::new();
			append.insert("$transactions".to_string(), transaction);
			root.insert("$append".to_string(), Value::Object(append));
		}
	}

	for binding in rules.bindings {
		let Some(value) = special.remove(&binding.id) else {
			continue;
		};
		let value = (binding.transform)(binding.id, value)?;
		match binding.scope {
			Scope::Root => root.insert(binding.wire.to_string(), value),
			Scope::Properties => properties.insert(binding.wire.to_string(), value),
		};
	}

	for id in special.keys() {
		trace!(kind = %rules.kind, property = %id, "property not used by this message kind");
	}

	if rules.payload == Payload::Properties
		|| rules.bindings.iter().any(|b| b.scope == Scope::Properties)
	{
		root.insert("properties".to_string(), Value::Object(properties));
	}

	Ok(root)
}

fn filter_operation(filter: OperationFilter, custom: Map<String, Value>) -> Map<String, Value> {
	custom
		.into_iter()
		.filter_map(|(name, value)| {
			let value = match (filter, value) {
				(OperationFilter::Any, v) => v,
				(OperationFilter::Numeric, v @ Value::Number(_)) => v,
				(OperationFilter::Numeric, _) => {
					trace!(property = %name, "dropping non-numeric increment");
					return None;
				}
				(OperationFilter::Sequence, v @ Value::Array(_)) => v,
				(OperationFilter::Sequence, Value::Object(_)) => {
					trace!(property = %name, "dropping map from union");
					return None;
				}
				(OperationFilter::Sequence, v) => Value::Array(vec![v]),
			};
			Some((name, value))
		})
		.collect()
}

fn charge(special: &mut BTreeMap<PropertyId, Value>, now: DateTime<Utc>) -> Result<Value> {
	let amount = special
		.remove(&PropertyId::Amount)
		.ok_or_else(|| AnalyticsError::InvalidProperty {
			property: PropertyId::Amount,
			reason: "a charge needs an amount".to_string(),
		})?;
	let amount = to_number(PropertyId::Amount, amount)?;

	let time = match special.remove(&PropertyId::Time) {
		Some(value) => {
			let secs = to_epoch_seconds(PropertyId::Time, value)?;
			secs.as_i64()
				.and_then(|s| Utc.timestamp_opt(s, 0).single())
				.ok_or_else(|| AnalyticsError::InvalidProperty {
					property: PropertyId::Time,
					reason: format!("{secs} is out of range"),
				})?
		}
		None => now,
	};

	let mut transaction = Map::new();
	transaction.insert(
		"$time".to_string(),
		Value::String(time.format(CHARGE_TIME_FORMAT).to_string()),
	);
	transaction.insert("$amount".to_string(), amount);
	Ok(Value::Object(transaction))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::properties::Properties;
	use crate::rules::rule_set;
	use proptest::prelude::*;
	use pulse_analytics_core::MessageKind;
	use serde_json::json;

	fn raw(value: &str) -> RawValue {
		RawValue::String(value.to_string())
	}

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
	}

	fn ctx<'a>(supers: &'a [(PropertyKey, Value)]) -> AssemblyContext<'a> {
		AssemblyContext {
			token: Some("tok"),
			super_properties: supers,
			name_format: NameFormat::AsIs,
		}
	}

	fn build(
		kind: MessageKind,
		supers: &[(PropertyKey, Value)],
		user: Option<&dyn Extractable>,
		extra: &[(PropertyId, RawValue)],
	) -> Result<Map<String, Value>> {
		assemble(rule_set(kind).unwrap(), &ctx(supers), user, extra, now())
	}

	#[test]
	fn track_signup_scenario() {
		let t = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
		let data = build(
			MessageKind::Track,
			&[],
			None,
			&[
				(PropertyId::Event, raw("signup")),
				(PropertyId::DistinctId, raw("u1")),
				(PropertyId::Time, RawValue::Time(t)),
			],
		)
		.unwrap();

		assert_eq!(data["event"], json!("signup"));
		assert_eq!(data["properties"]["distinct_id"], json!("u1"));
		assert_eq!(data["properties"]["time"], json!(t.timestamp()));
		assert_eq!(data["properties"]["token"], json!("tok"));
	}

	#[test]
	fn track_defaults_time_to_now() {
		let data = build(
			MessageKind::Track,
			&[],
			None,
			&[(PropertyId::Event, raw("e"))],
		)
		.unwrap();
		assert_eq!(data["properties"]["time"], json!(now().timestamp()));
	}

	#[test]
	fn unset_keeps_name_order() {
		let data = build(
			MessageKind::PeopleUnset,
			&[],
			None,
			&[
				(PropertyId::DistinctId, raw("u1")),
				(
					PropertyId::PropertyNames,
					RawValue::Seq(vec![raw("age"), raw("city")]),
				),
			],
		)
		.unwrap();
		assert_eq!(data["$unset"], json!(["age", "city"]));
		assert_eq!(data["$distinct_id"], json!("u1"));
		assert_eq!(data["$token"], json!("tok"));
	}

	#[test]
	fn extra_beats_user_properties() {
		let user = Properties::new().insert("distinct_id", "from-bag");
		let data = build(
			MessageKind::Track,
			&[],
			Some(&user),
			&[
				(PropertyId::Event, raw("e")),
				(PropertyId::DistinctId, raw("from-call")),
			],
		)
		.unwrap();
		assert_eq!(data["properties"]["distinct_id"], json!("from-call"));
	}

	#[test]
	fn user_properties_beat_super_properties() {
		let supers = vec![(PropertyKey::Custom("plan".to_string()), json!("free"))];
		let user = Properties::new().insert("plan", "pro");
		let data = build(
			MessageKind::Track,
			&supers,
			Some(&user),
			&[(PropertyId::Event, raw("e"))],
		)
		.unwrap();
		assert_eq!(data["properties"]["plan"], json!("pro"));
	}

	#[test]
	fn people_only_take_special_super_properties() {
		let supers = vec![
			(PropertyKey::Custom("plan".to_string()), json!("free")),
			(PropertyKey::Special(PropertyId::Ip), json!("10.0.0.1")),
		];
		let user = Properties::new().insert("name", "Ada");
		let data = build(
			MessageKind::PeopleSet,
			&supers,
			Some(&user),
			&[(PropertyId::DistinctId, raw("u1"))],
		)
		.unwrap();
		assert_eq!(data["$set"], json!({"name": "Ada"}));
		assert_eq!(data["$ip"], json!("10.0.0.1"));
		assert!(data.get("plan").is_none());
	}

	#[test]
	fn missing_distinct_id_is_omitted() {
		let data = build(MessageKind::PeopleSet, &[], None, &[]).unwrap();
		assert!(data.get("$distinct_id").is_none());
		assert_eq!(data["$set"], json!({}));
	}

	#[test]
	fn no_token_means_no_token_entry() {
		let rules = rule_set(MessageKind::Track).unwrap();
		let ctx = AssemblyContext {
			token: None,
			super_properties: &[],
			name_format: NameFormat::AsIs,
		};
		let data = assemble(rules, &ctx, None, &[], now()).unwrap();
		assert!(data["properties"].get("token").is_none());
	}

	#[test]
	fn alias_ignores_custom_properties() {
		let user = Properties::new().insert("color", "red");
		let data = build(
			MessageKind::Alias,
			&[],
			Some(&user),
			&[
				(PropertyId::DistinctId, raw("anon-1")),
				(PropertyId::Alias, raw("u1")),
			],
		)
		.unwrap();
		assert_eq!(
			Value::Object(data),
			json!({
				"event": "$create_alias",
				"properties": {"token": "tok", "distinct_id": "anon-1", "alias": "u1"}
			})
		);
	}

	#[test]
	fn add_drops_non_numeric_values() {
		let user = Properties::new().insert("logins", 1).insert("name", "Ada");
		let data = build(MessageKind::PeopleAdd, &[], Some(&user), &[]).unwrap();
		assert_eq!(data["$add"], json!({"logins": 1}));
	}

	#[test]
	fn union_wraps_scalars() {
		let user = Properties::new()
			.insert("tags", vec!["a", "b"])
			.insert("team", "core")
			.insert("meta", RawValue::Map(vec![("x".to_string(), RawValue::Int(1))]));
		let data = build(MessageKind::PeopleUnion, &[], Some(&user), &[]).unwrap();
		assert_eq!(data["$union"], json!({"tags": ["a", "b"], "team": ["core"]}));
	}

	#[test]
	fn delete_sets_empty_operation() {
		let data = build(
			MessageKind::PeopleDelete,
			&[],
			None,
			&[(PropertyId::DistinctId, raw("u1"))],
		)
		.unwrap();
		assert_eq!(data["$delete"], json!(""));
	}

	#[test]
	fn charge_builds_transaction() {
		let t = Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 0).unwrap();
		let data = build(
			MessageKind::PeopleTrackCharge,
			&[],
			None,
			&[
				(PropertyId::DistinctId, raw("u1")),
				(PropertyId::Amount, raw("9.99")),
				(PropertyId::Time, RawValue::Time(t)),
			],
		)
		.unwrap();
		assert_eq!(
			data["$append"],
			json!({"$transactions": {"$time": "2024-03-05T12:30:00", "$amount": 9.99}})
		);
		assert!(data.get("$time").is_none());
	}

	#[test]
	fn charge_without_amount_fails() {
		let result = build(
			MessageKind::PeopleTrackCharge,
			&[],
			None,
			&[(PropertyId::DistinctId, raw("u1"))],
		);
		assert!(matches!(
			result,
			Err(AnalyticsError::InvalidProperty {
				property: PropertyId::Amount,
				..
			})
		));
	}

	#[test]
	fn charge_time_beyond_i64_is_an_error() {
		let result = build(
			MessageKind::PeopleTrackCharge,
			&[],
			None,
			&[
				(PropertyId::DistinctId, raw("u1")),
				(PropertyId::Amount, RawValue::Float(5.0)),
				(PropertyId::Time, RawValue::UInt(u64::MAX)),
			],
		);
		assert!(matches!(
			result,
			Err(AnalyticsError::InvalidProperty {
				property: PropertyId::Time,
				..
			})
		));
	}

	#[test]
	fn bag_token_cannot_replace_client_token() {
		let supers = vec![(PropertyKey::Special(PropertyId::Token), json!("super-token"))];
		let user = Properties::new().insert("token", "bag-token").insert("$token", "other");

		let track = build(
			MessageKind::Track,
			&supers,
			Some(&user),
			&[(PropertyId::Event, raw("e"))],
		)
		.unwrap();
		assert_eq!(track["properties"]["token"], json!("tok"));

		let people = build(MessageKind::PeopleSet, &supers, Some(&user), &[]).unwrap();
		assert_eq!(people["$token"], json!("tok"));
	}

	#[test]
	fn bag_token_applies_without_client_token() {
		let rules = rule_set(MessageKind::Track).unwrap();
		let ctx = AssemblyContext {
			token: None,
			super_properties: &[],
			name_format: NameFormat::AsIs,
		};
		let user = Properties::new().insert("token", "bag-token");
		let data = assemble(rules, &ctx, Some(&user), &[], now()).unwrap();
		assert_eq!(data["properties"]["token"], json!("bag-token"));
	}

	#[test]
	fn transform_failure_is_an_error() {
		let result = build(
			MessageKind::Track,
			&[],
			None,
			&[
				(PropertyId::Event, raw("e")),
				(PropertyId::Time, raw("not a time")),
			],
		);
		assert!(matches!(result, Err(AnalyticsError::InvalidProperty { .. })));
	}

	#[test]
	fn name_format_applies_to_custom_properties() {
		let rules = rule_set(MessageKind::Track).unwrap();
		let ctx = AssemblyContext {
			token: Some("tok"),
			super_properties: &[],
			name_format: NameFormat::Underscored,
		};
		let user = Properties::new().insert("buttonName", "buy").insert("distinctId", "u1");
		let data = assemble(rules, &ctx, Some(&user), &[], now()).unwrap();
		assert_eq!(data["properties"]["button_name"], json!("buy"));
		assert_eq!(data["properties"]["distinct_id"], json!("u1"));
	}

	proptest! {
		#[test]
		fn extra_always_wins(bag in "[a-z0-9]{1,12}", call in "[a-z0-9]{1,12}") {
			let user = Properties::new().insert("distinct_id", bag);
			let data = build(
				MessageKind::Track,
				&[],
				Some(&user),
				&[(PropertyId::DistinctId, raw(&call))],
			)
			.unwrap();
			prop_assert_eq!(&data["properties"]["distinct_id"], &json!(call));
		}

		#[test]
		fn assembly_is_idempotent(
			names in proptest::collection::vec("[a-z]{1,8}", 0..10),
			values in proptest::collection::vec(any::<i64>(), 0..10),
		) {
			let user: Properties = names.into_iter().zip(values).collect();
			let extra = [(PropertyId::Event, raw("e"))];
			let first = build(MessageKind::Track, &[], Some(&user), &extra).unwrap();
			let second = build(MessageKind::Track, &[], Some(&user), &extra).unwrap();
			prop_assert_eq!(first, second);
		}

		#[test]
		fn token_is_always_the_client_token(
			names in proptest::collection::vec("\\$?[a-z_]{2,12}", 0..10),
		) {
			let user: Properties = names
				.into_iter()
				.map(|n| (n, 1))
				.collect::<Properties>()
				.insert("token", "bag-token");
			let kinds = [
				MessageKind::Track,
				MessageKind::Alias,
				MessageKind::PeopleSet,
				MessageKind::PeopleAdd,
				MessageKind::PeopleUnion,
				MessageKind::PeopleUnset,
				MessageKind::PeopleDelete,
			];
			for kind in kinds {
				let data = build(kind, &[], Some(&user), &[]).unwrap();
				let token = data.get("$token").or_else(|| data["properties"].get("token"));
				prop_assert_eq!(token, Some(&json!("tok")));
			}
		}
	}
}
