// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-kind message rules.
//!
//! One static [`RuleSet`] per buildable [`MessageKind`] describes where each
//! semantic property lands on the wire, how its value is coerced, which super
//! properties apply and what the kind-specific payload looks like.
//!
//! | Kind | Shape |
//! |------|-------|
//! | Track | `{event, properties: {token, distinct_id, time, ip, $insert_id, ...}}` |
//! | Alias | `{event: "$create_alias", properties: {token, distinct_id, alias}}` |
//! | People* | `{$token, $distinct_id, $time, $ip, $ignore_time, <operation>}` |

use chrono::DateTime;
use pulse_analytics_core::{MessageKind, PropertyId};
use serde_json::{Number, Value};

use crate::error::{AnalyticsError, Result};

/// Coerces a merged value to its wire type.
pub(crate) type Transform = fn(PropertyId, Value) -> Result<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
	/// Top level of the message.
	Root,
	/// Inside the `properties` object.
	Properties,
}

pub(crate) struct Binding {
	pub id: PropertyId,
	pub wire: &'static str,
	pub scope: Scope,
	pub transform: Transform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SuperProperties {
	/// Recognized and custom super properties.
	All,
	/// Only recognized identifiers such as the distinct id or ip.
	SpecialOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperationFilter {
	Any,
	/// Non-numeric values are dropped.
	Numeric,
	/// Scalars are wrapped in a one-element list, maps are dropped.
	Sequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Payload {
	/// Custom properties go into `properties`.
	Properties,
	/// Custom properties are ignored.
	None,
	/// Custom properties go into the named operation object.
	Operation {
		key: &'static str,
		filter: OperationFilter,
	},
	/// The call-site property names go into the named list.
	Names(&'static str),
	/// The named operation with an empty string value.
	Delete(&'static str),
	/// `$append.$transactions` built from the amount and time.
	Charge,
}

pub(crate) struct RuleSet {
	pub kind: MessageKind,
	pub distinct_id: PropertyId,
	pub requires_distinct_id: bool,
	pub bindings: &'static [Binding],
	pub super_properties: SuperProperties,
	pub fixed: &'static [(&'static str, &'static str)],
	pub payload: Payload,
	pub default_time: bool,
}

/// Returns the rules for `kind`, or `None` for [`MessageKind::Batch`].
pub(crate) fn rule_set(kind: MessageKind) -> Option<&'static RuleSet> {
	match kind {
		MessageKind::Track => Some(&TRACK),
		MessageKind::Alias => Some(&ALIAS),
		MessageKind::PeopleSet => Some(&PEOPLE_SET),
		MessageKind::PeopleSetOnce => Some(&PEOPLE_SET_ONCE),
		MessageKind::PeopleAdd => Some(&PEOPLE_ADD),
		MessageKind::PeopleAppend => Some(&PEOPLE_APPEND),
		MessageKind::PeopleUnion => Some(&PEOPLE_UNION),
		MessageKind::PeopleUnset => Some(&PEOPLE_UNSET),
		MessageKind::PeopleDelete => Some(&PEOPLE_DELETE),
		MessageKind::PeopleTrackCharge => Some(&PEOPLE_TRACK_CHARGE),
		MessageKind::Batch => None,
	}
}

const fn bind(id: PropertyId, wire: &'static str, scope: Scope, transform: Transform) -> Binding {
	Binding {
		id,
		wire,
		scope,
		transform,
	}
}

static TRACK_BINDINGS: [Binding; 6] = [
	bind(PropertyId::Event, "event", Scope::Root, to_string),
	bind(PropertyId::Token, "token", Scope::Properties, to_string),
	bind(PropertyId::DistinctId, "distinct_id", Scope::Properties, to_string),
	bind(PropertyId::Time, "time", Scope::Properties, to_epoch_seconds),
	bind(PropertyId::Ip, "ip", Scope::Properties, to_string),
	bind(PropertyId::InsertId, "$insert_id", Scope::Properties, to_string),
];

static ALIAS_BINDINGS: [Binding; 3] = [
	bind(PropertyId::Token, "token", Scope::Properties, to_string),
	bind(PropertyId::DistinctId, "distinct_id", Scope::Properties, to_string),
	bind(PropertyId::Alias, "alias", Scope::Properties, to_string),
];

static PEOPLE_BINDINGS: [Binding; 5] = [
	bind(PropertyId::Token, "$token", Scope::Root, to_string),
	bind(PropertyId::DistinctId, "$distinct_id", Scope::Root, to_string),
	bind(PropertyId::Time, "$time", Scope::Root, to_epoch_seconds),
	bind(PropertyId::Ip, "$ip", Scope::Root, to_string),
	bind(PropertyId::IgnoreTime, "$ignore_time", Scope::Root, to_bool),
];

// The charge time lives inside the transaction, not at the top level.
static CHARGE_BINDINGS: [Binding; 4] = [
	bind(PropertyId::Token, "$token", Scope::Root, to_string),
	bind(PropertyId::DistinctId, "$distinct_id", Scope::Root, to_string),
	bind(PropertyId::Ip, "$ip", Scope::Root, to_string),
	bind(PropertyId::IgnoreTime, "$ignore_time", Scope::Root, to_bool),
];

static TRACK: RuleSet = RuleSet {
	kind: MessageKind::Track,
	distinct_id: PropertyId::DistinctId,
	requires_distinct_id: false,
	bindings: &TRACK_BINDINGS,
	super_properties: SuperProperties::All,
	fixed: &[],
	payload: Payload::Properties,
	default_time: true,
};

static ALIAS: RuleSet = RuleSet {
	kind: MessageKind::Alias,
	distinct_id: PropertyId::DistinctId,
	requires_distinct_id: true,
	bindings: &ALIAS_BINDINGS,
	super_properties: SuperProperties::SpecialOnly,
	fixed: &[("event", "$create_alias")],
	payload: Payload::None,
	default_time: false,
};

const fn people(kind: MessageKind, bindings: &'static [Binding], payload: Payload) -> RuleSet {
	RuleSet {
		kind,
		distinct_id: PropertyId::DistinctId,
		requires_distinct_id: true,
		bindings,
		super_properties: SuperProperties::SpecialOnly,
		fixed: &[],
		payload,
		default_time: false,
	}
}

static PEOPLE_SET: RuleSet = people(
	MessageKind::PeopleSet,
	&PEOPLE_BINDINGS,
	Payload::Operation {
		key: "$set",
		filter: OperationFilter::Any,
	},
);

static PEOPLE_SET_ONCE: RuleSet = people(
	MessageKind::PeopleSetOnce,
	&PEOPLE_BINDINGS,
	Payload::Operation {
		key: "$set_once",
		filter: OperationFilter::Any,
	},
);

static PEOPLE_ADD: RuleSet = people(
	MessageKind::PeopleAdd,
	&PEOPLE_BINDINGS,
	Payload::Operation {
		key: "$add",
		filter: OperationFilter::Numeric,
	},
);

static PEOPLE_APPEND: RuleSet = people(
	MessageKind::PeopleAppend,
	&PEOPLE_BINDINGS,
	Payload::Operation {
		key: "$append",
		filter: OperationFilter::Any,
	},
);

static PEOPLE_UNION: RuleSet = people(
	MessageKind::PeopleUnion,
	&PEOPLE_BINDINGS,
	Payload::Operation {
		key: "$union",
		filter: OperationFilter::Sequence,
	},
);

static PEOPLE_UNSET: RuleSet = people(
	MessageKind::PeopleUnset,
	&PEOPLE_BINDINGS,
	Payload::Names("$unset"),
);

static PEOPLE_DELETE: RuleSet = people(
	MessageKind::PeopleDelete,
	&PEOPLE_BINDINGS,
	Payload::Delete("$delete"),
);

static PEOPLE_TRACK_CHARGE: RuleSet = RuleSet {
	kind: MessageKind::PeopleTrackCharge,
	distinct_id: PropertyId::DistinctId,
	requires_distinct_id: true,
	bindings: &CHARGE_BINDINGS,
	super_properties: SuperProperties::SpecialOnly,
	fixed: &[],
	payload: Payload::Charge,
	default_time: false,
};

fn invalid(property: PropertyId, reason: impl Into<String>) -> AnalyticsError {
	AnalyticsError::InvalidProperty {
		property,
		reason: reason.into(),
	}
}

/// Strings pass through, numbers are stringified.
pub(crate) fn to_string(id: PropertyId, value: Value) -> Result<Value> {
	match value {
		Value::String(_) => Ok(value),
		Value::Number(n) => Ok(Value::String(n.to_string())),
		other => Err(invalid(id, format!("expected a string, got {other}"))),
	}
}

/// Numbers are truncated to whole seconds, strings are parsed as RFC 3339
/// or as integer seconds.
pub(crate) fn to_epoch_seconds(id: PropertyId, value: Value) -> Result<Value> {
	match &value {
		Value::Number(n) => {
			if n.is_i64() || n.is_u64() {
				Ok(value)
			} else {
				let secs = n.as_f64().unwrap_or_default().trunc() as i64;
				Ok(Value::from(secs))
			}
		}
		Value::String(s) => {
			if let Ok(secs) = s.trim().parse::<i64>() {
				return Ok(Value::from(secs));
			}
			DateTime::parse_from_rfc3339(s.trim())
				.map(|t| Value::from(t.timestamp()))
				.map_err(|e| invalid(id, format!("cannot parse {s:?} as a timestamp: {e}")))
		}
		other => Err(invalid(id, format!("expected a timestamp, got {other}"))),
	}
}

pub(crate) fn to_bool(id: PropertyId, value: Value) -> Result<Value> {
	match &value {
		Value::Bool(_) => Ok(value),
		Value::Number(n) => Ok(Value::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
		Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
			"true" | "1" => Ok(Value::Bool(true)),
			"false" | "0" => Ok(Value::Bool(false)),
			_ => Err(invalid(id, format!("cannot parse {s:?} as a boolean"))),
		},
		other => Err(invalid(id, format!("expected a boolean, got {other}"))),
	}
}

/// Numbers pass through, numeric strings are parsed.
pub(crate) fn to_number(id: PropertyId, value: Value) -> Result<Value> {
	match &value {
		Value::Number(_) => Ok(value),
		Value::String(s) => s
			.trim()
			.parse::<f64>()
			.ok()
			.and_then(Number::from_f64)
			.map(Value::Number)
			.ok_or_else(|| invalid(id, format!("cannot parse {s:?} as a number"))),
		other => Err(invalid(id, format!("expected a number, got {other}"))),
	}
}

/// A list of property names, order preserved. A single name is accepted.
pub(crate) fn to_names(id: PropertyId, value: Value) -> Result<Value> {
	match value {
		Value::String(s) => Ok(Value::Array(vec![Value::String(s)])),
		Value::Array(items) => items
			.into_iter()
			.map(|item| match item {
				Value::String(_) => Ok(item),
				other => Err(invalid(id, format!("expected property names, got {other}"))),
			})
			.collect::<Result<Vec<_>>>()
			.map(Value::Array),
		other => Err(invalid(id, format!("expected property names, got {other}"))),
	}
}
