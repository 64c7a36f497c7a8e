// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The property extractor.
//!
//! Any input that implements [`Extractable`] can be turned into a flat list of
//! `(PropertyKey, Value)` pairs by [`extract`]. Adapters are provided for the
//! common container shapes:
//!
//! | Shape | Types |
//! |-------|-------|
//! | map-like | `HashMap`, `BTreeMap`, `serde_json::Map`, `serde_json::Value` |
//! | record-like | `Vec<(K, V)>`, `[(K, V)]`, [`Serialized`] |
//! | scalar-wrapping | `(K, V)` |
//! | null | `()`, `Option::None` |
//!
//! Types deriving `serde::Serialize` can be passed through [`Serialized`],
//! which walks their public fields.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::trace;

use crate::error::{ExtractError, Result};
use crate::naming::NameFormat;
use crate::property::{PropertyId, PropertyKey};
use crate::value::{RawValue, ToRawValue};

/// Maximum nesting of maps inside a property value.
pub const MAX_NESTING_DEPTH: usize = 32;

/// An input that can enumerate its key/value pairs.
pub trait Extractable {
	/// Returns the raw entries in the input's natural iteration order.
	fn entries(&self) -> Result<Vec<(String, RawValue)>>;
}

/// Walks `input` and returns normalized properties.
///
/// Recognized identifiers are resolved before `format` is applied; custom
/// top-level names are converted with `format`, nested names are kept.
/// Values the wire format cannot express are dropped.
pub fn extract<E>(input: &E, format: NameFormat) -> Result<Vec<(PropertyKey, Value)>>
where
	E: Extractable + ?Sized,
{
	let mut out = Vec::new();
	for (name, raw) in input.entries()? {
		let Some(value) = normalize(raw, 0)? else {
			trace!(property = %name, "dropping unsupported property value");
			continue;
		};
		let key = match PropertyId::from_raw_name(&name) {
			Some(id) => PropertyKey::Special(id),
			None => PropertyKey::Custom(format.apply(&name)),
		};
		out.push((key, value));
	}
	Ok(out)
}

/// Converts a raw value to its wire form.
///
/// Returns `Ok(None)` for values that are dropped.
pub fn normalize(raw: RawValue, depth: usize) -> Result<Option<Value>> {
	let value = match raw {
		RawValue::Null | RawValue::Unsupported(_) => return Ok(None),
		RawValue::Bool(b) => Value::Bool(b),
		RawValue::Int(i) => Value::Number(i.into()),
		RawValue::UInt(u) => Value::Number(u.into()),
		RawValue::Float(f) => match Number::from_f64(f) {
			Some(n) => Value::Number(n),
			None => return Ok(None),
		},
		RawValue::String(s) => Value::String(s),
		RawValue::Time(t) => Value::Number(t.timestamp().into()),
		RawValue::Seq(items) => {
			if items.iter().any(|v| !v.is_primitive() && *v != RawValue::Null) {
				return Ok(None);
			}
			let mut out = Vec::with_capacity(items.len());
			for item in items {
				if let Some(v) = normalize(item, depth)? {
					out.push(v);
				}
			}
			Value::Array(out)
		}
		RawValue::Map(entries) => {
			if depth >= MAX_NESTING_DEPTH {
				return Err(ExtractError::TooDeep {
					max: MAX_NESTING_DEPTH,
				});
			}
			let mut map = Map::new();
			for (k, v) in entries {
				if let Some(v) = normalize(v, depth + 1)? {
					map.insert(k, v);
				}
			}
			Value::Object(map)
		}
	};
	Ok(Some(value))
}

impl<T: Extractable + ?Sized> Extractable for &T {
	fn entries(&self) -> Result<Vec<(String, RawValue)>> {
		(**self).entries()
	}
}

impl<T: Extractable> Extractable for Option<T> {
	fn entries(&self) -> Result<Vec<(String, RawValue)>> {
		match self {
			Some(inner) => inner.entries(),
			None => Ok(Vec::new()),
		}
	}
}

impl Extractable for () {
	fn entries(&self) -> Result<Vec<(String, RawValue)>> {
		Ok(Vec::new())
	}
}

impl<K, V, S> Extractable for HashMap<K, V, S>
where
	K: AsRef<str>,
	V: ToRawValue,
	S: BuildHasher,
{
	fn entries(&self) -> Result<Vec<(String, RawValue)>> {
		Ok(self
			.iter()
			.map(|(k, v)| (k.as_ref().to_string(), v.to_raw()))
			.collect())
	}
}

impl<K, V> Extractable for BTreeMap<K, V>
where
	K: AsRef<str>,
	V: ToRawValue,
{
	fn entries(&self) -> Result<Vec<(String, RawValue)>> {
		Ok(self
			.iter()
			.map(|(k, v)| (k.as_ref().to_string(), v.to_raw()))
			.collect())
	}
}

impl<K, V> Extractable for [(K, V)]
where
	K: AsRef<str>,
	V: ToRawValue,
{
	fn entries(&self) -> Result<Vec<(String, RawValue)>> {
		Ok(self
			.iter()
			.map(|(k, v)| (k.as_ref().to_string(), v.to_raw()))
			.collect())
	}
}

impl<K, V> Extractable for Vec<(K, V)>
where
	K: AsRef<str>,
	V: ToRawValue,
{
	fn entries(&self) -> Result<Vec<(String, RawValue)>> {
		self.as_slice().entries()
	}
}

impl<K, V> Extractable for (K, V)
where
	K: AsRef<str>,
	V: ToRawValue,
{
	fn entries(&self) -> Result<Vec<(String, RawValue)>> {
		Ok(vec![(self.0.as_ref().to_string(), self.1.to_raw())])
	}
}

impl Extractable for Map<String, Value> {
	fn entries(&self) -> Result<Vec<(String, RawValue)>> {
		Ok(self.iter().map(|(k, v)| (k.clone(), v.to_raw())).collect())
	}
}

impl Extractable for Value {
	fn entries(&self) -> Result<Vec<(String, RawValue)>> {
		match self {
			Value::Null => Ok(Vec::new()),
			Value::Object(map) => map.entries(),
			Value::Bool(_) => Err(ExtractError::NotAContainer("bool")),
			Value::Number(_) => Err(ExtractError::NotAContainer("number")),
			Value::String(_) => Err(ExtractError::NotAContainer("string")),
			Value::Array(_) => Err(ExtractError::NotAContainer("array")),
		}
	}
}

/// Walks the public fields of a `Serialize` type.
///
/// `#[derive(Serialize)]` acts as the field descriptor. Field renames and
/// `skip_serializing_if` attributes are honoured. Timestamps serialized by
/// chrono arrive as RFC 3339 strings and stay strings.
///
/// ```
/// use pulse_analytics_core::{extract, NameFormat, Serialized};
///
/// #[derive(serde::Serialize)]
/// struct Signup {
///     plan: &'static str,
///     seats: u32,
/// }
///
/// let props = extract(&Serialized(Signup { plan: "pro", seats: 3 }), NameFormat::AsIs).unwrap();
/// assert_eq!(props.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Serialized<T>(pub T);

impl<T: Serialize> Extractable for Serialized<T> {
	fn entries(&self) -> Result<Vec<(String, RawValue)>> {
		serde_json::to_value(&self.0)?.entries()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{TimeZone, Utc};
	use proptest::prelude::*;

	fn custom(name: &str) -> PropertyKey {
		PropertyKey::Custom(name.to_string())
	}

	#[test]
	fn null_inputs_are_empty() {
		assert!(extract(&(), NameFormat::AsIs).unwrap().is_empty());
		assert!(extract(&None::<HashMap<String, i32>>, NameFormat::Dotted)
			.unwrap()
			.is_empty());
		assert!(extract(&Value::Null, NameFormat::AsIs).unwrap().is_empty());
	}

	#[test]
	fn recognizes_special_names_before_formatting() {
		let input = vec![("DistinctId", "u1"), ("FirstName", "Ada")];
		let props = extract(&input, NameFormat::Underscored).unwrap();
		assert_eq!(
			props,
			vec![
				(PropertyKey::Special(PropertyId::DistinctId), Value::from("u1")),
				(custom("first_name"), Value::from("Ada")),
			]
		);
	}

	#[test]
	fn times_become_epoch_seconds() {
		let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
		let props = extract(&("signed_up", t), NameFormat::AsIs).unwrap();
		assert_eq!(props[0].1, Value::from(t.timestamp()));
	}

	#[test]
	fn unsupported_values_are_dropped() {
		let input = vec![
			("ok", RawValue::Int(1)),
			("handle", RawValue::Unsupported("FileHandle")),
			("nan", RawValue::Float(f64::NAN)),
			("nothing", RawValue::Null),
			(
				"mixed",
				RawValue::Seq(vec![RawValue::Int(1), RawValue::Map(Vec::new())]),
			),
		];
		let props = extract(&input, NameFormat::AsIs).unwrap();
		assert_eq!(props, vec![(custom("ok"), Value::from(1))]);
	}

	#[test]
	fn sequences_of_primitives_are_kept_in_order() {
		let props = extract(&("tags", vec!["b", "a", "c"]), NameFormat::AsIs).unwrap();
		assert_eq!(props[0].1, serde_json::json!(["b", "a", "c"]));
	}

	#[test]
	fn nested_maps_keep_their_keys() {
		let json = serde_json::json!({"Cart": {"ItemCount": 2, "skip": null}});
		let props = extract(&json, NameFormat::Underscored).unwrap();
		assert_eq!(
			props,
			vec![(custom("cart"), serde_json::json!({"ItemCount": 2}))]
		);
	}

	#[test]
	fn deep_nesting_is_an_error() {
		let mut raw = RawValue::Int(1);
		for _ in 0..=MAX_NESTING_DEPTH {
			raw = RawValue::Map(vec![("inner".to_string(), raw)]);
		}
		let err = extract(&("root", raw), NameFormat::AsIs).unwrap_err();
		assert_eq!(
			err,
			ExtractError::TooDeep {
				max: MAX_NESTING_DEPTH
			}
		);
	}

	#[test]
	fn scalar_json_is_not_a_container() {
		let err = extract(&Value::from(5), NameFormat::AsIs).unwrap_err();
		assert_eq!(err, ExtractError::NotAContainer("number"));
	}

	#[test]
	fn serialized_structs_expose_fields() {
		#[derive(Serialize)]
		struct Purchase {
			sku: String,
			#[serde(rename = "Price")]
			price: f64,
			#[serde(skip_serializing_if = "Option::is_none")]
			coupon: Option<String>,
		}

		let props = extract(
			&Serialized(Purchase {
				sku: "A-1".to_string(),
				price: 9.5,
				coupon: None,
			}),
			NameFormat::LowerCase,
		)
		.unwrap();

		assert_eq!(props.len(), 2);
		assert!(props.contains(&(custom("price"), Value::from(9.5))));
		assert!(props.contains(&(custom("sku"), Value::from("A-1"))));
	}

	#[test]
	fn duplicate_names_are_all_emitted_in_order() {
		let input = vec![("plan", "free"), ("Plan", "pro")];
		let props = extract(&input, NameFormat::LowerCase).unwrap();
		assert_eq!(
			props,
			vec![
				(custom("plan"), Value::from("free")),
				(custom("plan"), Value::from("pro")),
			]
		);
	}

	proptest! {
		#[test]
		fn extraction_preserves_entry_count_for_plain_strings(
			entries in proptest::collection::vec(("[a-z]{1,8}", "[a-z0-9]{0,8}"), 0..20)
		) {
			let props = extract(&entries, NameFormat::AsIs).unwrap();
			prop_assert_eq!(props.len(), entries.len());
		}

		#[test]
		fn none_is_always_empty(format in prop_oneof![
			Just(NameFormat::AsIs),
			Just(NameFormat::Dotted),
			Just(NameFormat::Underscored),
		]) {
			let input: Option<Vec<(String, i64)>> = None;
			prop_assert!(extract(&input, format).unwrap().is_empty());
		}
	}
}
