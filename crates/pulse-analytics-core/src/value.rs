// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loosely-typed input values.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::time::SystemTime;

use chrono::{DateTime, FixedOffset, Utc};

/// A value as supplied by the caller, before normalization.
///
/// [`RawValue::Unsupported`] stands in for values the wire format cannot
/// express; extraction drops them without error.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
	Null,
	Bool(bool),
	Int(i64),
	UInt(u64),
	Float(f64),
	String(String),
	Time(DateTime<Utc>),
	Seq(Vec<RawValue>),
	Map(Vec<(String, RawValue)>),
	Unsupported(&'static str),
}

impl RawValue {
	/// True for values allowed as sequence elements.
	pub fn is_primitive(&self) -> bool {
		matches!(
			self,
			RawValue::Bool(_)
				| RawValue::Int(_)
				| RawValue::UInt(_)
				| RawValue::Float(_)
				| RawValue::String(_)
				| RawValue::Time(_)
		)
	}
}

/// Conversion of caller values into [`RawValue`].
pub trait ToRawValue {
	fn to_raw(&self) -> RawValue;
}

impl<T: ToRawValue + ?Sized> ToRawValue for &T {
	fn to_raw(&self) -> RawValue {
		(**self).to_raw()
	}
}

impl ToRawValue for RawValue {
	fn to_raw(&self) -> RawValue {
		self.clone()
	}
}

impl ToRawValue for bool {
	fn to_raw(&self) -> RawValue {
		RawValue::Bool(*self)
	}
}

macro_rules! signed_to_raw {
	($($ty:ty),*) => {
		$(impl ToRawValue for $ty {
			fn to_raw(&self) -> RawValue {
				RawValue::Int(i64::from(*self))
			}
		})*
	};
}

macro_rules! unsigned_to_raw {
	($($ty:ty),*) => {
		$(impl ToRawValue for $ty {
			fn to_raw(&self) -> RawValue {
				RawValue::UInt(u64::from(*self))
			}
		})*
	};
}

signed_to_raw!(i8, i16, i32, i64);
unsigned_to_raw!(u8, u16, u32, u64);

impl ToRawValue for isize {
	fn to_raw(&self) -> RawValue {
		RawValue::Int(*self as i64)
	}
}

impl ToRawValue for usize {
	fn to_raw(&self) -> RawValue {
		RawValue::UInt(*self as u64)
	}
}

impl ToRawValue for f32 {
	fn to_raw(&self) -> RawValue {
		RawValue::Float(f64::from(*self))
	}
}

impl ToRawValue for f64 {
	fn to_raw(&self) -> RawValue {
		RawValue::Float(*self)
	}
}

impl ToRawValue for str {
	fn to_raw(&self) -> RawValue {
		RawValue::String(self.to_string())
	}
}

impl ToRawValue for String {
	fn to_raw(&self) -> RawValue {
		RawValue::String(self.clone())
	}
}

impl ToRawValue for char {
	fn to_raw(&self) -> RawValue {
		RawValue::String(self.to_string())
	}
}

impl ToRawValue for DateTime<Utc> {
	fn to_raw(&self) -> RawValue {
		RawValue::Time(*self)
	}
}

impl ToRawValue for DateTime<FixedOffset> {
	fn to_raw(&self) -> RawValue {
		RawValue::Time(self.with_timezone(&Utc))
	}
}

impl ToRawValue for SystemTime {
	fn to_raw(&self) -> RawValue {
		RawValue::Time(DateTime::<Utc>::from(*self))
	}
}

impl<T: ToRawValue> ToRawValue for Option<T> {
	fn to_raw(&self) -> RawValue {
		match self {
			Some(v) => v.to_raw(),
			None => RawValue::Null,
		}
	}
}

impl<T: ToRawValue> ToRawValue for [T] {
	fn to_raw(&self) -> RawValue {
		RawValue::Seq(self.iter().map(ToRawValue::to_raw).collect())
	}
}

impl<T: ToRawValue> ToRawValue for Vec<T> {
	fn to_raw(&self) -> RawValue {
		self.as_slice().to_raw()
	}
}

impl<T: ToRawValue, S: BuildHasher> ToRawValue for HashMap<String, T, S> {
	fn to_raw(&self) -> RawValue {
		RawValue::Map(self.iter().map(|(k, v)| (k.clone(), v.to_raw())).collect())
	}
}

impl<T: ToRawValue> ToRawValue for BTreeMap<String, T> {
	fn to_raw(&self) -> RawValue {
		RawValue::Map(self.iter().map(|(k, v)| (k.clone(), v.to_raw())).collect())
	}
}

impl ToRawValue for serde_json::Value {
	fn to_raw(&self) -> RawValue {
		use serde_json::Value;

		match self {
			Value::Null => RawValue::Null,
			Value::Bool(b) => RawValue::Bool(*b),
			Value::Number(n) => {
				if let Some(i) = n.as_i64() {
					RawValue::Int(i)
				} else if let Some(u) = n.as_u64() {
					RawValue::UInt(u)
				} else {
					n.as_f64().map_or(RawValue::Unsupported("number"), RawValue::Float)
				}
			}
			Value::String(s) => RawValue::String(s.clone()),
			Value::Array(items) => RawValue::Seq(items.iter().map(ToRawValue::to_raw).collect()),
			Value::Object(map) => {
				RawValue::Map(map.iter().map(|(k, v)| (k.clone(), v.to_raw())).collect())
			}
		}
	}
}
