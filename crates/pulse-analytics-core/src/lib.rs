// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the pulse analytics client.
//!
//! This crate holds the pieces of the message pipeline that do no I/O:
//!
//! - [`PropertyId`] / [`PropertyKey`]: semantic property identifiers
//! - [`MessageKind`] / [`Category`]: message kinds and their routing
//! - [`RawValue`] / [`ToRawValue`]: loosely-typed caller values
//! - [`Extractable`] / [`extract`]: the property extractor
//! - [`NameFormat`]: custom property name conversion
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use pulse_analytics_core::{extract, NameFormat, PropertyId, PropertyKey};
//!
//! let mut input = HashMap::new();
//! input.insert("$distinct_id", "user_123");
//! input.insert("PlanName", "pro");
//!
//! let props = extract(&input, NameFormat::Underscored).unwrap();
//! assert!(props.iter().any(|(k, _)| *k == PropertyKey::Special(PropertyId::DistinctId)));
//! assert!(props.iter().any(|(k, _)| *k == PropertyKey::Custom("plan_name".to_string())));
//! ```

pub mod error;
pub mod extract;
pub mod kind;
pub mod naming;
pub mod property;
pub mod value;

pub use error::{ExtractError, Result};
pub use extract::{extract, normalize, Extractable, Serialized, MAX_NESTING_DEPTH};
pub use kind::{Category, MessageKind};
pub use naming::NameFormat;
pub use property::{PropertyId, PropertyKey};
pub use value::{RawValue, ToRawValue};
