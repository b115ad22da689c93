// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Breadcrumbs: the trail of events recorded before an error was captured.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::level::Level;

/// A breadcrumb representing something that happened before an event.
///
/// `Clone` produces a fully independent copy: the `data` and `unknown` maps
/// are owned, so mutating one breadcrumb never shows through another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
	pub timestamp: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	/// "http", "navigation", "ui.click", "console"
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	/// "default", "http", "navigation", "user", "debug", "error"
	#[serde(rename = "type", skip_serializing_if = "Option::is_none")]
	pub ty: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub level: Option<Level>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub data: BTreeMap<String, String>,
	/// Attributes this SDK version does not model, kept for forward compatibility.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub unknown: Option<BTreeMap<String, serde_json::Value>>,
}

impl Default for Breadcrumb {
	fn default() -> Self {
		Self {
			timestamp: Utc::now(),
			message: None,
			category: None,
			ty: None,
			level: None,
			data: BTreeMap::new(),
			unknown: None,
		}
	}
}

impl Breadcrumb {
	/// Creates a breadcrumb stamped with the current time.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: Some(message.into()),
			..Default::default()
		}
	}

	/// Creates a breadcrumb with an explicit timestamp.
	pub fn with_timestamp(timestamp: DateTime<Utc>) -> Self {
		Self {
			timestamp,
			..Default::default()
		}
	}

	/// An outgoing HTTP request.
	pub fn http(url: impl Into<String>, method: impl Into<String>) -> Self {
		Self::default()
			.ty("http")
			.category("http")
			.data("url", url)
			.data("method", method.into().to_uppercase())
	}

	/// A navigation from one location to another.
	pub fn navigation(from: impl Into<String>, to: impl Into<String>) -> Self {
		Self::default()
			.ty("navigation")
			.category("navigation")
			.data("from", from)
			.data("to", to)
	}

	/// A user interaction.
	pub fn user(category: impl Into<String>, message: impl Into<String>) -> Self {
		Self::new(message).ty("user").category(category)
	}

	pub fn debug(message: impl Into<String>) -> Self {
		Self::new(message).ty("debug").level(Level::Debug)
	}

	pub fn info(message: impl Into<String>) -> Self {
		Self::new(message).ty("info").level(Level::Info)
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self::new(message).ty("error").level(Level::Error)
	}

	pub fn message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());
		self
	}

	pub fn category(mut self, category: impl Into<String>) -> Self {
		self.category = Some(category.into());
		self
	}

	pub fn ty(mut self, ty: impl Into<String>) -> Self {
		self.ty = Some(ty.into());
		self
	}

	pub fn level(mut self, level: Level) -> Self {
		self.level = Some(level);
		self
	}

	/// Adds a data entry, replacing any previous value for the key.
	pub fn data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.data.insert(key.into(), value.into());
		self
	}

	/// Stores an attribute that has no dedicated field.
	pub fn set_unknown(&mut self, key: impl Into<String>, value: serde_json::Value) {
		self.unknown
			.get_or_insert_with(BTreeMap::new)
			.insert(key.into(), value);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn new_sets_message_and_timestamp() {
		let before = Utc::now();
		let crumb = Breadcrumb::new("started");
		assert_eq!(crumb.message.as_deref(), Some("started"));
		assert!(crumb.timestamp >= before);
	}

	#[test]
	fn http_breadcrumb_uppercases_method() {
		let crumb = Breadcrumb::http("https://example.com", "get");
		assert_eq!(crumb.ty.as_deref(), Some("http"));
		assert_eq!(crumb.data.get("method").map(String::as_str), Some("GET"));
		assert_eq!(
			crumb.data.get("url").map(String::as_str),
			Some("https://example.com")
		);
	}

	#[test]
	fn clone_is_deep() {
		let mut original = Breadcrumb::new("msg")
			.category("ui")
			.ty("user")
			.level(Level::Warning)
			.data("a", "1");
		original.set_unknown("extra", serde_json::json!({"k": "v"}));

		let clone = original.clone();

		original.data.insert("b".to_string(), "2".to_string());
		original.data.insert("a".to_string(), "changed".to_string());
		original.set_unknown("other", serde_json::json!(1));

		assert_eq!(clone.data.len(), 1);
		assert_eq!(clone.data.get("a").map(String::as_str), Some("1"));
		assert_eq!(clone.unknown.as_ref().map(BTreeMap::len), Some(1));
		assert_eq!(clone.message, original.message);
		assert_eq!(clone.category, original.category);
		assert_eq!(clone.ty, original.ty);
		assert_eq!(clone.level, original.level);
		assert_eq!(clone.timestamp, original.timestamp);
	}

	#[test]
	fn serializes_type_field_name() {
		let crumb = Breadcrumb::new("x").ty("navigation");
		let json = serde_json::to_value(&crumb).unwrap();
		assert_eq!(json["type"], "navigation");
		assert!(json.get("data").is_none());
	}

	proptest! {
		#[test]
		fn mutating_clone_never_touches_original(
			entries in proptest::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..10),
			key in "[a-z]{1,8}",
		) {
			let mut original = Breadcrumb::default();
			original.data = entries.clone();
			let mut clone = original.clone();

			clone.data.insert(key.clone(), "mutated".to_string());
			clone.set_unknown(key, serde_json::Value::Null);

			prop_assert_eq!(&original.data, &entries);
			prop_assert!(original.unknown.is_none());
		}
	}
}
