// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error events and the fields they share with transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::breadcrumb::Breadcrumb;
use crate::exception::{Exception, Throwable};
use crate::level::Level;
use crate::thread::ThreadInfo;
use crate::user::User;
use crate::EventId;

/// Platform reported for events raised by this SDK.
pub const DEFAULT_PLATFORM: &str = "rust";

/// Name and version of the SDK that produced an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkVersion {
	pub name: String,
	pub version: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub integrations: Vec<String>,
}

impl SdkVersion {
	pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			version: version.into(),
			integrations: Vec::new(),
		}
	}

	pub fn add_integration(&mut self, integration: impl Into<String>) {
		let integration = integration.into();
		if !self.integrations.contains(&integration) {
			self.integrations.push(integration);
		}
	}
}

/// Fields common to error events and transactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBase {
	pub event_id: EventId,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub platform: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub release: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub server_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dist: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub sdk: Option<SdkVersion>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tags: Option<BTreeMap<String, String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user: Option<User>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub breadcrumbs: Vec<Breadcrumb>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub extra: BTreeMap<String, serde_json::Value>,
}

impl EventBase {
	pub fn tag(&self, key: &str) -> Option<&str> {
		self.tags.as_ref()?.get(key).map(String::as_str)
	}

	pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.tags
			.get_or_insert_with(BTreeMap::new)
			.insert(key.into(), value.into());
	}

	pub fn remove_tag(&mut self, key: &str) -> Option<String> {
		self.tags.as_mut()?.remove(key)
	}
}

/// Shared access to the [`EventBase`] of events and transactions.
pub trait BaseEvent {
	fn base(&self) -> &EventBase;
	fn base_mut(&mut self) -> &mut EventBase;
}

/// An error or message event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
	#[serde(flatten)]
	pub base: EventBase,
	pub timestamp: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub level: Option<Level>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub logger: Option<String>,
	/// The error this event was raised for. Converted into `exceptions` by the
	/// processor chain and never sent as-is.
	#[serde(skip)]
	pub throwable: Option<Throwable>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub exceptions: Option<Vec<Exception>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub threads: Option<Vec<ThreadInfo>>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub fingerprint: Vec<String>,
}

impl Default for Event {
	fn default() -> Self {
		Self {
			base: EventBase::default(),
			timestamp: Utc::now(),
			message: None,
			level: None,
			logger: None,
			throwable: None,
			exceptions: None,
			threads: None,
			fingerprint: Vec::new(),
		}
	}
}

impl Event {
	pub fn new() -> Self {
		Self::default()
	}

	/// An event raised for an error.
	pub fn from_throwable(throwable: impl Into<Throwable>) -> Self {
		Self {
			level: Some(Level::Error),
			throwable: Some(throwable.into()),
			..Default::default()
		}
	}

	/// A plain message event.
	pub fn from_message(message: impl Into<String>, level: Level) -> Self {
		Self {
			message: Some(message.into()),
			level: Some(level),
			..Default::default()
		}
	}

	pub fn event_id(&self) -> EventId {
		self.base.event_id
	}

	pub fn has_exceptions(&self) -> bool {
		self.exceptions.as_ref().is_some_and(|e| !e.is_empty())
	}
}

impl BaseEvent for Event {
	fn base(&self) -> &EventBase {
		&self.base
	}

	fn base_mut(&mut self) -> &mut EventBase {
		&mut self.base
	}
}
