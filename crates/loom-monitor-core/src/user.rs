// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The user an event is attributed to.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire-protocol marker asking the collector to infer the IP address from the
/// incoming connection. Must be sent verbatim.
pub const DEFAULT_IP_ADDRESS: &str = "{{auto}}";

/// User information attached to events and transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// IP address (sensitive - only sent when default PII is enabled)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ip_address: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub others: Option<BTreeMap<String, String>>,
}

impl User {
	/// A user whose address is inferred by the collector.
	pub fn with_default_ip() -> Self {
		Self {
			ip_address: Some(DEFAULT_IP_ADDRESS.to_string()),
			..Default::default()
		}
	}

	/// True when every field is unset.
	pub fn is_empty(&self) -> bool {
		self.id.is_none()
			&& self.username.is_none()
			&& self.email.is_none()
			&& self.ip_address.is_none()
			&& self.others.is_none()
	}

	/// True when the IP address is the `{{auto}}` marker.
	pub fn has_default_ip(&self) -> bool {
		self.ip_address.as_deref() == Some(DEFAULT_IP_ADDRESS)
	}

	/// Fills every unset field from `other`.
	///
	/// Fields already present on `self` are never replaced. The `others` maps
	/// are merged key by key and `self` wins on conflicting keys.
	pub fn merge_missing_from(&mut self, other: &User) {
		fill(&mut self.id, &other.id);
		fill(&mut self.username, &other.username);
		fill(&mut self.email, &other.email);
		fill(&mut self.ip_address, &other.ip_address);

		if let Some(theirs) = &other.others {
			let ours = self.others.get_or_insert_with(BTreeMap::new);
			for (key, value) in theirs {
				ours.entry(key.clone()).or_insert_with(|| value.clone());
			}
		}
	}
}

fn fill(target: &mut Option<String>, source: &Option<String>) {
	if target.is_none() {
		target.clone_from(source);
	}
}
