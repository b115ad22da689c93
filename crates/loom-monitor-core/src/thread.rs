// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Thread snapshots attached to events.

use serde::{Deserialize, Serialize};

use crate::stacktrace::Stacktrace;

/// A thread that was alive when the event was captured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
	pub id: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// The thread the error happened on.
	pub crashed: bool,
	/// The thread that captured the event.
	pub current: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stacktrace: Option<Stacktrace>,
}
