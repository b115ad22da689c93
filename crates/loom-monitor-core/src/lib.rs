// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom error-monitoring SDK.
//!
//! This crate holds the data model shared by the SDK and anything that
//! inspects its output: events and transactions, breadcrumbs, users,
//! exception descriptors, thread snapshots and finished spans. It performs no
//! I/O; enrichment and tracing live in `loom-monitor`.
//!
//! # Overview
//!
//! - [`Event`] and [`TransactionEvent`] share an [`EventBase`] (release,
//!   environment, tags, user, ...) reachable through the [`BaseEvent`] trait
//! - [`Breadcrumb`] clones are deep, so trails can be copied between scopes
//! - [`User`] knows how to merge itself with another user without overwriting
//! - [`Hint`] tells processors whether an event belongs to this execution

pub mod breadcrumb;
pub mod error;
pub mod event;
pub mod exception;
pub mod hint;
pub mod level;
pub mod span;
pub mod stacktrace;
pub mod thread;
pub mod transaction;
pub mod user;

pub use breadcrumb::Breadcrumb;
pub use error::{CoreError, Result};
pub use event::{BaseEvent, Event, EventBase, SdkVersion, DEFAULT_PLATFORM};
pub use exception::{Exception, Mechanism, MessageError, Throwable};
pub use hint::{should_apply_scope_data, Hint, HintOrigin};
pub use level::Level;
pub use span::{ErrorSnapshot, SpanRecord, SpanStatus};
pub use stacktrace::{Frame, Stacktrace};
pub use thread::ThreadInfo;
pub use transaction::TransactionEvent;
pub use user::{User, DEFAULT_IP_ADDRESS};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}
}

impl Default for EventId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for EventId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for EventId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Identifier shared by every span of one trace. Rendered as 32 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(pub Uuid);

impl TraceId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for TraceId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for TraceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.simple())
	}
}

impl FromStr for TraceId {
	type Err = CoreError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Uuid::parse_str(s)
			.map(Self)
			.map_err(|_| CoreError::InvalidTraceId(s.to_string()))
	}
}

/// Identifier of a single span. Rendered as 16 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(pub u64);

impl SpanId {
	pub fn new() -> Self {
		let (_, low) = Uuid::new_v4().as_u64_pair();
		Self(low)
	}
}

impl Default for SpanId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for SpanId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:016x}", self.0)
	}
}

impl FromStr for SpanId {
	type Err = CoreError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		if s.len() != 16 {
			return Err(CoreError::InvalidSpanId(s.to_string()));
		}
		u64::from_str_radix(s, 16)
			.map(Self)
			.map_err(|_| CoreError::InvalidSpanId(s.to_string()))
	}
}

macro_rules! hex_id_serde {
	($ty:ty) => {
		impl Serialize for $ty {
			fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
			where
				S: Serializer,
			{
				serializer.collect_str(self)
			}
		}

		impl<'de> Deserialize<'de> for $ty {
			fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
			where
				D: Deserializer<'de>,
			{
				let s = String::deserialize(deserializer)?;
				s.parse().map_err(serde::de::Error::custom)
			}
		}
	};
}

hex_id_serde!(TraceId);
hex_id_serde!(SpanId);
