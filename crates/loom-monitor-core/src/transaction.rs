// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Finished transactions, ready for the processor chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{BaseEvent, EventBase};
use crate::span::{SpanRecord, SpanStatus};
use crate::{SpanId, TraceId};

/// A completed transaction together with the spans recorded under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEvent {
	#[serde(flatten)]
	pub base: EventBase,
	/// Name of the unit of work, e.g. "GET /users/{id}"
	pub name: String,
	pub trace_id: TraceId,
	pub span_id: SpanId,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub op: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<SpanStatus>,
	pub start_timestamp: DateTime<Utc>,
	pub timestamp: DateTime<Utc>,
	/// Spans in the order they finished.
	#[serde(default)]
	pub spans: Vec<SpanRecord>,
}

impl TransactionEvent {
	pub fn new(name: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			base: EventBase::default(),
			name: name.into(),
			trace_id: TraceId::new(),
			span_id: SpanId::new(),
			op: None,
			status: None,
			start_timestamp: now,
			timestamp: now,
			spans: Vec::new(),
		}
	}
}

impl BaseEvent for TransactionEvent {
	fn base(&self) -> &EventBase {
		&self.base
	}

	fn base_mut(&mut self) -> &mut EventBase {
		&mut self.base
	}
}
