// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Live transaction and span handles.
//!
//! A [`Transaction`] is the root of a trace. Child [`Span`]s record into the
//! transaction's span list when they finish, in finish order. Both handles are
//! cheap to clone and safe to share between threads.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use loom_monitor_core::{ErrorSnapshot, SpanId, SpanRecord, SpanStatus, TraceId, TransactionEvent};
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct TransactionState {
	status: Option<SpanStatus>,
	tags: BTreeMap<String, String>,
	spans: Vec<SpanRecord>,
	finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct TransactionInner {
	name: String,
	op: Option<String>,
	trace_id: TraceId,
	span_id: SpanId,
	start_timestamp: DateTime<Utc>,
	state: Mutex<TransactionState>,
}

/// Handle to a running transaction.
#[derive(Debug, Clone)]
pub struct Transaction {
	inner: Arc<TransactionInner>,
}

impl Transaction {
	/// Starts a new transaction with a fresh trace id.
	pub fn start(name: impl Into<String>, op: Option<String>) -> Self {
		let name = name.into();
		let trace_id = TraceId::new();
		debug!(transaction = %name, trace_id = %trace_id, "Transaction started");

		Self {
			inner: Arc::new(TransactionInner {
				name,
				op,
				trace_id,
				span_id: SpanId::new(),
				start_timestamp: Utc::now(),
				state: Mutex::new(TransactionState::default()),
			}),
		}
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn op(&self) -> Option<&str> {
		self.inner.op.as_deref()
	}

	pub fn trace_id(&self) -> TraceId {
		self.inner.trace_id
	}

	pub fn span_id(&self) -> SpanId {
		self.inner.span_id
	}

	pub fn status(&self) -> Option<SpanStatus> {
		self.inner.state.lock().status
	}

	pub fn set_status(&self, status: SpanStatus) {
		self.inner.state.lock().status = Some(status);
	}

	pub fn set_tag(&self, key: impl Into<String>, value: impl Into<String>) {
		self.inner.state.lock().tags.insert(key.into(), value.into());
	}

	/// Starts a span directly under the transaction.
	pub fn start_child(&self, op: impl Into<String>, description: Option<String>) -> Span {
		self.start_span(Some(op.into()), description)
	}

	pub(crate) fn start_span(&self, op: Option<String>, description: Option<String>) -> Span {
		Span::start(self.clone(), self.span_id(), op, description)
	}

	/// Spans finished so far, in finish order.
	pub fn spans(&self) -> Vec<SpanRecord> {
		self.inner.state.lock().spans.clone()
	}

	pub fn is_finished(&self) -> bool {
		self.inner.state.lock().finished_at.is_some()
	}

	/// Finishes the transaction and snapshots it.
	///
	/// The end timestamp is fixed by the first call; spans finishing later
	/// still show up in later snapshots.
	pub fn finish(&self) -> TransactionEvent {
		let mut state = self.inner.state.lock();
		let timestamp = *state.finished_at.get_or_insert_with(Utc::now);

		let mut event = TransactionEvent::new(self.inner.name.clone());
		event.trace_id = self.inner.trace_id;
		event.span_id = self.inner.span_id;
		event.op = self.inner.op.clone();
		event.status = state.status;
		event.start_timestamp = self.inner.start_timestamp;
		event.timestamp = timestamp;
		event.spans = state.spans.clone();
		if !state.tags.is_empty() {
			event.base.tags = Some(state.tags.clone());
		}
		event
	}

	fn record(&self, span: SpanRecord) {
		self.inner.state.lock().spans.push(span);
	}
}

#[derive(Debug, Default)]
struct SpanState {
	description: Option<String>,
	status: Option<SpanStatus>,
	tags: BTreeMap<String, String>,
	throwable: Option<ErrorSnapshot>,
	finished: bool,
}

#[derive(Debug)]
struct SpanInner {
	transaction: Transaction,
	span_id: SpanId,
	parent_span_id: SpanId,
	op: Option<String>,
	start_timestamp: DateTime<Utc>,
	state: Mutex<SpanState>,
}

/// Handle to a running child span.
#[derive(Debug, Clone)]
pub struct Span {
	inner: Arc<SpanInner>,
}

impl Span {
	fn start(
		transaction: Transaction,
		parent_span_id: SpanId,
		op: Option<String>,
		description: Option<String>,
	) -> Self {
		Self {
			inner: Arc::new(SpanInner {
				transaction,
				span_id: SpanId::new(),
				parent_span_id,
				op,
				start_timestamp: Utc::now(),
				state: Mutex::new(SpanState {
					description,
					..Default::default()
				}),
			}),
		}
	}

	pub fn span_id(&self) -> SpanId {
		self.inner.span_id
	}

	pub fn parent_span_id(&self) -> SpanId {
		self.inner.parent_span_id
	}

	pub fn trace_id(&self) -> TraceId {
		self.inner.transaction.trace_id()
	}

	pub fn op(&self) -> Option<&str> {
		self.inner.op.as_deref()
	}

	pub fn transaction(&self) -> &Transaction {
		&self.inner.transaction
	}

	pub fn description(&self) -> Option<String> {
		self.inner.state.lock().description.clone()
	}

	pub fn set_description(&self, description: impl Into<String>) {
		self.inner.state.lock().description = Some(description.into());
	}

	pub fn status(&self) -> Option<SpanStatus> {
		self.inner.state.lock().status
	}

	pub fn set_status(&self, status: SpanStatus) {
		self.inner.state.lock().status = Some(status);
	}

	pub fn set_tag(&self, key: impl Into<String>, value: impl Into<String>) {
		self.inner.state.lock().tags.insert(key.into(), value.into());
	}

	pub fn throwable(&self) -> Option<ErrorSnapshot> {
		self.inner.state.lock().throwable.clone()
	}

	pub fn set_throwable(&self, throwable: ErrorSnapshot) {
		self.inner.state.lock().throwable = Some(throwable);
	}

	/// Starts a span nested under this one.
	pub fn start_child(&self, op: impl Into<String>, description: Option<String>) -> Span {
		self.start_span(Some(op.into()), description)
	}

	pub(crate) fn start_span(&self, op: Option<String>, description: Option<String>) -> Span {
		Span::start(
			self.inner.transaction.clone(),
			self.span_id(),
			op,
			description,
		)
	}

	pub fn is_finished(&self) -> bool {
		self.inner.state.lock().finished
	}

	/// Records the span in its transaction. Only the first call has an effect.
	pub fn finish(&self) {
		let record = {
			let mut state = self.inner.state.lock();
			if state.finished {
				return;
			}
			state.finished = true;

			SpanRecord {
				trace_id: self.trace_id(),
				span_id: self.inner.span_id,
				parent_span_id: Some(self.inner.parent_span_id),
				op: self.inner.op.clone(),
				description: state.description.clone(),
				status: state.status,
				start_timestamp: self.inner.start_timestamp,
				timestamp: Utc::now(),
				tags: state.tags.clone(),
				throwable: state.throwable.clone(),
			}
		};

		self.inner.transaction.record(record);
	}
}

/// The innermost span of the current execution context.
#[derive(Debug, Clone)]
pub enum ActiveSpan {
	Transaction(Transaction),
	Span(Span),
}

impl ActiveSpan {
	pub fn span_id(&self) -> SpanId {
		match self {
			ActiveSpan::Transaction(tx) => tx.span_id(),
			ActiveSpan::Span(span) => span.span_id(),
		}
	}

	pub fn trace_id(&self) -> TraceId {
		match self {
			ActiveSpan::Transaction(tx) => tx.trace_id(),
			ActiveSpan::Span(span) => span.trace_id(),
		}
	}

	pub fn start_child(&self, op: impl Into<String>, description: Option<String>) -> Span {
		self.start_span(Some(op.into()), description)
	}

	/// Like [`start_child`](Self::start_child) but the operation may be unset.
	pub(crate) fn start_span(&self, op: Option<String>, description: Option<String>) -> Span {
		match self {
			ActiveSpan::Transaction(tx) => tx.start_span(op, description),
			ActiveSpan::Span(span) => span.start_span(op, description),
		}
	}
}

impl From<Transaction> for ActiveSpan {
	fn from(tx: Transaction) -> Self {
		ActiveSpan::Transaction(tx)
	}
}

impl From<Span> for ActiveSpan {
	fn from(span: Span) -> Self {
		ActiveSpan::Span(span)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn child_span_links_to_transaction() {
		let tx = Transaction::start("GET /users", Some("http.server".to_string()));
		let span = tx.start_child("db.query", Some("SELECT users".to_string()));

		assert_eq!(span.trace_id(), tx.trace_id());
		assert_eq!(span.parent_span_id(), tx.span_id());
		assert_ne!(span.span_id(), tx.span_id());
	}

	#[test]
	fn nested_span_links_to_parent_span() {
		let tx = Transaction::start("job", None);
		let outer = tx.start_child("outer", None);
		let inner = outer.start_child("inner", None);

		inner.finish();
		outer.finish();

		let spans = tx.spans();
		assert_eq!(spans.len(), 2);
		assert_eq!(spans[0].parent_span_id, Some(outer.span_id()));
		assert_eq!(spans[1].parent_span_id, Some(tx.span_id()));
	}

	#[test]
	fn finish_is_idempotent() {
		let tx = Transaction::start("job", None);
		let span = tx.start_child("work", None);

		span.finish();
		span.finish();

		assert!(span.is_finished());
		assert_eq!(tx.spans().len(), 1);
	}

	#[test]
	fn span_record_carries_status_and_throwable() {
		let tx = Transaction::start("job", None);
		let span = tx.start_child("work", None);
		span.set_status(SpanStatus::InternalError);
		span.set_throwable(ErrorSnapshot::new("IoError", "disk gone"));
		span.set_tag("shard", "7");
		span.finish();

		let spans = tx.spans();
		let record = &spans[0];
		assert_eq!(record.status, Some(SpanStatus::InternalError));
		assert_eq!(record.throwable.as_ref().map(|t| t.message.as_str()), Some("disk gone"));
		assert_eq!(record.tags.get("shard").map(String::as_str), Some("7"));
	}

	#[test]
	fn span_without_operation_records_none() {
		let tx = Transaction::start("job", None);
		let span = tx.start_span(None, Some("untyped".to_string()));
		assert_eq!(span.op(), None);
		span.finish();

		let spans = tx.spans();
		assert_eq!(spans[0].op, None);
		assert_eq!(spans[0].description.as_deref(), Some("untyped"));
	}

	#[test]
	fn transaction_finish_snapshots_spans() {
		let tx = Transaction::start("GET /", Some("http.server".to_string()));
		tx.set_status(SpanStatus::Ok);
		tx.start_child("a", None).finish();

		let event = tx.finish();
		assert!(tx.is_finished());
		assert_eq!(event.name, "GET /");
		assert_eq!(event.op.as_deref(), Some("http.server"));
		assert_eq!(event.trace_id, tx.trace_id());
		assert_eq!(event.span_id, tx.span_id());
		assert_eq!(event.status, Some(SpanStatus::Ok));
		assert_eq!(event.spans.len(), 1);

		let again = tx.finish();
		assert_eq!(again.timestamp, event.timestamp);
	}

	#[test]
	fn concurrent_finishes_are_all_recorded() {
		let tx = Transaction::start("fan-out", None);

		std::thread::scope(|s| {
			for i in 0..16 {
				let tx = &tx;
				s.spawn(move || tx.start_child(format!("task-{i}"), None).finish());
			}
		});

		assert_eq!(tx.spans().len(), 16);
	}

	#[test]
	fn active_span_starts_children_at_the_right_level() {
		let tx = Transaction::start("job", None);
		let active = ActiveSpan::from(tx.clone());
		let child = active.start_child("child", None);
		assert_eq!(child.parent_span_id(), tx.span_id());

		let active = ActiveSpan::from(child.clone());
		let grandchild = active.start_child("grandchild", None);
		assert_eq!(grandchild.parent_span_id(), child.span_id());
		assert_eq!(active.trace_id(), tx.trace_id());
	}
}
