// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wraps operations in child spans of the scope's running trace.
//!
//! # Example
//!
//! ```
//! use loom_monitor::{Scope, SpanInterceptor, Traced, TracedOperation, Transaction};
//!
//! struct UserRepository;
//!
//! let scope = Scope::default();
//! scope.set_transaction(Transaction::start("GET /users", None));
//!
//! let op = TracedOperation::for_type::<UserRepository>("find_all", Traced::new().operation("db"));
//! let users: Result<Vec<String>, std::io::Error> =
//!     SpanInterceptor::new().invoke(&scope, &op, || Ok(vec!["ada".to_string()]));
//!
//! assert!(users.is_ok());
//! let spans = scope.transaction().unwrap().spans();
//! assert_eq!(spans[0].description.as_deref(), Some("UserRepository.find_all"));
//! ```

use std::error::Error;
use std::panic::{self, AssertUnwindSafe};

use loom_monitor_core::{ErrorSnapshot, SpanStatus};
use tracing::debug;

use crate::panic_hook::payload_message;
use crate::scope::Scope;
use crate::span::Span;

/// Marks an operation as traced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Traced {
	pub description: Option<String>,
	pub operation: Option<String>,
}

impl Traced {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	pub fn operation(mut self, operation: impl Into<String>) -> Self {
		self.operation = Some(operation.into());
		self
	}
}

/// A traced method: where it is declared and how its span is labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracedOperation {
	declaring_type: String,
	method: String,
	traced: Traced,
}

impl TracedOperation {
	pub fn new(
		declaring_type: impl Into<String>,
		method: impl Into<String>,
		traced: Traced,
	) -> Self {
		Self {
			declaring_type: declaring_type.into(),
			method: method.into(),
			traced,
		}
	}

	/// Uses the short name of `T` as the declaring type.
	pub fn for_type<T: ?Sized>(method: impl Into<String>, traced: Traced) -> Self {
		Self::new(short_type_name::<T>(), method, traced)
	}

	pub fn declaring_type(&self) -> &str {
		&self.declaring_type
	}

	pub fn method(&self) -> &str {
		&self.method
	}

	pub fn traced(&self) -> &Traced {
		&self.traced
	}

	/// The span description: the explicit one, or `Type.method`.
	pub fn description(&self) -> String {
		match &self.traced.description {
			Some(description) => description.clone(),
			None => format!("{}.{}", self.declaring_type, self.method),
		}
	}
}

fn short_type_name<T: ?Sized>() -> &'static str {
	let full = std::any::type_name::<T>();
	let base_len = full.find('<').unwrap_or(full.len());
	match full[..base_len].rfind("::") {
		Some(idx) => &full[idx + 2..],
		None => full,
	}
}

/// Runs operations inside child spans.
///
/// Without a running transaction in the scope the operation runs untraced.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanInterceptor;

impl SpanInterceptor {
	pub fn new() -> Self {
		Self
	}

	/// Runs a fallible operation.
	///
	/// `Ok` finishes the span with status `Ok`. `Err` finishes it with
	/// `InternalError` and a snapshot of the error, which is then returned
	/// unchanged. A panic is recorded the same way and resumed.
	pub fn invoke<T, E, F>(&self, scope: &Scope, op: &TracedOperation, f: F) -> Result<T, E>
	where
		F: FnOnce() -> Result<T, E>,
		E: Error,
	{
		let Some(active) = scope.span() else {
			return f();
		};

		let span = active.start_span(op.traced.operation.clone(), Some(op.description()));
		let outcome = run_in_span(scope, &span, f);

		match &outcome {
			Ok(Ok(_)) => span.set_status(SpanStatus::Ok),
			Ok(Err(e)) => {
				span.set_status(SpanStatus::InternalError);
				span.set_throwable(ErrorSnapshot::of(short_type_name::<E>(), e));
			}
			Err(payload) => record_panic(&span, payload.as_ref()),
		}
		span.finish();

		match outcome {
			Ok(result) => result,
			Err(payload) => panic::resume_unwind(payload),
		}
	}

	/// Runs an operation that cannot return an error. Only a panic marks the
	/// span failed.
	pub fn invoke_infallible<T, F>(&self, scope: &Scope, op: &TracedOperation, f: F) -> T
	where
		F: FnOnce() -> T,
	{
		let Some(active) = scope.span() else {
			return f();
		};

		let span = active.start_span(op.traced.operation.clone(), Some(op.description()));
		let outcome = run_in_span(scope, &span, f);

		match &outcome {
			Ok(_) => span.set_status(SpanStatus::Ok),
			Err(payload) => record_panic(&span, payload.as_ref()),
		}
		span.finish();

		match outcome {
			Ok(value) => value,
			Err(payload) => panic::resume_unwind(payload),
		}
	}
}

type PanicPayload = Box<dyn std::any::Any + Send + 'static>;

/// Runs `f` with `span` as the scope's active span.
fn run_in_span<R>(scope: &Scope, span: &Span, f: impl FnOnce() -> R) -> Result<R, PanicPayload> {
	let _restore = RestoreSpan {
		scope,
		previous: scope.set_span(Some(span.clone())),
	};
	panic::catch_unwind(AssertUnwindSafe(f))
}

fn record_panic(span: &Span, payload: &(dyn std::any::Any + Send)) {
	let message = payload_message(payload);
	debug!(span_id = %span.span_id(), message = %message, "Traced operation panicked");
	span.set_status(SpanStatus::InternalError);
	span.set_throwable(ErrorSnapshot::new("panic", message));
}

struct RestoreSpan<'a> {
	scope: &'a Scope,
	previous: Option<Span>,
}

impl Drop for RestoreSpan<'_> {
	fn drop(&mut self) {
		self.scope.set_span(self.previous.take());
	}
}
