// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exception descriptors and the error values they are built from.

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::stacktrace::Stacktrace;

/// How an exception was captured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mechanism {
	/// "panic", "generic", "tracing"
	#[serde(rename = "type")]
	pub ty: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// `false` when the error reached a crash handler.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub handled: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub synthetic: Option<bool>,
}

impl Mechanism {
	pub fn new(ty: impl Into<String>) -> Self {
		Self {
			ty: ty.into(),
			..Default::default()
		}
	}

	pub fn handled(mut self, handled: bool) -> Self {
		self.handled = Some(handled);
		self
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}
}

/// A structured exception in an event's cause chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
	#[serde(rename = "type")]
	pub ty: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub module: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thread_id: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stacktrace: Option<Stacktrace>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mechanism: Option<Mechanism>,
}

/// Error used when only a message is known, e.g. a panic payload.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct MessageError(pub String);

/// The error an event was raised for.
///
/// Holds the original error value together with the capture metadata the
/// exception factory needs: the concrete type name (erased once boxed), the
/// capture mechanism, the thread it happened on, and an optional backtrace.
#[derive(Clone)]
pub struct Throwable {
	error: Arc<dyn Error + Send + Sync + 'static>,
	type_name: Option<String>,
	mechanism: Option<Mechanism>,
	thread_id: Option<u64>,
	backtrace: Option<Arc<Backtrace>>,
}

impl Throwable {
	/// Wraps an error, remembering its concrete type name.
	pub fn new<E>(error: E) -> Self
	where
		E: Error + Send + Sync + 'static,
	{
		Self {
			error: Arc::new(error),
			type_name: Some(std::any::type_name::<E>().to_string()),
			mechanism: None,
			thread_id: None,
			backtrace: None,
		}
	}

	/// Wraps an already type-erased error.
	pub fn from_boxed(error: Box<dyn Error + Send + Sync + 'static>) -> Self {
		Self {
			error: Arc::from(error),
			type_name: None,
			mechanism: None,
			thread_id: None,
			backtrace: None,
		}
	}

	/// A throwable that only carries a type and a message.
	pub fn from_message(type_name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			error: Arc::new(MessageError(message.into())),
			type_name: Some(type_name.into()),
			mechanism: None,
			thread_id: None,
			backtrace: None,
		}
	}

	pub fn with_mechanism(mut self, mechanism: Mechanism) -> Self {
		self.mechanism = Some(mechanism);
		self
	}

	pub fn with_thread_id(mut self, thread_id: u64) -> Self {
		self.thread_id = Some(thread_id);
		self
	}

	pub fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
		self.backtrace = Some(Arc::new(backtrace));
		self
	}

	pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
		self.error.as_ref()
	}

	pub fn type_name(&self) -> Option<&str> {
		self.type_name.as_deref()
	}

	pub fn mechanism(&self) -> Option<&Mechanism> {
		self.mechanism.as_ref()
	}

	pub fn thread_id(&self) -> Option<u64> {
		self.thread_id
	}

	pub fn backtrace(&self) -> Option<&Backtrace> {
		self.backtrace.as_deref()
	}
}

impl fmt::Debug for Throwable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Throwable")
			.field("type_name", &self.type_name)
			.field("error", &self.error.to_string())
			.field("mechanism", &self.mechanism)
			.field("thread_id", &self.thread_id)
			.finish_non_exhaustive()
	}
}

impl<E> From<E> for Throwable
where
	E: Error + Send + Sync + 'static,
{
	fn from(error: E) -> Self {
		Self::new(error)
	}
}
