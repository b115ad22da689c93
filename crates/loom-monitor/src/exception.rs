// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Conversion of errors and their cause chains into exception descriptors.

use std::error::Error;

use loom_monitor_core::{Exception, Throwable};

use crate::stacktrace::StacktraceFactory;

/// Upper bound on the number of causes walked, guarding against cyclic
/// `source()` implementations.
pub const MAX_CAUSES: usize = 32;

/// Builds the `exceptions` list of an event from its throwable.
#[derive(Debug, Clone, Default)]
pub struct ExceptionFactory {
	stacktraces: StacktraceFactory,
}

impl ExceptionFactory {
	pub fn new(stacktraces: StacktraceFactory) -> Self {
		Self { stacktraces }
	}

	/// Converts a throwable and its `source()` chain.
	///
	/// The innermost cause comes first and the throwable itself last. Only
	/// the throwable carries the mechanism, the thread id and the stack trace.
	pub fn from_throwable(&self, throwable: &Throwable) -> Vec<Exception> {
		let outer = throwable.error();
		let outer_type = throwable
			.type_name()
			.map(str::to_string)
			.unwrap_or_else(|| debug_type_name(outer));

		let (ty, module) = split_type_name(&outer_type);
		let mut exceptions = vec![Exception {
			ty,
			value: Some(outer.to_string()),
			module,
			thread_id: throwable.thread_id(),
			stacktrace: throwable
				.backtrace()
				.and_then(|backtrace| self.stacktraces.from_backtrace(backtrace)),
			mechanism: throwable.mechanism().cloned(),
		}];

		let mut next = outer.source();
		while let Some(cause) = next {
			if exceptions.len() > MAX_CAUSES {
				break;
			}
			exceptions.push(Exception {
				ty: debug_type_name(cause),
				value: Some(cause.to_string()),
				..Default::default()
			});
			next = cause.source();
		}

		exceptions.reverse();
		exceptions
	}
}

/// Splits "my_app::db::QueryError" into ("QueryError", Some("my_app::db")).
fn split_type_name(full: &str) -> (String, Option<String>) {
	let base_len = full.find('<').unwrap_or(full.len());
	match full[..base_len].rfind("::") {
		Some(idx) => (full[idx + 2..].to_string(), Some(full[..idx].to_string())),
		None => (full.to_string(), None),
	}
}

/// Best-effort type name of a type-erased error, taken from the leading
/// identifier of its `Debug` output.
fn debug_type_name(error: &(dyn Error + 'static)) -> String {
	let rendered = format!("{error:?}");
	let name: String = rendered
		.chars()
		.take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
		.collect();
	let name = name.trim_end_matches(':');

	if name.is_empty() || !name.starts_with(|c: char| c.is_alphabetic()) {
		"Error".to_string()
	} else {
		name.to_string()
	}
}
