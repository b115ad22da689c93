// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Conversion of Rust backtraces into stack traces with in-app classification.

use std::backtrace::{Backtrace, BacktraceStatus};

use loom_monitor_core::{Frame, Stacktrace};
use rustc_demangle::demangle;

/// Function prefixes that never belong to application code.
const SYSTEM_PREFIXES: &[&str] = &[
	"std::",
	"core::",
	"alloc::",
	"<std::",
	"<core::",
	"<alloc::",
	"tokio::",
	"<tokio::",
	"futures::",
	"<futures::",
	"async_trait::",
	"tracing::",
	"<tracing::",
	"backtrace::",
	"<backtrace::",
	"panic_unwind::",
	"<panic_unwind::",
	"loom_monitor::",
	"<loom_monitor::",
	"loom_monitor_core::",
	"<loom_monitor_core::",
	"rust_begin_unwind",
	"rust_panic",
	"__rust_",
	"_rust_",
];

/// Path fragments of runtime plumbing.
const SYSTEM_CONTAINS: &[&str] = &[
	"::panic::",
	"::panicking::",
	"::thread::",
	"::rt::",
	"::runtime::",
	"::sys_common::",
];

/// Builds [`Stacktrace`]s and decides which frames are application code.
///
/// `in_app_includes` wins over `in_app_excludes`, which wins over the built-in
/// list of standard-library and runtime prefixes.
#[derive(Debug, Clone, Default)]
pub struct StacktraceFactory {
	in_app_includes: Vec<String>,
	in_app_excludes: Vec<String>,
}

impl StacktraceFactory {
	pub fn new(in_app_includes: Vec<String>, in_app_excludes: Vec<String>) -> Self {
		Self {
			in_app_includes,
			in_app_excludes,
		}
	}

	/// Captures the calling thread's stack.
	pub fn capture(&self) -> Option<Stacktrace> {
		self.from_backtrace(&Backtrace::force_capture())
	}

	/// Converts a captured backtrace; `None` if it was not captured.
	pub fn from_backtrace(&self, backtrace: &Backtrace) -> Option<Stacktrace> {
		if backtrace.status() != BacktraceStatus::Captured {
			return None;
		}
		let stacktrace = self.parse(&format!("{backtrace:#}"));
		(!stacktrace.is_empty()).then_some(stacktrace)
	}

	/// Parses the textual form of a backtrace.
	///
	/// Backtraces list the innermost call first; the returned frames are
	/// reversed so the outermost call comes first.
	pub fn parse(&self, text: &str) -> Stacktrace {
		let mut frames: Vec<Frame> = Vec::new();

		for line in text.lines() {
			let line = line.trim();
			if line.is_empty() {
				continue;
			}

			if let Some(location) = line.strip_prefix("at ") {
				if let Some(frame) = frames.last_mut() {
					apply_location(frame, location);
				}
				continue;
			}

			if let Some(frame) = self.parse_frame_line(line) {
				frames.push(frame);
			}
		}

		frames.reverse();
		Stacktrace { frames }
	}

	fn parse_frame_line(&self, line: &str) -> Option<Frame> {
		// "   5: my_app::main" or a bare symbol
		let function_part = match line.split_once(':') {
			Some((prefix, rest)) if prefix.trim().parse::<u32>().is_ok() => rest.trim(),
			_ => line,
		};

		if function_part.is_empty() {
			return None;
		}

		let demangled = demangle(function_part).to_string();
		let module = demangled.rfind("::").map(|idx| demangled[..idx].to_string());
		let in_app = self.is_in_app(&demangled);

		Some(Frame {
			function: Some(demangled),
			module,
			in_app,
			..Default::default()
		})
	}

	/// Whether a (demangled) function belongs to application code.
	pub fn is_in_app(&self, function: &str) -> bool {
		if self
			.in_app_includes
			.iter()
			.any(|prefix| function.starts_with(prefix.as_str()))
		{
			return true;
		}

		if self
			.in_app_excludes
			.iter()
			.any(|prefix| function.starts_with(prefix.as_str()))
		{
			return false;
		}

		!SYSTEM_PREFIXES.iter().any(|p| function.starts_with(p))
			&& !SYSTEM_CONTAINS.iter().any(|c| function.contains(c))
	}
}

/// Applies "path/to/file.rs:12:5" to a frame.
fn apply_location(frame: &mut Frame, location: &str) {
	let location = location.trim();
	let mut parts = location.rsplitn(3, ':');
	let col = parts.next().and_then(|s| s.parse::<u32>().ok());
	let line = parts.next().and_then(|s| s.parse::<u32>().ok());
	let path = parts.next();

	let (path, lineno, colno) = match (path, line, col) {
		(Some(path), Some(line), Some(col)) => (path, Some(line), Some(col)),
		_ => (location, None, None),
	};

	frame.abs_path = Some(path.to_string());
	frame.filename = path
		.rsplit(['/', '\\'])
		.next()
		.map(str::to_string);
	frame.lineno = lineno;
	frame.colno = colno;
}
