// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Snapshots of the live threads of the process.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

use loom_monitor_core::ThreadInfo;

use crate::stacktrace::StacktraceFactory;

/// A thread as reported by a [`ThreadSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveThread {
	pub id: u64,
	pub name: Option<String>,
	pub current: bool,
}

/// Enumerates the threads of the running process.
pub trait ThreadSource: Send + Sync {
	fn threads(&self) -> Vec<LiveThread>;
}

impl<T: ThreadSource + ?Sized> ThreadSource for Box<T> {
	fn threads(&self) -> Vec<LiveThread> {
		(**self).threads()
	}
}

/// Reads `/proc/self/task` on Linux; elsewhere only the calling thread is
/// known.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcThreadSource;

impl ThreadSource for ProcThreadSource {
	fn threads(&self) -> Vec<LiveThread> {
		let current = current_thread_id();
		match proc_threads(current) {
			Some(threads) if !threads.is_empty() => threads,
			_ => vec![LiveThread {
				id: current,
				name: std::thread::current().name().map(str::to_string),
				current: true,
			}],
		}
	}
}

#[cfg(target_os = "linux")]
fn proc_threads(current: u64) -> Option<Vec<LiveThread>> {
	let entries = std::fs::read_dir("/proc/self/task").ok()?;
	let mut threads: Vec<LiveThread> = entries
		.filter_map(|entry| entry.ok())
		.filter_map(|entry| {
			let id = entry.file_name().to_str()?.parse::<u64>().ok()?;
			let name = std::fs::read_to_string(entry.path().join("comm"))
				.ok()
				.map(|comm| comm.trim().to_string())
				.filter(|comm| !comm.is_empty());
			Some(LiveThread {
				id,
				name,
				current: id == current,
			})
		})
		.collect();
	threads.sort_by_key(|t| t.id);
	Some(threads)
}

#[cfg(not(target_os = "linux"))]
fn proc_threads(_current: u64) -> Option<Vec<LiveThread>> {
	None
}

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
	static FALLBACK_ID: Cell<u64> = const { Cell::new(0) };
}

/// Id of the calling thread.
///
/// The kernel thread id on Linux, so it matches the ids returned by
/// [`ProcThreadSource`]; a process-unique counter elsewhere.
pub fn current_thread_id() -> u64 {
	#[cfg(target_os = "linux")]
	{
		if let Some(tid) = std::fs::read_link("/proc/thread-self")
			.ok()
			.and_then(|link| link.file_name()?.to_str()?.parse::<u64>().ok())
		{
			return tid;
		}
	}

	FALLBACK_ID.with(|id| {
		if id.get() == 0 {
			id.set(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed));
		}
		id.get()
	})
}

/// Builds the `threads` list of an event.
pub struct ThreadFactory {
	source: Box<dyn ThreadSource>,
	stacktraces: StacktraceFactory,
}

impl ThreadFactory {
	pub fn new(stacktraces: StacktraceFactory) -> Self {
		Self::with_source(ProcThreadSource, stacktraces)
	}

	pub fn with_source(
		source: impl ThreadSource + 'static,
		stacktraces: StacktraceFactory,
	) -> Self {
		Self {
			source: Box::new(source),
			stacktraces,
		}
	}

	/// All live threads.
	///
	/// With `mechanism_thread_ids` the listed threads are marked crashed;
	/// without them the current thread is. Only the current thread gets a
	/// stack trace.
	pub fn current_threads(&self, mechanism_thread_ids: Option<&[u64]>) -> Vec<ThreadInfo> {
		self.source
			.threads()
			.into_iter()
			.map(|thread| {
				let crashed = match mechanism_thread_ids {
					Some(ids) => ids.contains(&thread.id),
					None => thread.current,
				};
				self.snapshot(thread, crashed)
			})
			.collect()
	}

	/// Only the calling thread, with its stack trace.
	pub fn current_thread(&self) -> Vec<ThreadInfo> {
		self.source
			.threads()
			.into_iter()
			.filter(|thread| thread.current)
			.map(|thread| self.snapshot(thread, false))
			.collect()
	}

	fn snapshot(&self, thread: LiveThread, crashed: bool) -> ThreadInfo {
		let stacktrace = if thread.current {
			self.stacktraces.capture()
		} else {
			None
		};
		ThreadInfo {
			id: thread.id,
			name: thread.name,
			crashed,
			current: thread.current,
			stacktrace,
		}
	}
}

impl std::fmt::Debug for ThreadFactory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ThreadFactory")
			.field("stacktraces", &self.stacktraces)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct FixedThreads;

	impl ThreadSource for FixedThreads {
		fn threads(&self) -> Vec<LiveThread> {
			vec![
				LiveThread {
					id: 1,
					name: Some("main".to_string()),
					current: false,
				},
				LiveThread {
					id: 2,
					name: Some("worker".to_string()),
					current: true,
				},
				LiveThread {
					id: 3,
					name: None,
					current: false,
				},
			]
		}
	}

	fn factory() -> ThreadFactory {
		ThreadFactory::with_source(FixedThreads, StacktraceFactory::default())
	}

	#[test]
	fn test_mechanism_ids_mark_crashed() {
		let threads = factory().current_threads(Some(&[3]));

		assert_eq!(threads.len(), 3);
		let crashed: Vec<_> = threads.iter().filter(|t| t.crashed).map(|t| t.id).collect();
		assert_eq!(crashed, vec![3]);
	}

	#[test]
	fn test_without_ids_current_is_crashed() {
		let threads = factory().current_threads(None);
		let crashed: Vec<_> = threads.iter().filter(|t| t.crashed).map(|t| t.id).collect();
		assert_eq!(crashed, vec![2]);
	}

	#[test]
	fn test_only_current_thread_has_stacktrace_slot() {
		let threads = factory().current_threads(None);
		for thread in threads.iter().filter(|t| !t.current) {
			assert!(thread.stacktrace.is_none());
		}
	}

	#[test]
	fn test_current_thread_only() {
		let threads = factory().current_thread();
		assert_eq!(threads.len(), 1);
		assert_eq!(threads[0].id, 2);
		assert!(threads[0].current);
		assert!(!threads[0].crashed);
	}

	#[test]
	fn test_proc_source_includes_current_thread() {
		let id = current_thread_id();
		let threads = ProcThreadSource.threads();

		assert!(threads.iter().any(|t| t.current && t.id == id));
	}

	#[test]
	fn test_thread_ids_are_stable_and_distinct() {
		let here = current_thread_id();
		assert_eq!(here, current_thread_id());

		let there = std::thread::spawn(current_thread_id).join().unwrap();
		assert_ne!(here, there);
	}
}
