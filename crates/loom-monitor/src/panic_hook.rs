// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Panic hook integration for automatic crash reporting.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::Cell;
use std::panic::PanicHookInfo;
use std::sync::Arc;

use loom_monitor_core::{Event, Level, Mechanism, Throwable};
use tracing::warn;

use crate::client::ClientInner;
use crate::scope::Scope;
use crate::threads::current_thread_id;

/// Exception type reported for panics.
const PANIC_TYPE: &str = "panic";

const CAPTURE_THREAD_NAME: &str = "loom-monitor-panic";

thread_local! {
	/// Set on the thread that sends a panic event, so panics raised while
	/// sending are not captured again.
	static CAPTURING: Cell<bool> = const { Cell::new(false) };
}

/// Install a panic hook that captures panics as fatal events.
///
/// This function wraps the existing panic hook and captures the panic before
/// calling the original hook.
pub(crate) fn install_panic_hook(client: Arc<ClientInner>) {
	let default_hook = std::panic::take_hook();

	std::panic::set_hook(Box::new(move |info| {
		if !CAPTURING.with(Cell::get) {
			// Capture backtrace immediately
			let backtrace = Backtrace::force_capture();

			capture_panic(&client, info, backtrace);
		}

		default_hook(info);
	}));
}

fn capture_panic(client: &ClientInner, info: &PanicHookInfo<'_>, backtrace: Backtrace) {
	let event = panic_event(
		payload_message(info.payload()),
		info.location()
			.map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
		current_thread_id(),
		backtrace,
	);

	// A second panic on the panicking thread aborts the process, so the
	// processor chain runs on a helper thread.
	let sent = std::thread::scope(|s| {
		std::thread::Builder::new()
			.name(CAPTURE_THREAD_NAME.to_string())
			.spawn_scoped(s, move || {
				CAPTURING.with(|capturing| capturing.set(true));
				// the panicking context's scope is out of reach here
				let scope = Scope::for_options(client.options());
				client.capture_event(event, None, &scope)
			})
			.map(|handle| handle.join())
	});

	match sent {
		Ok(Ok(_)) => {}
		Ok(Err(_)) => warn!("Panicked while sending panic event"),
		Err(e) => warn!(error = %e, "Failed to spawn panic capture thread"),
	}
}

fn panic_event(
	message: String,
	location: Option<String>,
	thread_id: u64,
	backtrace: Backtrace,
) -> Event {
	let mut mechanism = Mechanism::new(PANIC_TYPE).handled(false);
	if let Some(location) = location {
		mechanism = mechanism.description(location);
	}

	let throwable = Throwable::from_message(PANIC_TYPE, message)
		.with_mechanism(mechanism)
		.with_thread_id(thread_id)
		.with_backtrace(backtrace);

	let mut event = Event::from_throwable(throwable);
	event.level = Some(Level::Fatal);
	event
}

/// Extract the panic message from a panic payload.
pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"Box<dyn Any>".to_string()
	}
}
