// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The processor that fills in SDK-wide defaults, exceptions and threads.

use std::collections::BTreeMap;
use std::sync::Arc;

use loom_monitor_core::{
	should_apply_scope_data, BaseEvent, Event, Hint, TransactionEvent, User, DEFAULT_IP_ADDRESS,
	DEFAULT_PLATFORM,
};
use tracing::debug;

use super::EventProcessor;
use crate::exception::ExceptionFactory;
use crate::hostname::{HostnameCache, HostnameProvider};
use crate::options::Options;
use crate::stacktrace::StacktraceFactory;
use crate::threads::{ThreadFactory, ThreadSource};

/// Environment reported when none is configured.
const DEFAULT_ENVIRONMENT: &str = "production";

/// Always the first processor of a client's chain.
///
/// Events replayed from cache (see [`Hint`]) only get the platform and their
/// exceptions: release, environment, tags and threads describe the current
/// process, not the one that recorded the event.
pub struct MainEventProcessor {
	options: Arc<Options>,
	stacktraces: StacktraceFactory,
	exceptions: ExceptionFactory,
	threads: ThreadFactory,
	hostname: Arc<dyn HostnameProvider>,
}

impl MainEventProcessor {
	pub fn new(options: Arc<Options>) -> Self {
		let stacktraces = StacktraceFactory::new(
			options.in_app_includes.clone(),
			options.in_app_excludes.clone(),
		);
		let hostname = Arc::new(HostnameCache::new(options.hostname_cache_ttl));

		Self {
			exceptions: ExceptionFactory::new(stacktraces.clone()),
			threads: ThreadFactory::new(stacktraces.clone()),
			stacktraces,
			hostname,
			options,
		}
	}

	/// Replaces the OS hostname lookup.
	pub fn with_hostname_provider(mut self, provider: Arc<dyn HostnameProvider>) -> Self {
		self.hostname = provider;
		self
	}

	/// Replaces the source of live threads.
	pub fn with_thread_source(mut self, source: impl ThreadSource + 'static) -> Self {
		self.threads = ThreadFactory::with_source(source, self.stacktraces.clone());
		self
	}

	fn set_commons<E: BaseEvent>(&self, event: &mut E) {
		let base = event.base_mut();
		if base.platform.is_none() {
			base.platform = Some(DEFAULT_PLATFORM.to_string());
		}
	}

	fn set_exceptions(&self, event: &mut Event) {
		if let Some(throwable) = &event.throwable {
			event.exceptions = Some(self.exceptions.from_throwable(throwable));
		}
	}

	fn process_non_cached<E: BaseEvent>(&self, event: &mut E) {
		self.set_release(event);
		self.set_environment(event);
		self.set_server_name(event);
		self.set_dist(event);
		self.set_sdk(event);
		self.set_tags(event);
		self.merge_user(event);
	}

	fn set_release<E: BaseEvent>(&self, event: &mut E) {
		let base = event.base_mut();
		if base.release.is_none() {
			base.release.clone_from(&self.options.release);
		}
	}

	fn set_environment<E: BaseEvent>(&self, event: &mut E) {
		let base = event.base_mut();
		if base.environment.is_none() {
			base.environment = Some(
				self.options
					.environment
					.clone()
					.unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
			);
		}
	}

	fn set_server_name<E: BaseEvent>(&self, event: &mut E) {
		let base = event.base_mut();
		if base.server_name.is_none() {
			base.server_name.clone_from(&self.options.server_name);
		}
		if self.options.attach_server_name && base.server_name.is_none() {
			base.server_name = self.hostname.hostname();
		}
	}

	fn set_dist<E: BaseEvent>(&self, event: &mut E) {
		let base = event.base_mut();
		if base.dist.is_none() {
			base.dist.clone_from(&self.options.dist);
		}
	}

	fn set_sdk<E: BaseEvent>(&self, event: &mut E) {
		let base = event.base_mut();
		if base.sdk.is_none() {
			base.sdk = Some(self.options.sdk_version.clone());
		}
	}

	fn set_tags<E: BaseEvent>(&self, event: &mut E) {
		let tags = event.base_mut().tags.get_or_insert_with(BTreeMap::new);
		for (key, value) in &self.options.tags {
			tags.entry(key.clone()).or_insert_with(|| value.clone());
		}
	}

	fn merge_user<E: BaseEvent>(&self, event: &mut E) {
		if !self.options.send_default_pii {
			return;
		}
		let user = event.base_mut().user.get_or_insert_with(User::default);
		if user.ip_address.is_none() {
			user.ip_address = Some(DEFAULT_IP_ADDRESS.to_string());
		}
	}

	fn set_threads(&self, event: &mut Event) {
		if event.threads.is_some() {
			return;
		}

		// threads named by an exception mechanism are the ones that crashed
		let mechanism_thread_ids: Vec<u64> = event
			.exceptions
			.iter()
			.flatten()
			.filter(|e| e.mechanism.is_some())
			.filter_map(|e| e.thread_id)
			.collect();
		let mechanism_thread_ids =
			(!mechanism_thread_ids.is_empty()).then_some(mechanism_thread_ids.as_slice());

		if self.options.attach_threads {
			event.threads = Some(self.threads.current_threads(mechanism_thread_ids));
		} else if self.options.attach_stacktrace && !event.has_exceptions() {
			// only the current thread, there is no exception stack trace to
			// look at
			event.threads = Some(self.threads.current_thread());
		}
	}
}

impl EventProcessor for MainEventProcessor {
	fn name(&self) -> &'static str {
		"MainEventProcessor"
	}

	fn process_event(&self, mut event: Event, hint: Option<&Hint>) -> Option<Event> {
		self.set_commons(&mut event);
		self.set_exceptions(&mut event);

		if should_apply_scope_data(hint) {
			self.process_non_cached(&mut event);
			self.set_threads(&mut event);
		} else {
			debug!(
				event_id = %event.event_id(),
				"Event was cached so not applying data relevant to the current app execution"
			);
		}

		Some(event)
	}

	fn process_transaction(
		&self,
		mut transaction: TransactionEvent,
		hint: Option<&Hint>,
	) -> Option<TransactionEvent> {
		self.set_commons(&mut transaction);

		if should_apply_scope_data(hint) {
			self.process_non_cached(&mut transaction);
		} else {
			debug!(
				event_id = %transaction.base.event_id,
				"Transaction was cached so not applying data relevant to the current app execution"
			);
		}

		Some(transaction)
	}
}

impl std::fmt::Debug for MainEventProcessor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MainEventProcessor")
			.field("options", &self.options)
			.field("threads", &self.threads)
			.finish_non_exhaustive()
	}
}
