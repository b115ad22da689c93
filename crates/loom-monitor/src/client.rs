// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The monitoring client: runs events through the processor chain and hands
//! them to a transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use loom_monitor_core::{
	should_apply_scope_data, Event, EventId, Hint, Level, Throwable, TransactionEvent,
};
use tracing::{debug, info, warn};

use crate::error::{MonitorError, Result};
use crate::hostname::HostnameProvider;
use crate::options::Options;
use crate::panic_hook::install_panic_hook;
use crate::processor::{EventProcessor, MainEventProcessor, ProcessorChain};
use crate::scope::Scope;
use crate::span::Transaction;
use crate::threads::ThreadSource;

/// Delivers processed events.
pub trait Transport: Send + Sync {
	fn send_event(&self, event: Event) -> Result<()>;

	fn send_transaction(&self, transaction: TransactionEvent) -> Result<()>;
}

/// Discards everything. Used when no transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransport;

impl Transport for NoopTransport {
	fn send_event(&self, _event: Event) -> Result<()> {
		Ok(())
	}

	fn send_transaction(&self, _transaction: TransactionEvent) -> Result<()> {
		Ok(())
	}
}

/// Builder for constructing a [`Client`].
pub struct ClientBuilder {
	options: Options,
	processors: Vec<Arc<dyn EventProcessor>>,
	transport: Option<Arc<dyn Transport>>,
	hostname_provider: Option<Arc<dyn HostnameProvider>>,
	thread_source: Option<Box<dyn ThreadSource>>,
}

impl ClientBuilder {
	pub fn new() -> Self {
		Self {
			options: Options::default(),
			processors: Vec::new(),
			transport: None,
			hostname_provider: None,
			thread_source: None,
		}
	}

	/// Sets the options, replacing the defaults.
	pub fn options(mut self, options: Options) -> Self {
		self.options = options;
		self
	}

	/// Adds a processor. Processors run after the built-in one, in the order
	/// they were added.
	pub fn processor(mut self, processor: impl EventProcessor + 'static) -> Self {
		self.processors.push(Arc::new(processor));
		self
	}

	pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
		self.transport = Some(Arc::new(transport));
		self
	}

	/// Replaces the OS hostname lookup used for the server name.
	pub fn hostname_provider(mut self, provider: impl HostnameProvider + 'static) -> Self {
		self.hostname_provider = Some(Arc::new(provider));
		self
	}

	/// Replaces the source of live threads used for thread snapshots.
	pub fn thread_source(mut self, source: impl ThreadSource + 'static) -> Self {
		self.thread_source = Some(Box::new(source));
		self
	}

	pub fn build(self) -> Client {
		let options = Arc::new(self.options);

		let mut main = MainEventProcessor::new(Arc::clone(&options));
		if let Some(provider) = self.hostname_provider {
			main = main.with_hostname_provider(provider);
		}
		if let Some(source) = self.thread_source {
			main = main.with_thread_source(source);
		}

		let mut chain = ProcessorChain::new();
		chain.push(Arc::new(main));
		for processor in self.processors {
			chain.push(processor);
		}

		let transport: Arc<dyn Transport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(NoopTransport),
		};

		info!(
			release = options.release.as_deref().unwrap_or("unset"),
			environment = options.environment.as_deref().unwrap_or("unset"),
			processors = chain.len(),
			"Monitor client initialized"
		);

		Client {
			inner: Arc::new(ClientInner {
				options,
				chain,
				transport,
				closed: AtomicBool::new(false),
			}),
		}
	}
}

impl Default for ClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Internal client state, shared with the panic hook.
pub(crate) struct ClientInner {
	options: Arc<Options>,
	chain: ProcessorChain,
	transport: Arc<dyn Transport>,
	closed: AtomicBool,
}

impl ClientInner {
	pub(crate) fn options(&self) -> &Options {
		&self.options
	}

	pub(crate) fn capture_event(
		&self,
		mut event: Event,
		hint: Option<&Hint>,
		scope: &Scope,
	) -> Option<EventId> {
		if self.closed.load(Ordering::SeqCst) {
			debug!(event_id = %event.event_id(), "Client is shut down, dropping event");
			return None;
		}

		if should_apply_scope_data(hint) {
			scope.apply_to_event(&mut event);
		}

		let event = self.chain.process_event(event, hint)?;
		let event_id = event.event_id();
		if let Err(e) = self.transport.send_event(event) {
			warn!(event_id = %event_id, error = %e, "Failed to send event");
		}
		Some(event_id)
	}

	fn capture_transaction(
		&self,
		mut transaction: TransactionEvent,
		scope: &Scope,
	) -> Option<EventId> {
		if self.closed.load(Ordering::SeqCst) {
			debug!(transaction = %transaction.name, "Client is shut down, dropping transaction");
			return None;
		}

		scope.apply_to_event(&mut transaction);

		let transaction = self.chain.process_transaction(transaction, None)?;
		let event_id = transaction.base.event_id;
		if let Err(e) = self.transport.send_transaction(transaction) {
			warn!(event_id = %event_id, error = %e, "Failed to send transaction");
		}
		Some(event_id)
	}
}

/// Client for capturing events and recording transactions.
///
/// # Example
///
/// ```
/// use loom_monitor::{Client, Level, Options};
///
/// let client = Client::builder()
///     .options(Options::builder().release("my-app@1.2.3").build())
///     .build();
/// let scope = client.new_scope();
/// scope.set_tag("region", "eu-west-1");
///
/// let tx = client.start_transaction("GET /users", Some("http.server".to_string()), &scope);
/// tx.start_child("db.query", Some("SELECT * FROM users".to_string())).finish();
/// client.finish_transaction(&tx, &scope);
///
/// client.capture_message("cache warmed", Level::Info, &scope);
/// ```
#[derive(Clone)]
pub struct Client {
	inner: Arc<ClientInner>,
}

impl Client {
	pub fn builder() -> ClientBuilder {
		ClientBuilder::new()
	}

	pub fn options(&self) -> &Options {
		self.inner.options()
	}

	/// An empty scope sized for this client's options.
	pub fn new_scope(&self) -> Scope {
		Scope::for_options(self.inner.options())
	}

	/// Installs a panic hook that captures panics as fatal events.
	///
	/// The previously installed hook still runs afterwards.
	pub fn install_panic_hook(&self) {
		install_panic_hook(Arc::clone(&self.inner));
		info!("Panic hook installed");
	}

	/// Runs an event through the scope and the processor chain and sends it.
	///
	/// Returns `None` when a processor dropped the event or the client is
	/// shut down. Scope data is not applied to events replayed from cache.
	pub fn capture_event(
		&self,
		event: Event,
		hint: Option<&Hint>,
		scope: &Scope,
	) -> Option<EventId> {
		self.inner.capture_event(event, hint, scope)
	}

	/// Captures an error and its cause chain.
	pub fn capture_error(&self, error: impl Into<Throwable>, scope: &Scope) -> Option<EventId> {
		self.capture_event(Event::from_throwable(error), None, scope)
	}

	pub fn capture_message(
		&self,
		message: impl Into<String>,
		level: Level,
		scope: &Scope,
	) -> Option<EventId> {
		self.capture_event(Event::from_message(message, level), None, scope)
	}

	/// Starts a transaction and makes it the scope's running trace.
	pub fn start_transaction(
		&self,
		name: impl Into<String>,
		op: Option<String>,
		scope: &Scope,
	) -> Transaction {
		let transaction = Transaction::start(name, op);
		scope.set_transaction(transaction.clone());
		transaction
	}

	/// Finishes a transaction and sends it.
	///
	/// The transaction is removed from the scope if it is still the running
	/// one there.
	pub fn finish_transaction(&self, transaction: &Transaction, scope: &Scope) -> Option<EventId> {
		if scope
			.transaction()
			.is_some_and(|running| running.span_id() == transaction.span_id())
		{
			scope.clear_transaction();
		}

		self.inner.capture_transaction(transaction.finish(), scope)
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	/// Stops accepting events.
	pub fn shutdown(&self) -> Result<()> {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return Err(MonitorError::ClientShutdown);
		}
		info!("Monitor client shut down");
		Ok(())
	}
}

impl std::fmt::Debug for Client {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Client")
			.field("options", &self.inner.options)
			.field("processors", &self.inner.chain)
			.field("closed", &self.is_closed())
			.finish()
	}
}
