// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::sync::{Arc, Once};

use loom_monitor::{
	Client, ClientBuilder, Event, HostnameProvider, LiveThread, Options, Result, ThreadSource,
	TransactionEvent, Transport,
};
use parking_lot::Mutex;

static INIT: Once = Once::new();

/// Routes SDK logs to the test harness; filter with `RUST_LOG`.
pub fn init_test_logging() {
	INIT.call_once(|| {
		use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

		let _ = tracing_subscriber::registry()
			.with(tracing_subscriber::fmt::layer().with_test_writer())
			.with(tracing_subscriber::EnvFilter::from_default_env())
			.try_init();
	});
}

/// Keeps every event it is handed, serialized the way a network transport
/// would send it.
#[derive(Clone, Default)]
pub struct RecordingTransport {
	events: Arc<Mutex<Vec<Event>>>,
	transactions: Arc<Mutex<Vec<TransactionEvent>>>,
	payloads: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl RecordingTransport {
	pub fn events(&self) -> Vec<Event> {
		self.events.lock().clone()
	}

	pub fn transactions(&self) -> Vec<TransactionEvent> {
		self.transactions.lock().clone()
	}

	pub fn payloads(&self) -> Vec<serde_json::Value> {
		self.payloads.lock().clone()
	}
}

impl Transport for RecordingTransport {
	fn send_event(&self, event: Event) -> Result<()> {
		self.payloads.lock().push(serde_json::to_value(&event)?);
		self.events.lock().push(event);
		Ok(())
	}

	fn send_transaction(&self, transaction: TransactionEvent) -> Result<()> {
		self.payloads.lock().push(serde_json::to_value(&transaction)?);
		self.transactions.lock().push(transaction);
		Ok(())
	}
}

pub struct FixedHostname(pub &'static str);

impl HostnameProvider for FixedHostname {
	fn hostname(&self) -> Option<String> {
		Some(self.0.to_string())
	}
}

/// Reports the calling thread (id 1) and one idle worker (id 2).
pub struct TwoThreads;

impl ThreadSource for TwoThreads {
	fn threads(&self) -> Vec<LiveThread> {
		vec![
			LiveThread {
				id: 1,
				name: Some("main".to_string()),
				current: true,
			},
			LiveThread {
				id: 2,
				name: Some("worker".to_string()),
				current: false,
			},
		]
	}
}

/// A builder wired to a recording transport and deterministic host data.
pub fn builder(options: Options) -> (ClientBuilder, RecordingTransport) {
	init_test_logging();
	let transport = RecordingTransport::default();
	let builder = Client::builder()
		.options(options)
		.transport(transport.clone())
		.hostname_provider(FixedHostname("test-host"))
		.thread_source(TwoThreads);
	(builder, transport)
}

pub fn client(options: Options) -> (Client, RecordingTransport) {
	let (builder, transport) = builder(options);
	(builder.build(), transport)
}
