// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event processors: enrichment steps every event passes through before it is
//! sent.

mod main;
mod user;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use loom_monitor_core::{Event, Hint, TransactionEvent};
use tracing::{debug, warn};

use crate::panic_hook::payload_message;

pub use main::MainEventProcessor;
pub use user::{UserProvider, UserProviderEventProcessor};

/// A step of the processor chain.
///
/// Returning `None` drops the event; later processors do not see it.
pub trait EventProcessor: Send + Sync {
	/// Name used in logs.
	fn name(&self) -> &'static str {
		std::any::type_name::<Self>()
	}

	fn process_event(&self, event: Event, hint: Option<&Hint>) -> Option<Event>;

	fn process_transaction(
		&self,
		transaction: TransactionEvent,
		_hint: Option<&Hint>,
	) -> Option<TransactionEvent> {
		Some(transaction)
	}
}

/// Processors run in registration order.
#[derive(Clone, Default)]
pub struct ProcessorChain {
	processors: Vec<Arc<dyn EventProcessor>>,
}

impl ProcessorChain {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, processor: Arc<dyn EventProcessor>) {
		self.processors.push(processor);
	}

	pub fn len(&self) -> usize {
		self.processors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.processors.is_empty()
	}

	/// Runs `event` through every processor.
	///
	/// A processor that panics is skipped: the event continues as it was
	/// before that processor ran.
	pub fn process_event(&self, mut event: Event, hint: Option<&Hint>) -> Option<Event> {
		for processor in &self.processors {
			let event_id = event.event_id();
			let unprocessed = event.clone();
			match panic::catch_unwind(AssertUnwindSafe(|| processor.process_event(event, hint))) {
				Ok(Some(processed)) => event = processed,
				Ok(None) => {
					debug!(
						event_id = %event_id,
						processor = processor.name(),
						"Event dropped by processor"
					);
					return None;
				}
				Err(payload) => {
					warn!(
						event_id = %event_id,
						processor = processor.name(),
						panic = %payload_message(payload.as_ref()),
						"Event processor panicked, skipping it"
					);
					event = unprocessed;
				}
			}
		}
		Some(event)
	}

	pub fn process_transaction(
		&self,
		mut transaction: TransactionEvent,
		hint: Option<&Hint>,
	) -> Option<TransactionEvent> {
		for processor in &self.processors {
			let event_id = transaction.base.event_id;
			let unprocessed = transaction.clone();
			let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
				processor.process_transaction(transaction, hint)
			}));
			match outcome {
				Ok(Some(processed)) => transaction = processed,
				Ok(None) => {
					debug!(
						event_id = %event_id,
						processor = processor.name(),
						"Transaction dropped by processor"
					);
					return None;
				}
				Err(payload) => {
					warn!(
						event_id = %event_id,
						processor = processor.name(),
						panic = %payload_message(payload.as_ref()),
						"Transaction processor panicked, skipping it"
					);
					transaction = unprocessed;
				}
			}
		}
		Some(transaction)
	}
}

impl std::fmt::Debug for ProcessorChain {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list()
			.entries(self.processors.iter().map(|p| p.name()))
			.finish()
	}
}
