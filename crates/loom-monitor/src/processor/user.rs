// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attributes events to the user an application-supplied provider returns,
//! typically the authenticated principal of the request being served.

use std::sync::Arc;

use loom_monitor_core::{BaseEvent, Event, Hint, TransactionEvent, User};

use super::EventProcessor;
use crate::options::Options;

/// Supplies the user of the current execution context.
pub trait UserProvider: Send + Sync {
	fn provide_user(&self) -> Option<User>;
}

impl<F> UserProvider for F
where
	F: Fn() -> Option<User> + Send + Sync,
{
	fn provide_user(&self) -> Option<User> {
		self()
	}
}

/// Merges the provided user into events and transactions.
pub struct UserProviderEventProcessor {
	options: Arc<Options>,
	provider: Box<dyn UserProvider>,
}

impl UserProviderEventProcessor {
	pub fn new(options: Arc<Options>, provider: impl UserProvider + 'static) -> Self {
		Self {
			options,
			provider: Box::new(provider),
		}
	}

	fn merge_user<E: BaseEvent>(&self, event: &mut E) {
		let Some(provided) = self.provider.provide_user().filter(|user| !user.is_empty()) else {
			return;
		};

		let base = event.base_mut();
		let user = match base.user.take() {
			Some(mut existing) => {
				existing.merge_missing_from(&provided);
				existing
			}
			None => provided,
		};
		let user = base.user.insert(user);

		// This runs inside a server: "{{auto}}" would make the collector record
		// the server's own address for the user.
		if self.options.send_default_pii && user.has_default_ip() {
			user.ip_address = None;
		}
	}
}

impl EventProcessor for UserProviderEventProcessor {
	fn name(&self) -> &'static str {
		"UserProviderEventProcessor"
	}

	fn process_event(&self, mut event: Event, _hint: Option<&Hint>) -> Option<Event> {
		self.merge_user(&mut event);
		Some(event)
	}

	fn process_transaction(
		&self,
		mut transaction: TransactionEvent,
		_hint: Option<&Hint>,
	) -> Option<TransactionEvent> {
		self.merge_user(&mut transaction);
		Some(transaction)
	}
}
