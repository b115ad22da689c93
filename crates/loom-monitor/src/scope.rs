// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-execution-context data applied to captured events.
//!
//! A [`Scope`] is passed explicitly to the code that captures events or runs
//! traced operations. Work moved to another thread takes a [`Scope::fork`],
//! which shares the running transaction but nothing mutable.

use std::collections::{BTreeMap, VecDeque};

use loom_monitor_core::{BaseEvent, Breadcrumb, User};
use parking_lot::RwLock;

use crate::options::Options;
use crate::span::{ActiveSpan, Span, Transaction};

#[derive(Debug, Clone, Default)]
struct ScopeData {
	user: Option<User>,
	tags: BTreeMap<String, String>,
	extra: BTreeMap<String, serde_json::Value>,
	breadcrumbs: VecDeque<Breadcrumb>,
	transaction: Option<Transaction>,
	span: Option<Span>,
}

/// User, tags, breadcrumbs and the active trace of one execution context.
#[derive(Debug)]
pub struct Scope {
	max_breadcrumbs: usize,
	data: RwLock<ScopeData>,
}

impl Default for Scope {
	fn default() -> Self {
		Self::new(Options::default().max_breadcrumbs)
	}
}

impl Scope {
	pub fn new(max_breadcrumbs: usize) -> Self {
		Self {
			max_breadcrumbs,
			data: RwLock::new(ScopeData::default()),
		}
	}

	/// Creates an empty scope sized for the given options.
	pub fn for_options(options: &Options) -> Self {
		Self::new(options.max_breadcrumbs)
	}

	pub fn set_user(&self, user: User) {
		self.data.write().user = Some(user);
	}

	pub fn user(&self) -> Option<User> {
		self.data.read().user.clone()
	}

	pub fn clear_user(&self) {
		self.data.write().user = None;
	}

	pub fn set_tag(&self, key: impl Into<String>, value: impl Into<String>) {
		self.data.write().tags.insert(key.into(), value.into());
	}

	pub fn remove_tag(&self, key: &str) -> Option<String> {
		self.data.write().tags.remove(key)
	}

	pub fn tags(&self) -> BTreeMap<String, String> {
		self.data.read().tags.clone()
	}

	pub fn set_extra(&self, key: impl Into<String>, value: serde_json::Value) {
		self.data.write().extra.insert(key.into(), value);
	}

	/// Records a breadcrumb, dropping the oldest once the limit is reached.
	pub fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
		if self.max_breadcrumbs == 0 {
			return;
		}
		let mut data = self.data.write();
		while data.breadcrumbs.len() >= self.max_breadcrumbs {
			data.breadcrumbs.pop_front();
		}
		data.breadcrumbs.push_back(breadcrumb);
	}

	pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
		self.data.read().breadcrumbs.iter().cloned().collect()
	}

	pub fn clear_breadcrumbs(&self) {
		self.data.write().breadcrumbs.clear();
	}

	/// Makes `transaction` the root of everything traced in this scope.
	pub fn set_transaction(&self, transaction: Transaction) {
		let mut data = self.data.write();
		data.transaction = Some(transaction);
		data.span = None;
	}

	pub fn transaction(&self) -> Option<Transaction> {
		self.data.read().transaction.clone()
	}

	/// Removes the transaction and any active span.
	pub fn clear_transaction(&self) -> Option<Transaction> {
		let mut data = self.data.write();
		data.span = None;
		data.transaction.take()
	}

	/// The innermost running span: the active child span if there is one,
	/// otherwise the transaction.
	pub fn span(&self) -> Option<ActiveSpan> {
		let data = self.data.read();
		match (&data.span, &data.transaction) {
			(Some(span), _) => Some(ActiveSpan::Span(span.clone())),
			(None, Some(tx)) => Some(ActiveSpan::Transaction(tx.clone())),
			(None, None) => None,
		}
	}

	/// Replaces the active child span, returning the previous one.
	pub fn set_span(&self, span: Option<Span>) -> Option<Span> {
		std::mem::replace(&mut self.data.write().span, span)
	}

	/// Copies scope data onto an event without overriding what it already
	/// carries. The scope's breadcrumbs are placed before the event's own.
	pub fn apply_to_event<E: BaseEvent + ?Sized>(&self, event: &mut E) {
		let data = self.data.read();
		let base = event.base_mut();

		if let Some(user) = &data.user {
			base.user
				.get_or_insert_with(User::default)
				.merge_missing_from(user);
		}

		if !data.tags.is_empty() {
			let tags = base.tags.get_or_insert_with(BTreeMap::new);
			for (key, value) in &data.tags {
				tags.entry(key.clone()).or_insert_with(|| value.clone());
			}
		}

		for (key, value) in &data.extra {
			base.extra.entry(key.clone()).or_insert_with(|| value.clone());
		}

		if !data.breadcrumbs.is_empty() {
			let mut breadcrumbs: Vec<Breadcrumb> = data.breadcrumbs.iter().cloned().collect();
			breadcrumbs.append(&mut base.breadcrumbs);
			base.breadcrumbs = breadcrumbs;
		}
	}

	/// An independent copy for another execution context.
	///
	/// The copy shares the running transaction handle, so spans started from
	/// it record into the same transaction.
	pub fn fork(&self) -> Scope {
		Scope {
			max_breadcrumbs: self.max_breadcrumbs,
			data: RwLock::new(self.data.read().clone()),
		}
	}
}
