// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dispatch hints passed alongside an event.

/// Where an event being dispatched comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HintOrigin {
	/// Raised by the running process.
	#[default]
	Live,
	/// Replayed from the on-disk cache of a previous run.
	Cached,
	/// Replayed from cache, but the caller asks for current scope data anyway.
	CachedApplyScope,
}

/// Extra information travelling with an event through the processor chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hint {
	pub origin: HintOrigin,
}

impl Hint {
	pub fn live() -> Self {
		Self {
			origin: HintOrigin::Live,
		}
	}

	pub fn cached() -> Self {
		Self {
			origin: HintOrigin::Cached,
		}
	}

	pub fn cached_with_scope() -> Self {
		Self {
			origin: HintOrigin::CachedApplyScope,
		}
	}

	pub fn is_cached(&self) -> bool {
		matches!(
			self.origin,
			HintOrigin::Cached | HintOrigin::CachedApplyScope
		)
	}
}

/// Whether data describing the current process may be applied to an event.
///
/// Release, environment, tags and the like describe this execution; an event
/// replayed from a previous run must not pick them up.
pub fn should_apply_scope_data(hint: Option<&Hint>) -> bool {
	match hint {
		None => true,
		Some(hint) => hint.origin != HintOrigin::Cached,
	}
}
