// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Memoized lookup of the local hostname, used as the default server name.

use std::io;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// How long a failed lookup is remembered before trying again.
const FAILURE_BACKOFF: Duration = Duration::from_secs(1);

/// Supplies the name of the machine the process runs on.
pub trait HostnameProvider: Send + Sync {
	/// Returns the hostname, or `None` when it cannot be determined.
	fn hostname(&self) -> Option<String>;
}

type Resolver = Box<dyn Fn() -> io::Result<String> + Send + Sync>;

#[derive(Default)]
struct CachedHostname {
	value: Option<String>,
	expires_at: Option<Instant>,
}

/// A [`HostnameProvider`] that asks the OS at most once per TTL.
pub struct HostnameCache {
	ttl: Duration,
	resolver: Resolver,
	state: Mutex<CachedHostname>,
}

impl HostnameCache {
	/// Creates a cache backed by the OS hostname.
	pub fn new(ttl: Duration) -> Self {
		Self::with_resolver(ttl, || {
			hostname::get().map(|name| name.to_string_lossy().into_owned())
		})
	}

	/// Creates a cache backed by a custom resolver.
	pub fn with_resolver<F>(ttl: Duration, resolver: F) -> Self
	where
		F: Fn() -> io::Result<String> + Send + Sync + 'static,
	{
		Self {
			ttl,
			resolver: Box::new(resolver),
			state: Mutex::new(CachedHostname::default()),
		}
	}

	fn refresh(&self, state: &mut CachedHostname, now: Instant) {
		match (self.resolver)() {
			Ok(name) if !name.is_empty() => {
				debug!(hostname = %name, "Resolved local hostname");
				state.value = Some(name);
				state.expires_at = Some(now + self.ttl);
			}
			Ok(_) => {
				warn!("Local hostname is empty");
				state.value = None;
				state.expires_at = Some(now + FAILURE_BACKOFF);
			}
			Err(e) => {
				warn!(error = %e, "Failed to resolve local hostname");
				state.value = None;
				state.expires_at = Some(now + FAILURE_BACKOFF);
			}
		}
	}
}

impl HostnameProvider for HostnameCache {
	fn hostname(&self) -> Option<String> {
		let now = Instant::now();
		let mut state = self.state.lock();
		let expired = state.expires_at.map_or(true, |at| now >= at);
		if expired {
			self.refresh(&mut state, now);
		}
		state.value.clone()
	}
}

impl std::fmt::Debug for HostnameCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HostnameCache")
			.field("ttl", &self.ttl)
			.field("cached", &self.state.lock().value)
			.finish()
	}
}
