// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end tests for event enrichment through the client's processor chain.

mod support;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use loom_monitor::{
	Breadcrumb, Event, EventProcessor, Hint, Level, Mechanism, Options, Throwable, User,
	UserProviderEventProcessor, DEFAULT_IP_ADDRESS,
};

#[derive(Debug, thiserror::Error)]
#[error("connection reset")]
struct ResetError;

#[derive(Debug, thiserror::Error)]
#[error("checkout failed")]
struct CheckoutError(#[source] ResetError);

fn full_user() -> User {
	User {
		id: Some("u-1".to_string()),
		username: Some("john.doe".to_string()),
		email: Some("john@example.com".to_string()),
		ip_address: Some("10.1.1.1".to_string()),
		others: Some(BTreeMap::from([("plan".to_string(), "pro".to_string())])),
	}
}

/// Test that a provided user is copied onto an event without one.
/// **Why Important**: Server-side applications attribute errors to the
/// authenticated principal without touching every capture call.
#[test]
fn test_provided_user_copied_when_event_has_none() {
	let options = Options::builder().build();
	let provider_options = Arc::new(options.clone());
	let (builder, transport) = support::builder(options);
	let client = builder
		.processor(UserProviderEventProcessor::new(provider_options, || Some(full_user())))
		.build();

	client.capture_message("hello", Level::Info, &client.new_scope());

	assert_eq!(transport.events()[0].base.user, Some(full_user()));
}

/// Test that fields already on the event's user are never replaced and that
/// `others` maps merge with the event's keys winning.
#[test]
fn test_existing_user_fields_win() {
	let (builder, transport) = support::builder(Options::default());
	let client = builder
		.processor(UserProviderEventProcessor::new(
			Arc::new(Options::default()),
			|| Some(full_user()),
		))
		.build();

	let mut event = Event::from_message("hello", Level::Info);
	event.base.user = Some(User {
		username: Some("explicit".to_string()),
		others: Some(BTreeMap::from([
			("plan".to_string(), "free".to_string()),
			("locale".to_string(), "en".to_string()),
		])),
		..Default::default()
	});
	client.capture_event(event, None, &client.new_scope());

	let user = transport.events()[0].base.user.clone().unwrap();
	assert_eq!(user.username.as_deref(), Some("explicit"));
	assert_eq!(user.id.as_deref(), Some("u-1"));
	assert_eq!(user.email.as_deref(), Some("john@example.com"));
	let others = user.others.unwrap();
	assert_eq!(others["plan"], "free");
	assert_eq!(others["locale"], "en");
}

#[test]
fn test_empty_provided_user_leaves_event_user_unchanged() {
	let existing = User {
		id: Some("kept".to_string()),
		..Default::default()
	};

	for provided in [None, Some(User::default())] {
		let (builder, transport) = support::builder(Options::default());
		let client = builder
			.processor(UserProviderEventProcessor::new(
				Arc::new(Options::default()),
				move || provided.clone(),
			))
			.build();

		let mut event = Event::new();
		event.base.user = Some(existing.clone());
		client.capture_event(event, None, &client.new_scope());

		assert_eq!(transport.events()[0].base.user.as_ref(), Some(&existing));
	}
}

/// Test the PII defaults: a missing user gets the `{{auto}}` marker and a
/// concrete IP survives the whole chain.
#[test]
fn test_default_pii_ip_handling() {
	let (client, transport) =
		support::client(Options::builder().send_default_pii(true).build());
	let scope = client.new_scope();

	client.capture_event(Event::new(), None, &scope);
	let mut with_ip = Event::new();
	with_ip.base.user = Some(User {
		ip_address: Some("192.168.0.1".to_string()),
		..Default::default()
	});
	client.capture_event(with_ip, None, &scope);

	let events = transport.events();
	assert_eq!(
		events[0].base.user.as_ref().and_then(|u| u.ip_address.as_deref()),
		Some(DEFAULT_IP_ADDRESS)
	);
	assert_eq!(
		events[1].base.user.as_ref().and_then(|u| u.ip_address.as_deref()),
		Some("192.168.0.1")
	);
	assert_eq!(transport.payloads()[0]["user"]["ip_address"], "{{auto}}");
}

/// Test that the user-provider processor clears the `{{auto}}` marker when
/// default PII is on.
/// **Why Important**: The processor runs on a server; the collector would
/// otherwise record the server's address as the user's.
#[test]
fn test_user_provider_clears_auto_ip() {
	let options = Options::builder().send_default_pii(true).build();
	let provider_options = Arc::new(options.clone());
	let (builder, transport) = support::builder(options);
	let client = builder
		.processor(UserProviderEventProcessor::new(provider_options, || {
			Some(User {
				username: Some("john.doe".to_string()),
				..Default::default()
			})
		}))
		.build();

	let mut event = Event::new();
	event.base.user = Some(User::with_default_ip());
	client.capture_event(event, None, &client.new_scope());

	let user = transport.events()[0].base.user.clone().unwrap();
	assert_eq!(user.username.as_deref(), Some("john.doe"));
	assert_eq!(user.ip_address, None);
}

#[test]
fn test_configured_tags_merge_under_event_tags() {
	let (client, transport) =
		support::client(Options::builder().tag("a", "2").tag("b", "3").build());

	let mut event = Event::new();
	event.base.set_tag("a", "1");
	client.capture_event(event, None, &client.new_scope());

	assert_eq!(
		transport.events()[0].base.tags,
		Some(BTreeMap::from([
			("a".to_string(), "1".to_string()),
			("b".to_string(), "3".to_string()),
		]))
	);
}

#[test]
fn test_commons_and_server_name() {
	let (client, transport) = support::client(
		Options::builder()
			.release("shop@2.1.0")
			.dist("arm64")
			.build(),
	);

	client.capture_message("deployed", Level::Info, &client.new_scope());

	let payloads = transport.payloads();
	let payload = &payloads[0];
	assert_eq!(payload["platform"], "rust");
	assert_eq!(payload["release"], "shop@2.1.0");
	assert_eq!(payload["environment"], "production");
	assert_eq!(payload["server_name"], "test-host");
	assert_eq!(payload["dist"], "arm64");
	assert_eq!(payload["sdk"]["name"], "loom-monitor.rust");
}

/// Test that an event replayed from cache keeps its exceptions but gets no
/// data describing the current process.
/// **Why Important**: A crash recorded by a previous release must not be
/// reported under the release that happens to send it.
#[test]
fn test_cached_event_only_gets_exceptions() {
	let (client, transport) = support::client(
		Options::builder()
			.release("shop@2.1.0")
			.tag("region", "eu")
			.attach_threads(true)
			.build(),
	);
	let scope = client.new_scope();
	scope.set_tag("tenant", "acme");

	client.capture_event(
		Event::from_throwable(CheckoutError(ResetError)),
		Some(&Hint::cached()),
		&scope,
	);

	let events = transport.events();
	let event = &events[0];
	assert_eq!(event.base.platform.as_deref(), Some("rust"));
	assert_eq!(event.exceptions.as_ref().map(Vec::len), Some(2));
	assert!(event.base.release.is_none());
	assert!(event.base.environment.is_none());
	assert!(event.base.server_name.is_none());
	assert!(event.base.tags.is_none());
	assert!(event.threads.is_none());
}

#[test]
fn test_exception_chain_order() {
	let (client, transport) = support::client(Options::default());

	client.capture_error(CheckoutError(ResetError), &client.new_scope());

	let exceptions = transport.events()[0].exceptions.clone().unwrap();
	let values: Vec<_> = exceptions
		.iter()
		.filter_map(|e| e.value.as_deref())
		.collect();
	assert_eq!(values, vec!["connection reset", "checkout failed"]);
	assert_eq!(exceptions[1].ty, "CheckoutError");
}

#[test]
fn test_attach_threads_marks_crashed_thread() {
	let (client, transport) =
		support::client(Options::builder().attach_threads(true).build());

	let throwable = Throwable::new(ResetError)
		.with_mechanism(Mechanism::new("generic").handled(true))
		.with_thread_id(2);
	client.capture_error(throwable, &client.new_scope());

	let threads = transport.events()[0].threads.clone().unwrap();
	assert_eq!(threads.len(), 2);
	assert!(threads.iter().find(|t| t.id == 2).is_some_and(|t| t.crashed));
	assert!(threads.iter().find(|t| t.id == 1).is_some_and(|t| !t.crashed));
}

#[test]
fn test_attach_stacktrace_adds_only_current_thread() {
	let (client, transport) =
		support::client(Options::builder().attach_stacktrace(true).build());

	client.capture_message("slow request", Level::Warning, &client.new_scope());

	let threads = transport.events()[0].threads.clone().unwrap();
	assert_eq!(threads.len(), 1);
	assert_eq!(threads[0].id, 1);
	assert!(threads[0].current);
}

#[test]
fn test_scope_data_reaches_event() {
	let (client, transport) = support::client(Options::default());
	let scope = client.new_scope();
	scope.set_user(User {
		id: Some("scope-user".to_string()),
		..Default::default()
	});
	scope.add_breadcrumb(Breadcrumb::http("https://api.example.com/cart", "post"));

	client.capture_message("cart error", Level::Error, &scope);

	let events = transport.events();
	let event = &events[0];
	assert_eq!(
		event.base.user.as_ref().and_then(|u| u.id.as_deref()),
		Some("scope-user")
	);
	assert_eq!(event.base.breadcrumbs.len(), 1);
	assert_eq!(
		event.base.breadcrumbs[0].data.get("method").map(String::as_str),
		Some("POST")
	);
}

/// Test that a processor returning `None` suppresses the event and that
/// processors registered after it never run.
#[test]
fn test_suppressing_processor_short_circuits() {
	struct Sampler;
	impl EventProcessor for Sampler {
		fn process_event(&self, event: Event, _hint: Option<&Hint>) -> Option<Event> {
			(event.level != Some(Level::Debug)).then_some(event)
		}
	}

	struct Counter(Arc<AtomicUsize>);
	impl EventProcessor for Counter {
		fn process_event(&self, event: Event, _hint: Option<&Hint>) -> Option<Event> {
			self.0.fetch_add(1, Ordering::SeqCst);
			Some(event)
		}
	}

	let seen = Arc::new(AtomicUsize::new(0));
	let (builder, transport) = support::builder(Options::default());
	let client = builder
		.processor(Sampler)
		.processor(Counter(Arc::clone(&seen)))
		.build();
	let scope = client.new_scope();

	assert!(client.capture_message("noise", Level::Debug, &scope).is_none());
	assert!(client.capture_message("signal", Level::Error, &scope).is_some());

	assert_eq!(seen.load(Ordering::SeqCst), 1);
	assert_eq!(transport.events().len(), 1);
}

/// Test that a panicking user provider neither reaches the caller nor
/// prevents the event from being sent.
/// **Why Important**: Reporting an error must never crash the application
/// that is reporting it.
#[test]
fn test_panicking_user_provider_does_not_escape() {
	let (builder, transport) = support::builder(Options::default());
	let client = builder
		.processor(UserProviderEventProcessor::new(
			Arc::new(Options::default()),
			|| -> Option<User> { panic!("provider lookup failed") },
		))
		.build();
	let scope = client.new_scope();
	scope.set_tag("tenant", "acme");

	let event_id = client.capture_message("hello", Level::Info, &scope);

	let events = transport.events();
	assert_eq!(events.len(), 1);
	assert_eq!(Some(events[0].event_id()), event_id);
	assert_eq!(events[0].message.as_deref(), Some("hello"));
	assert_eq!(events[0].base.tag("tenant"), Some("acme"));
	assert_eq!(events[0].base.environment.as_deref(), Some("production"));
	assert!(events[0].base.user.is_none());
}
