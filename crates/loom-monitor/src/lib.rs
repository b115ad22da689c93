// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error-monitoring SDK for Rust applications.
//!
//! This crate enriches events before they leave the process and records
//! in-process traces:
//!
//! - A [`ProcessorChain`] fills in release, environment, server name, SDK,
//!   tags, exceptions and threads ([`MainEventProcessor`]) and the current
//!   user ([`UserProviderEventProcessor`]).
//! - A [`Scope`] carries user, tags, breadcrumbs and the running
//!   [`Transaction`] of one execution context.
//! - The [`SpanInterceptor`] wraps operations in child spans.
//! - A panic hook reports panics as fatal events.
//!
//! # Example
//!
//! ```
//! use loom_monitor::{Client, Options};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("database unavailable")]
//! struct DbError;
//!
//! let client = Client::builder()
//!     .options(Options::builder().release("my-app@1.0.0").environment("staging").build())
//!     .build();
//! client.install_panic_hook();
//!
//! let scope = client.new_scope();
//! scope.set_tag("tenant", "acme");
//! let event_id = client.capture_error(DbError, &scope);
//! assert!(event_id.is_some());
//! ```

pub mod client;
pub mod error;
pub mod exception;
pub mod hostname;
pub mod interceptor;
pub mod options;
mod panic_hook;
pub mod processor;
pub mod scope;
pub mod span;
pub mod stacktrace;
pub mod threads;

pub use client::{Client, ClientBuilder, NoopTransport, Transport};
pub use error::{MonitorError, Result};
pub use exception::ExceptionFactory;
pub use hostname::{HostnameCache, HostnameProvider};
pub use interceptor::{SpanInterceptor, Traced, TracedOperation};
pub use options::{Options, OptionsBuilder};
pub use processor::{
	EventProcessor, MainEventProcessor, ProcessorChain, UserProvider, UserProviderEventProcessor,
};
pub use scope::Scope;
pub use span::{ActiveSpan, Span, Transaction};
pub use stacktrace::StacktraceFactory;
pub use threads::{current_thread_id, LiveThread, ProcThreadSource, ThreadFactory, ThreadSource};

// Re-export core types for convenience
pub use loom_monitor_core::{
	Breadcrumb, ErrorSnapshot, Event, EventId, Exception, Frame, Hint, Level, Mechanism, SpanId,
	SpanRecord, SpanStatus, Stacktrace, ThreadInfo, Throwable, TraceId, TransactionEvent, User,
	DEFAULT_IP_ADDRESS,
};
