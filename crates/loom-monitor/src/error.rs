// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the monitoring SDK.

use thiserror::Error;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur in the monitoring SDK.
///
/// None of these escape event processing: enrichment failures are logged and
/// leave the affected field unset.
#[derive(Debug, Error)]
pub enum MonitorError {
	/// Invalid configuration value.
	#[error("invalid configuration: {0}")]
	Config(String),

	/// Configuration file could not be parsed.
	#[error("invalid configuration file: {0}")]
	ConfigFile(#[from] toml::de::Error),

	/// The client has been shut down.
	#[error("monitor client has been shut down")]
	ClientShutdown,

	/// Failed to serialize an event, typically inside a [`Transport`](crate::Transport).
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// Error from the data model.
	#[error(transparent)]
	Core(#[from] loom_monitor_core::CoreError),
}
