// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the monitoring data model.

use thiserror::Error;

/// Errors that can occur while parsing or encoding monitoring types.
#[derive(Debug, Error)]
pub enum CoreError {
	#[error("invalid level: {0}")]
	InvalidLevel(String),

	#[error("invalid span status: {0}")]
	InvalidSpanStatus(String),

	#[error("invalid span id: {0}")]
	InvalidSpanId(String),

	#[error("invalid trace id: {0}")]
	InvalidTraceId(String),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Result type for monitoring data model operations.
pub type Result<T> = std::result::Result<T, CoreError>;
