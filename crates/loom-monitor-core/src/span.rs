// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Finished spans and their status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::{SpanId, TraceId};

/// Outcome of the operation a span measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
	Ok,
	Cancelled,
	Unknown,
	InvalidArgument,
	DeadlineExceeded,
	NotFound,
	AlreadyExists,
	PermissionDenied,
	ResourceExhausted,
	FailedPrecondition,
	Aborted,
	OutOfRange,
	Unimplemented,
	InternalError,
	Unavailable,
	DataLoss,
	Unauthenticated,
}

impl SpanStatus {
	pub fn is_ok(self) -> bool {
		self == Self::Ok
	}

	/// Maps an HTTP response status code onto a span status.
	///
	/// Returns `None` for codes below 100 or above 599.
	pub fn from_http_status(code: u16) -> Option<Self> {
		let status = match code {
			100..=399 => Self::Ok,
			400 => Self::InvalidArgument,
			401 => Self::Unauthenticated,
			403 => Self::PermissionDenied,
			404 => Self::NotFound,
			409 => Self::AlreadyExists,
			413 => Self::FailedPrecondition,
			429 => Self::ResourceExhausted,
			499 => Self::Cancelled,
			400..=499 => Self::InvalidArgument,
			501 => Self::Unimplemented,
			503 => Self::Unavailable,
			504 => Self::DeadlineExceeded,
			500..=599 => Self::InternalError,
			_ => return None,
		};
		Some(status)
	}
}

impl fmt::Display for SpanStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Ok => "ok",
			Self::Cancelled => "cancelled",
			Self::Unknown => "unknown",
			Self::InvalidArgument => "invalid_argument",
			Self::DeadlineExceeded => "deadline_exceeded",
			Self::NotFound => "not_found",
			Self::AlreadyExists => "already_exists",
			Self::PermissionDenied => "permission_denied",
			Self::ResourceExhausted => "resource_exhausted",
			Self::FailedPrecondition => "failed_precondition",
			Self::Aborted => "aborted",
			Self::OutOfRange => "out_of_range",
			Self::Unimplemented => "unimplemented",
			Self::InternalError => "internal_error",
			Self::Unavailable => "unavailable",
			Self::DataLoss => "data_loss",
			Self::Unauthenticated => "unauthenticated",
		};
		f.write_str(s)
	}
}

impl FromStr for SpanStatus {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"ok" => Ok(Self::Ok),
			"cancelled" => Ok(Self::Cancelled),
			"unknown" => Ok(Self::Unknown),
			"invalid_argument" => Ok(Self::InvalidArgument),
			"deadline_exceeded" => Ok(Self::DeadlineExceeded),
			"not_found" => Ok(Self::NotFound),
			"already_exists" => Ok(Self::AlreadyExists),
			"permission_denied" => Ok(Self::PermissionDenied),
			"resource_exhausted" => Ok(Self::ResourceExhausted),
			"failed_precondition" => Ok(Self::FailedPrecondition),
			"aborted" => Ok(Self::Aborted),
			"out_of_range" => Ok(Self::OutOfRange),
			"unimplemented" => Ok(Self::Unimplemented),
			"internal_error" => Ok(Self::InternalError),
			"unavailable" => Ok(Self::Unavailable),
			"data_loss" => Ok(Self::DataLoss),
			"unauthenticated" => Ok(Self::Unauthenticated),
			_ => Err(CoreError::InvalidSpanStatus(s.to_string())),
		}
	}
}

/// A description of the error that ended a span.
///
/// The error value itself goes back to the caller, so the span keeps its
/// type name and the messages of its cause chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSnapshot {
	#[serde(rename = "type")]
	pub ty: String,
	pub message: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub sources: Vec<String>,
}

impl ErrorSnapshot {
	pub fn new(ty: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			ty: ty.into(),
			message: message.into(),
			sources: Vec::new(),
		}
	}

	/// Snapshots an error and the messages of everything in its source chain.
	pub fn of<E>(ty: impl Into<String>, error: &E) -> Self
	where
		E: Error + ?Sized,
	{
		let mut sources = Vec::new();
		let mut next = error.source();
		while let Some(source) = next {
			sources.push(source.to_string());
			next = source.source();
		}

		Self {
			ty: ty.into(),
			message: error.to_string(),
			sources,
		}
	}
}

/// A finished child span of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
	pub trace_id: TraceId,
	pub span_id: SpanId,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub parent_span_id: Option<SpanId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub op: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<SpanStatus>,
	pub start_timestamp: DateTime<Utc>,
	pub timestamp: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub tags: BTreeMap<String, String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub throwable: Option<ErrorSnapshot>,
}
