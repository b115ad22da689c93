// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack trace types.

use serde::{Deserialize, Serialize};

/// Stack trace containing multiple frames, outermost call first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stacktrace {
	pub frames: Vec<Frame>,
}

impl Stacktrace {
	pub fn is_empty(&self) -> bool {
		self.frames.is_empty()
	}

	/// The first frame belonging to application code.
	pub fn culprit(&self) -> Option<&Frame> {
		self.frames.iter().find(|f| f.in_app)
	}
}

/// A single stack frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
	/// Function name, demangled
	#[serde(skip_serializing_if = "Option::is_none")]
	pub function: Option<String>,
	/// Module path
	#[serde(skip_serializing_if = "Option::is_none")]
	pub module: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub filename: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub abs_path: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub lineno: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub colno: Option<u32>,
	/// User code vs dependency
	pub in_app: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn culprit_is_first_in_app_frame() {
		let stacktrace = Stacktrace {
			frames: vec![
				Frame {
					function: Some("std::rt::lang_start".to_string()),
					..Default::default()
				},
				Frame {
					function: Some("my_app::handler".to_string()),
					in_app: true,
					..Default::default()
				},
				Frame {
					function: Some("my_app::main".to_string()),
					in_app: true,
					..Default::default()
				},
			],
		};

		assert_eq!(
			stacktrace.culprit().and_then(|f| f.function.as_deref()),
			Some("my_app::handler")
		);
	}

	#[test]
	fn no_culprit_without_in_app_frames() {
		assert!(Stacktrace::default().culprit().is_none());
	}
}
