// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SDK options and the builder that layers them from files, environment and code.

use std::collections::BTreeMap;
use std::time::Duration;

use loom_monitor_core::SdkVersion;
use serde::Deserialize;

use crate::error::{MonitorError, Result};

/// SDK name reported in events.
pub const SDK_NAME: &str = "loom-monitor.rust";
/// SDK version reported in events.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of breadcrumbs a scope keeps.
const MAX_BREADCRUMBS: usize = 100;

/// How long a resolved hostname is reused.
const HOSTNAME_CACHE_TTL: Duration = Duration::from_secs(5 * 60 * 60);

/// Prefix of the environment variables read by [`OptionsBuilder::env`].
pub const ENV_PREFIX: &str = "LOOM_MONITOR_";

/// Options consumed by the processor chain and the tracing helpers.
#[derive(Debug, Clone)]
pub struct Options {
	/// Release of the application, e.g. `my-app@1.2.3`.
	pub release: Option<String>,
	/// Deployment environment. Events fall back to `production` when unset.
	pub environment: Option<String>,
	/// Build variant of the release.
	pub dist: Option<String>,
	/// Name of the host; resolved from the OS when unset and
	/// `attach_server_name` is enabled.
	pub server_name: Option<String>,
	pub sdk_version: SdkVersion,
	/// Tags added to every event that does not already carry them.
	pub tags: BTreeMap<String, String>,
	pub attach_server_name: bool,
	/// Attach a snapshot of every live thread to error events.
	pub attach_threads: bool,
	/// Attach the current thread's stack trace to events without exceptions.
	pub attach_stacktrace: bool,
	/// Send personally identifiable information such as IP addresses.
	pub send_default_pii: bool,
	/// Module prefixes always considered application code.
	pub in_app_includes: Vec<String>,
	/// Module prefixes never considered application code.
	pub in_app_excludes: Vec<String>,
	pub max_breadcrumbs: usize,
	pub hostname_cache_ttl: Duration,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			release: None,
			environment: None,
			dist: None,
			server_name: None,
			sdk_version: SdkVersion::new(SDK_NAME, SDK_VERSION),
			tags: BTreeMap::new(),
			attach_server_name: true,
			attach_threads: false,
			attach_stacktrace: false,
			send_default_pii: false,
			in_app_includes: Vec::new(),
			in_app_excludes: Vec::new(),
			max_breadcrumbs: MAX_BREADCRUMBS,
			hostname_cache_ttl: HOSTNAME_CACHE_TTL,
		}
	}
}

impl Options {
	/// Creates a new builder starting from the defaults.
	pub fn builder() -> OptionsBuilder {
		OptionsBuilder::new()
	}

	/// Parses options from a TOML document.
	pub fn from_toml_str(source: &str) -> Result<Self> {
		Ok(OptionsBuilder::new().toml(source)?.build())
	}
}

/// On-disk representation of [`Options`]. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OptionsFile {
	release: Option<String>,
	environment: Option<String>,
	dist: Option<String>,
	server_name: Option<String>,
	tags: Option<BTreeMap<String, String>>,
	attach_server_name: Option<bool>,
	attach_threads: Option<bool>,
	attach_stacktrace: Option<bool>,
	send_default_pii: Option<bool>,
	in_app_includes: Option<Vec<String>>,
	in_app_excludes: Option<Vec<String>>,
	max_breadcrumbs: Option<usize>,
	hostname_cache_ttl_secs: Option<u64>,
}

/// Builder for [`Options`].
///
/// Sources are applied in call order, so later calls win. The usual layering
/// is defaults, then [`toml`](Self::toml), then [`env`](Self::env), then
/// explicit setters.
///
/// # Example
///
/// ```
/// use loom_monitor::Options;
///
/// let options = Options::builder()
///     .release("my-app@1.2.3")
///     .environment("staging")
///     .tag("region", "eu-west-1")
///     .send_default_pii(true)
///     .build();
///
/// assert_eq!(options.environment.as_deref(), Some("staging"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
	options: Options,
}

impl OptionsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Applies every key present in a TOML document.
	pub fn toml(mut self, source: &str) -> Result<Self> {
		let file: OptionsFile = toml::from_str(source)?;
		let o = &mut self.options;

		if file.release.is_some() {
			o.release = file.release;
		}
		if file.environment.is_some() {
			o.environment = file.environment;
		}
		if file.dist.is_some() {
			o.dist = file.dist;
		}
		if file.server_name.is_some() {
			o.server_name = file.server_name;
		}
		if let Some(tags) = file.tags {
			o.tags.extend(tags);
		}
		if let Some(v) = file.attach_server_name {
			o.attach_server_name = v;
		}
		if let Some(v) = file.attach_threads {
			o.attach_threads = v;
		}
		if let Some(v) = file.attach_stacktrace {
			o.attach_stacktrace = v;
		}
		if let Some(v) = file.send_default_pii {
			o.send_default_pii = v;
		}
		if let Some(v) = file.in_app_includes {
			o.in_app_includes = v;
		}
		if let Some(v) = file.in_app_excludes {
			o.in_app_excludes = v;
		}
		if let Some(v) = file.max_breadcrumbs {
			o.max_breadcrumbs = v;
		}
		if let Some(secs) = file.hostname_cache_ttl_secs {
			o.hostname_cache_ttl = Duration::from_secs(secs);
		}

		Ok(self)
	}

	/// Applies `LOOM_MONITOR_*` variables from the process environment.
	pub fn env(self) -> Result<Self> {
		self.env_with(|key| std::env::var(key).ok())
	}

	/// Applies `LOOM_MONITOR_*` variables from an arbitrary lookup.
	pub fn env_with<F>(mut self, lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());
		let o = &mut self.options;

		if let Some(v) = var("RELEASE") {
			o.release = Some(v);
		}
		if let Some(v) = var("ENVIRONMENT") {
			o.environment = Some(v);
		}
		if let Some(v) = var("DIST") {
			o.dist = Some(v);
		}
		if let Some(v) = var("SERVER_NAME") {
			o.server_name = Some(v);
		}
		if let Some(v) = var("ATTACH_SERVER_NAME") {
			o.attach_server_name = parse_bool("ATTACH_SERVER_NAME", &v)?;
		}
		if let Some(v) = var("ATTACH_THREADS") {
			o.attach_threads = parse_bool("ATTACH_THREADS", &v)?;
		}
		if let Some(v) = var("ATTACH_STACKTRACE") {
			o.attach_stacktrace = parse_bool("ATTACH_STACKTRACE", &v)?;
		}
		if let Some(v) = var("SEND_DEFAULT_PII") {
			o.send_default_pii = parse_bool("SEND_DEFAULT_PII", &v)?;
		}

		Ok(self)
	}

	pub fn release(mut self, release: impl Into<String>) -> Self {
		self.options.release = Some(release.into());
		self
	}

	pub fn environment(mut self, environment: impl Into<String>) -> Self {
		self.options.environment = Some(environment.into());
		self
	}

	pub fn dist(mut self, dist: impl Into<String>) -> Self {
		self.options.dist = Some(dist.into());
		self
	}

	pub fn server_name(mut self, server_name: impl Into<String>) -> Self {
		self.options.server_name = Some(server_name.into());
		self
	}

	pub fn sdk_version(mut self, sdk_version: SdkVersion) -> Self {
		self.options.sdk_version = sdk_version;
		self
	}

	/// Adds a default tag.
	pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.options.tags.insert(key.into(), value.into());
		self
	}

	pub fn attach_server_name(mut self, enabled: bool) -> Self {
		self.options.attach_server_name = enabled;
		self
	}

	pub fn attach_threads(mut self, enabled: bool) -> Self {
		self.options.attach_threads = enabled;
		self
	}

	pub fn attach_stacktrace(mut self, enabled: bool) -> Self {
		self.options.attach_stacktrace = enabled;
		self
	}

	pub fn send_default_pii(mut self, enabled: bool) -> Self {
		self.options.send_default_pii = enabled;
		self
	}

	pub fn in_app_include(mut self, prefix: impl Into<String>) -> Self {
		self.options.in_app_includes.push(prefix.into());
		self
	}

	pub fn in_app_exclude(mut self, prefix: impl Into<String>) -> Self {
		self.options.in_app_excludes.push(prefix.into());
		self
	}

	pub fn max_breadcrumbs(mut self, max: usize) -> Self {
		self.options.max_breadcrumbs = max;
		self
	}

	pub fn hostname_cache_ttl(mut self, ttl: Duration) -> Self {
		self.options.hostname_cache_ttl = ttl;
		self
	}

	pub fn build(self) -> Options {
		self.options
	}
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(MonitorError::Config(format!(
			"{ENV_PREFIX}{name} must be a boolean, got {value:?}"
		))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |key| vars.get(key).cloned()
	}

	#[test]
	fn test_defaults() {
		let options = Options::default();
		assert!(options.attach_server_name);
		assert!(!options.attach_threads);
		assert!(!options.attach_stacktrace);
		assert!(!options.send_default_pii);
		assert_eq!(options.max_breadcrumbs, MAX_BREADCRUMBS);
		assert_eq!(options.sdk_version.name, SDK_NAME);
		assert!(options.environment.is_none());
	}

	#[test]
	fn test_builder_setters() {
		let options = Options::builder()
			.release("1.0.0")
			.environment("staging")
			.dist("42")
			.server_name("web-01")
			.tag("a", "1")
			.attach_threads(true)
			.in_app_include("my_app")
			.build();

		assert_eq!(options.release.as_deref(), Some("1.0.0"));
		assert_eq!(options.environment.as_deref(), Some("staging"));
		assert_eq!(options.dist.as_deref(), Some("42"));
		assert_eq!(options.server_name.as_deref(), Some("web-01"));
		assert_eq!(options.tags.get("a").map(String::as_str), Some("1"));
		assert!(options.attach_threads);
		assert_eq!(options.in_app_includes, vec!["my_app".to_string()]);
	}

	#[test]
	fn test_from_toml() {
		let options = Options::from_toml_str(
			r#"
release = "my-app@2.0.0"
send_default_pii = true
hostname_cache_ttl_secs = 60

[tags]
team = "core"
"#,
		)
		.unwrap();

		assert_eq!(options.release.as_deref(), Some("my-app@2.0.0"));
		assert!(options.send_default_pii);
		assert_eq!(options.hostname_cache_ttl, Duration::from_secs(60));
		assert_eq!(options.tags.get("team").map(String::as_str), Some("core"));
		// untouched keys keep their defaults
		assert!(options.attach_server_name);
	}

	#[test]
	fn test_toml_rejects_unknown_keys() {
		let result = Options::from_toml_str("relaese = \"typo\"");
		assert!(matches!(result, Err(MonitorError::ConfigFile(_))));
	}

	#[test]
	fn test_env_overrides_toml() {
		let options = Options::builder()
			.toml("environment = \"staging\"\nattach_threads = false")
			.unwrap()
			.env_with(lookup(&[
				("LOOM_MONITOR_ENVIRONMENT", "canary"),
				("LOOM_MONITOR_ATTACH_THREADS", "yes"),
			]))
			.unwrap()
			.build();

		assert_eq!(options.environment.as_deref(), Some("canary"));
		assert!(options.attach_threads);
	}

	#[test]
	fn test_explicit_setter_overrides_env() {
		let options = Options::builder()
			.env_with(lookup(&[("LOOM_MONITOR_RELEASE", "from-env")]))
			.unwrap()
			.release("from-code")
			.build();

		assert_eq!(options.release.as_deref(), Some("from-code"));
	}

	#[test]
	fn test_empty_env_value_is_ignored() {
		let options = Options::builder()
			.release("kept")
			.env_with(lookup(&[("LOOM_MONITOR_RELEASE", "")]))
			.unwrap()
			.build();

		assert_eq!(options.release.as_deref(), Some("kept"));
	}

	#[test]
	fn test_invalid_env_bool() {
		let result = Options::builder()
			.env_with(lookup(&[("LOOM_MONITOR_SEND_DEFAULT_PII", "maybe")]));

		match result {
			Err(MonitorError::Config(message)) => {
				assert!(message.contains("LOOM_MONITOR_SEND_DEFAULT_PII"));
			}
			other => panic!("expected config error, got {other:?}"),
		}
	}
}
