//! Configuration loading
//!
//! Settings come from a JSON file in the user configuration directory
//! (`mqttoast.json`). Defaults are applied first and the file overlays
//! only the fields it names, so a partial file still yields a fully
//! populated configuration. A missing file is not an error.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// File name looked up inside the user configuration directory.
pub const CONFIG_FILE: &str = "mqttoast.json";

/// Errors that can occur while loading the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
	/// No platform configuration directory could be resolved
	#[error("could not determine the user configuration directory")]
	NoConfigDir,

	/// The config file exists but could not be read
	#[error("failed to read configuration from {path}")]
	Read {
		/// Path that was read
		path: PathBuf,
		/// Underlying I/O error
		#[source]
		source: io::Error,
	},

	/// The config file is not valid JSON
	#[error("failed to parse configuration from {path}")]
	Parse {
		/// Path that was parsed
		path: PathBuf,
		/// Underlying JSON error
		#[source]
		source: serde_json::Error,
	},
}

/// One subscription entry, as written in the configuration file.
///
/// Empty `title` and `body` select the default rendering rule; empty
/// `icon` falls back to the global default icon.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
	/// Topic filter to subscribe to, may contain wildcards
	pub topic: String,
	/// Title template source, empty for the default rule
	pub title: String,
	/// Body template source, empty for the default rule
	pub body: String,
	/// Notification icon for this rule, empty for the global default
	pub icon: String,
}

/// Connection and default settings for the bridge.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
	/// MQTT broker hostname or IP address
	pub host: String,
	/// MQTT broker port
	pub port: u16,
	/// Username, credentials are only set when this is non-empty
	pub user: String,
	/// Password, only used together with `user`
	pub pass: String,
	/// Connect over TLS instead of plain TCP
	pub secure: bool,
	/// Timeout in seconds for connect and for each subscribe
	pub timeout: u64,
	/// Default notification icon for rules without their own
	pub icon: String,
	/// Subscription rules, in subscribe and lookup-precedence order
	pub subscriptions: Vec<RuleConfig>,
}

impl Default for GlobalConfig {
	fn default() -> Self {
		Self {
			host: "localhost".to_string(),
			port: 1883,
			user: String::new(),
			pass: String::new(),
			secure: false,
			timeout: 5,
			icon: "dialog-information".to_string(),
			subscriptions: Vec::new(),
		}
	}
}

impl GlobalConfig {
	/// Load from the default path, falling back to defaults when no
	/// config file exists.
	pub fn load() -> Result<Self, ConfigError> {
		let path = dirs::config_dir()
			.ok_or(ConfigError::NoConfigDir)?
			.join(CONFIG_FILE);
		Self::load_from(&path)
	}

	/// Load from an explicit path; a missing file yields defaults.
	pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
		let raw = match std::fs::read_to_string(path) {
			| Ok(raw) => raw,
			| Err(err) if err.kind() == io::ErrorKind::NotFound => {
				info!(
					path = %path.display(),
					"No config file found, using defaults"
				);
				return Ok(Self::default());
			}
			| Err(source) => {
				return Err(ConfigError::Read {
					path: path.to_path_buf(),
					source,
				});
			}
		};
		serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})
	}

	/// Setup timeout for connect and per-subscription acknowledgement.
	pub fn setup_timeout(&self) -> Duration {
		Duration::from_secs(self.timeout)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_complete() {
		let config = GlobalConfig::default();
		assert_eq!(config.host, "localhost");
		assert_eq!(config.port, 1883);
		assert_eq!(config.timeout, 5);
		assert_eq!(config.icon, "dialog-information");
		assert!(!config.secure);
		assert!(config.user.is_empty());
		assert!(config.subscriptions.is_empty());
	}

	#[test]
	fn missing_file_yields_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(CONFIG_FILE);
		let config = GlobalConfig::load_from(&path).unwrap();
		assert_eq!(config.host, "localhost");
		assert_eq!(config.port, 1883);
	}

	#[test]
	fn partial_file_keeps_defaults_for_missing_fields() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(CONFIG_FILE);
		std::fs::write(
			&path,
			r#"{
				"host": "broker.local",
				"subscriptions": [{"topic": "calendar/alert"}]
			}"#,
		)
		.unwrap();

		let config = GlobalConfig::load_from(&path).unwrap();
		assert_eq!(config.host, "broker.local");
		assert_eq!(config.port, 1883);
		assert_eq!(config.icon, "dialog-information");
		assert_eq!(config.subscriptions.len(), 1);
		assert_eq!(config.subscriptions[0].topic, "calendar/alert");
		assert!(config.subscriptions[0].title.is_empty());
		assert!(config.subscriptions[0].icon.is_empty());
	}

	#[test]
	fn full_file_overrides_everything() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(CONFIG_FILE);
		std::fs::write(
			&path,
			r#"{
				"host": "mqtt.example.org",
				"port": 8883,
				"user": "alice",
				"pass": "secret",
				"secure": true,
				"timeout": 1,
				"icon": "mail-unread",
				"subscriptions": [
					{
						"topic": "home/+/temp",
						"title": "{{ topic[1] }}",
						"body": "{{ payload }}",
						"icon": "weather-clear"
					}
				]
			}"#,
		)
		.unwrap();

		let config = GlobalConfig::load_from(&path).unwrap();
		assert_eq!(config.port, 8883);
		assert!(config.secure);
		assert_eq!(config.setup_timeout(), Duration::from_secs(1));
		assert_eq!(config.subscriptions[0].icon, "weather-clear");
	}

	#[test]
	fn malformed_file_is_a_parse_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join(CONFIG_FILE);
		std::fs::write(&path, "{ not json").unwrap();

		let err = GlobalConfig::load_from(&path).unwrap_err();
		assert!(matches!(err, ConfigError::Parse { .. }));
	}
}
