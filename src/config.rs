//! Process configuration read from the environment
//!
//! `.env` files are loaded first (a git-ignored `.env.local` overrides the
//! committed `.env`), then real environment variables win over both.

use std::path::PathBuf;
use std::time::Duration;

use amerike_telemetry_core::broker::BrokerConfig;
use amerike_telemetry_core::publisher::{DEFAULT_INTERVAL, DEFAULT_TICKS};
use amerike_telemetry_core::{ConnectionError, RunLimit, TopicClassifier};
use amerike_telemetry_core::topic::{DEFAULT_NAMESPACE, TopicError};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_BROKER_URL: &str = "mqtt://localhost:1883";
pub const DEFAULT_SPOOL_DIR: &str = "logs";

/// Invalid or unusable configuration
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Variable is set to something that cannot be parsed
	#[error("Invalid value '{value}' for {key}: {reason}")]
	InvalidValue {
		key: &'static str,
		value: String,
		reason: String,
	},

	/// Namespace is not a valid topic prefix
	#[error("Invalid telemetry namespace: {0}")]
	Namespace(#[from] TopicError),

	/// Broker URL or client settings were rejected
	#[error("Invalid broker configuration: {0}")]
	Broker(#[from] ConnectionError),
}

/// Settings shared by both entry points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
	/// Broker URL without the `client_id` parameter
	pub broker_url: String,
	pub username: Option<String>,
	pub password: Option<String>,
	/// Prefix of the generated MQTT client id
	pub client_prefix: String,
	/// First topic level of every published reading
	pub namespace: String,
	pub spool_dir: PathBuf,
	/// Pause between publish ticks
	pub interval: Duration,
	pub limit: RunLimit,
	/// Publish into the in-process broker instead of the network
	pub loopback: bool,
}

impl AppConfig {
	/// Loads `.env` files and reads the process environment.
	///
	/// `default_prefix` names the client id when `MQTT_CLIENT_PREFIX` is
	/// not set.
	pub fn from_env(default_prefix: &str) -> Result<Self, ConfigError> {
		load_env_files();
		Self::from_lookup(default_prefix, |key| std::env::var(key).ok())
	}

	/// Builds the configuration from an arbitrary key lookup
	pub fn from_lookup<F>(
		default_prefix: &str,
		lookup: F,
	) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let value = |key: &str| {
			lookup(key)
				.map(|value| value.trim().to_string())
				.filter(|value| !value.is_empty())
		};

		let interval = match value("TELEMETRY_INTERVAL_MS") {
			| Some(raw) => Duration::from_millis(parse_number(
				"TELEMETRY_INTERVAL_MS",
				&raw,
			)?),
			| None => DEFAULT_INTERVAL,
		};
		let limit = match value("TELEMETRY_TICKS") {
			| Some(raw) => parse_limit(&raw)?,
			| None => RunLimit::Ticks(DEFAULT_TICKS),
		};
		let loopback = match value("TELEMETRY_LOOPBACK") {
			| Some(raw) => parse_flag("TELEMETRY_LOOPBACK", &raw)?,
			| None => false,
		};

		Ok(Self {
			broker_url: value("MQTT_BROKER")
				.unwrap_or_else(|| DEFAULT_BROKER_URL.to_string()),
			username: value("MQTT_USERNAME"),
			password: value("MQTT_PASSWORD"),
			client_prefix: value("MQTT_CLIENT_PREFIX")
				.unwrap_or_else(|| default_prefix.to_string()),
			namespace: value("TELEMETRY_NAMESPACE")
				.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
			spool_dir: value("TELEMETRY_SPOOL_DIR")
				.unwrap_or_else(|| DEFAULT_SPOOL_DIR.to_string())
				.into(),
			interval,
			limit,
			loopback,
		})
	}

	/// Broker URL with a fresh `client_id` query parameter
	pub fn broker_url_with_client_id(&self) -> String {
		let client_id = client_id(&self.client_prefix);
		if self.broker_url.contains('?') {
			format!("{}&client_id={client_id}", self.broker_url)
		} else {
			format!("{}?client_id={client_id}", self.broker_url)
		}
	}

	/// Broker configuration with credentials applied
	pub fn broker_config(&self) -> Result<BrokerConfig, ConfigError> {
		let url = self.broker_url_with_client_id();
		let mut config =
			BrokerConfig::from_url(&url).map_err(ConnectionError::from)?;
		if let Some(username) = &self.username {
			let password = self.password.clone().unwrap_or_default();
			config.with_credentials(username.clone(), password);
		}
		Ok(config)
	}

	pub fn classifier(&self) -> Result<TopicClassifier, ConfigError> {
		Ok(TopicClassifier::new(self.namespace.as_str())?)
	}
}

/// `<prefix>_<first 8 hex digits of a v4 uuid>`
pub fn client_id(prefix: &str) -> String {
	let uuid = Uuid::new_v4().simple().to_string();
	format!("{prefix}_{}", &uuid[.. 8])
}

/// Loads `.env` then `.env.local`; missing files are ignored.
pub fn load_env_files() {
	dotenv::dotenv().ok();
	if std::path::Path::new(".env.local").exists() {
		dotenv::from_filename(".env.local").ok();
	}
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
	raw.parse().map_err(|err: std::num::ParseIntError| {
		ConfigError::InvalidValue {
			key,
			value: raw.to_string(),
			reason: err.to_string(),
		}
	})
}

/// `0` and `unbounded` both mean run until interrupted
fn parse_limit(raw: &str) -> Result<RunLimit, ConfigError> {
	if raw.eq_ignore_ascii_case("unbounded") {
		return Ok(RunLimit::Unbounded);
	}
	match parse_number("TELEMETRY_TICKS", raw)? {
		| 0 => Ok(RunLimit::Unbounded),
		| ticks => Ok(RunLimit::Ticks(ticks)),
	}
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
	match raw.to_ascii_lowercase().as_str() {
		| "1" | "true" | "yes" | "on" => Ok(true),
		| "0" | "false" | "no" | "off" => Ok(false),
		| _ => Err(ConfigError::InvalidValue {
			key,
			value: raw.to_string(),
			reason: "expected 1/0, true/false, yes/no or on/off".to_string(),
		}),
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(key, value)| (key.to_string(), value.to_string()))
			.collect();
		AppConfig::from_lookup("publish", |key| vars.get(key).cloned())
	}

	#[test]
	fn test_defaults_when_nothing_is_set() {
		let config = load(&[]).unwrap();
		assert_eq!(config.broker_url, "mqtt://localhost:1883");
		assert_eq!(config.client_prefix, "publish");
		assert_eq!(config.namespace, "amerike");
		assert_eq!(config.spool_dir, PathBuf::from("logs"));
		assert_eq!(config.interval, Duration::from_secs(2));
		assert_eq!(config.limit, RunLimit::Ticks(10));
		assert_eq!(config.username, None);
		assert!(!config.loopback);
	}

	#[test]
	fn test_reads_overrides() {
		let config = load(&[
			("MQTT_BROKER", "mqtt://10.0.0.5:1884"),
			("MQTT_USERNAME", "mtuuser"),
			("MQTT_PASSWORD", "secret"),
			("MQTT_CLIENT_PREFIX", "bench"),
			("TELEMETRY_NAMESPACE", "campus"),
			("TELEMETRY_SPOOL_DIR", "/var/spool/telemetry"),
			("TELEMETRY_INTERVAL_MS", "250"),
			("TELEMETRY_TICKS", "3"),
			("TELEMETRY_LOOPBACK", "yes"),
		])
		.unwrap();
		assert_eq!(config.broker_url, "mqtt://10.0.0.5:1884");
		assert_eq!(config.username.as_deref(), Some("mtuuser"));
		assert_eq!(config.password.as_deref(), Some("secret"));
		assert_eq!(config.client_prefix, "bench");
		assert_eq!(config.interval, Duration::from_millis(250));
		assert_eq!(config.limit, RunLimit::Ticks(3));
		assert!(config.loopback);
		assert_eq!(config.classifier().unwrap().namespace(), "campus");
	}

	#[test]
	fn test_zero_or_unbounded_ticks_run_forever() {
		for raw in ["0", "unbounded", "UNBOUNDED"] {
			let config = load(&[("TELEMETRY_TICKS", raw)]).unwrap();
			assert_eq!(config.limit, RunLimit::Unbounded, "{raw}");
		}
	}

	#[test]
	fn test_blank_values_fall_back_to_defaults() {
		let config =
			load(&[("MQTT_BROKER", "  "), ("TELEMETRY_TICKS", "")]).unwrap();
		assert_eq!(config.broker_url, DEFAULT_BROKER_URL);
		assert_eq!(config.limit, RunLimit::Ticks(10));
	}

	#[test]
	fn test_rejects_garbage_numbers() {
		let err = load(&[("TELEMETRY_INTERVAL_MS", "soon")]).unwrap_err();
		assert!(matches!(
			err,
			ConfigError::InvalidValue {
				key: "TELEMETRY_INTERVAL_MS",
				..
			}
		));
		assert!(load(&[("TELEMETRY_TICKS", "-1")]).is_err());
		assert!(load(&[("TELEMETRY_LOOPBACK", "maybe")]).is_err());
	}

	#[test]
	fn test_invalid_namespace_is_reported() {
		let config = load(&[("TELEMETRY_NAMESPACE", "bad/#")]).unwrap();
		assert!(matches!(config.classifier(), Err(ConfigError::Namespace(_))));

		let config = load(&[("TELEMETRY_NAMESPACE", "plant -> a")]).unwrap();
		assert!(matches!(
			config.classifier(),
			Err(ConfigError::Namespace(TopicError::UnspoolableNamespace { .. }))
		));
	}

	#[test]
	fn test_client_id_is_appended_to_the_url() {
		let config = load(&[("MQTT_BROKER", "mqtt://host:1883")]).unwrap();
		let url = config.broker_url_with_client_id();
		assert!(url.starts_with("mqtt://host:1883?client_id=publish_"), "{url}");
		assert_eq!(url.len(), "mqtt://host:1883?client_id=publish_".len() + 8);

		let config =
			load(&[("MQTT_BROKER", "mqtt://host:1883?keep_alive_secs=5")])
				.unwrap();
		assert!(config.broker_url_with_client_id().contains("&client_id="));
		config.broker_config().unwrap();
	}

	#[test]
	fn test_credentials_reach_the_connect_options() {
		let config = load(&[
			("MQTT_USERNAME", "mtuuser"),
			("MQTT_PASSWORD", "amerike"),
		])
		.unwrap();
		let broker = config.broker_config().unwrap();
		assert_eq!(
			broker.connection.credentials(),
			Some(("mtuuser".to_string(), "amerike".to_string()))
		);
	}
}
