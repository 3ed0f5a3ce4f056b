//! Configuration for broker connections

use std::time::Duration;

use rumqttc::{MqttOptions, OptionError, QoS};

use super::error::ConnectionError;

/// Client-level behavior settings
#[derive(Debug, Clone)]
pub struct ClientSettings {
	/// Capacity of the rumqttc request channel
	pub event_loop_capacity: usize,
	/// Capacity of the command channel of the subscription router
	pub command_channel_capacity: usize,
	/// Per-subscription buffer of undelivered inbound messages
	pub subscription_capacity: usize,
	/// How long `connect` waits for CONNACK
	pub connection_timeout_millis: u64,
	/// How long `shutdown` waits for the event loop to finish on its own
	pub shutdown_timeout_millis: u64,
	/// QoS used for published readings
	pub publish_qos: QoS,
	/// QoS requested for subscriptions
	pub subscribe_qos: QoS,
}

impl Default for ClientSettings {
	fn default() -> Self {
		Self {
			event_loop_capacity: 10,
			command_channel_capacity: 100,
			subscription_capacity: 100,
			connection_timeout_millis: 5000,
			shutdown_timeout_millis: 2000,
			publish_qos: QoS::AtLeastOnce,
			subscribe_qos: QoS::AtLeastOnce,
		}
	}
}

impl ClientSettings {
	/// Rejects zero capacities, which would make channel creation panic
	pub fn validate(&self) -> Result<(), ConnectionError> {
		let capacities = [
			("event_loop_capacity", self.event_loop_capacity),
			("command_channel_capacity", self.command_channel_capacity),
			("subscription_capacity", self.subscription_capacity),
		];
		for (name, value) in capacities {
			if value == 0 {
				return Err(ConnectionError::InvalidSetting(format!(
					"{name} must be greater than 0"
				)));
			}
		}
		Ok(())
	}

	pub fn connection_timeout(&self) -> Duration {
		Duration::from_millis(self.connection_timeout_millis)
	}

	pub fn shutdown_timeout(&self) -> Duration {
		Duration::from_millis(self.shutdown_timeout_millis)
	}
}

/// Configuration for a broker connection
#[derive(Debug, Clone)]
pub struct BrokerConfig {
	/// Underlying MQTT connection options (from rumqttc)
	pub connection: MqttOptions,
	/// Client-level behavior settings
	pub settings: ClientSettings,
}

impl BrokerConfig {
	/// Create config with default settings
	pub fn new(client_id: &str, host: &str, port: u16) -> Self {
		Self {
			connection: MqttOptions::new(client_id, host, port),
			settings: ClientSettings::default(),
		}
	}

	/// Parse configuration from an MQTT URL
	///
	/// Supports: tcp://, mqtt://, ssl://, mqtts://, ws://, wss://. The
	/// client id is given as a `client_id` query parameter.
	pub fn from_url(url: &str) -> Result<Self, OptionError> {
		Ok(Self {
			connection: MqttOptions::parse_url(url)?,
			settings: ClientSettings::default(),
		})
	}

	/// Create config for localhost:1883
	pub fn localhost(client_id: &str) -> Self {
		Self::new(client_id, "localhost", 1883)
	}

	/// Sets username and password sent in CONNECT
	pub fn with_credentials(
		&mut self,
		username: impl Into<String>,
		password: impl Into<String>,
	) -> &mut Self {
		self.connection.set_credentials(username, password);
		self
	}

	/// Replaces the client settings
	pub fn with_settings(&mut self, settings: ClientSettings) -> &mut Self {
		self.settings = settings;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parses_url_with_client_id() {
		let config =
			BrokerConfig::from_url("mqtt://broker.local:1884?client_id=pub-1")
				.unwrap();
		assert_eq!(
			config.connection.broker_address(),
			("broker.local".to_string(), 1884)
		);
		assert_eq!(config.connection.client_id(), "pub-1");
	}

	#[test]
	fn test_url_without_client_id_is_rejected() {
		assert!(BrokerConfig::from_url("mqtt://broker.local:1883").is_err());
	}

	#[test]
	fn test_credentials_are_applied() {
		let mut config = BrokerConfig::localhost("sub-1");
		config.with_credentials("mtuuser", "secret");
		assert_eq!(
			config.connection.credentials(),
			Some(("mtuuser".to_string(), "secret".to_string()))
		);
	}

	#[test]
	fn test_zero_capacity_is_invalid() {
		let settings = ClientSettings {
			subscription_capacity: 0,
			..ClientSettings::default()
		};
		assert!(matches!(
			settings.validate(),
			Err(ConnectionError::InvalidSetting(message))
				if message.contains("subscription_capacity")
		));
		assert!(ClientSettings::default().validate().is_ok());
	}
}
