use rumqttc::{ClientError, ConnectReturnCode, OptionError};

/// Errors establishing a broker connection. Fatal to the session that
/// requested it; retrying is left to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
	/// Connection URL or options could not be parsed
	#[error("Configuration error: {0}")]
	Configuration(#[from] OptionError),

	/// Client setting has an unusable value
	#[error("Invalid client setting: {0}")]
	InvalidSetting(String),

	/// Network-level failure while connecting
	#[error("Network connection failed: {0}")]
	Network(#[from] rumqttc::ConnectionError),

	/// Broker answered CONNACK with a non-success code
	#[error("Broker rejected connection: {code:?}")]
	BrokerRejected { code: ConnectReturnCode },

	/// No CONNACK within the configured timeout
	#[error("Connection establishment timed out after {timeout_millis}ms")]
	Timeout { timeout_millis: u64 },
}

/// Why a publish attempt was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum PublishFailure {
	/// Connection to the broker is currently down
	#[error("Broker connection is down")]
	NotConnected,

	/// Client request queue rejected the publish
	#[error("Client rejected publish request: {0}")]
	Client(#[from] ClientError),

	/// Broker side has shut down
	#[error("Broker has shut down")]
	BrokerClosed,
}
