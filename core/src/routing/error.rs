use thiserror::Error;

/// Errors when sending commands to the subscription router
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
	/// Router has shut down
	#[error("Channel has been closed")]
	ChannelClosed,
}

/// Errors during subscription operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
	/// Communication channel closed
	#[error("Communication channel closed")]
	ChannelClosed,
	/// Response from the router was lost
	#[error("Response from subscription router was lost")]
	ResponseLost,
	/// Broker refused or never received the SUBSCRIBE request
	#[error("Failed to subscribe to '{filter}' on the MQTT broker")]
	SubscribeFailed { filter: String },
}
