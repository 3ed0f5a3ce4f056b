//! Broker abstraction used by the publish loop and the subscriber session
//!
//! [`MessageBroker`] is the seam between the core and the transport. Two
//! implementations ship with the crate: [`MqttBroker`] talks to a real
//! broker through rumqttc, [`MemoryBroker`] routes messages in process.

use std::future::Future;

pub mod config;
pub mod error;
pub mod memory;
pub mod mqtt;

pub use config::{BrokerConfig, ClientSettings};
pub use error::{ConnectionError, PublishFailure};
pub use memory::MemoryBroker;
pub use mqtt::MqttBroker;

use crate::routing::{BrokerSubscription, SubscriptionError};
use crate::topic::{Topic, TopicFilter};

/// Result of a single publish attempt.
///
/// Delivery is classified coarsely: every failure, transient or permanent,
/// is a `Failed` and is handled the same way by the publish loop.
#[derive(Debug)]
pub enum DeliveryOutcome {
	/// The broker connection accepted the message
	Delivered,
	/// The message was not accepted
	Failed(PublishFailure),
}

impl DeliveryOutcome {
	pub fn is_delivered(&self) -> bool {
		matches!(self, DeliveryOutcome::Delivered)
	}

	/// Failure reason, if any
	pub fn failure(&self) -> Option<&PublishFailure> {
		match self {
			| DeliveryOutcome::Delivered => None,
			| DeliveryOutcome::Failed(failure) => Some(failure),
		}
	}
}

/// Capabilities the core needs from a message broker connection.
///
/// `publish` reports whether the connection accepted the message; it does
/// not wait for wire delivery. `subscribe` returns a channel endpoint that
/// yields every message matching the filter, in transport order.
pub trait MessageBroker: Send + Sync {
	/// Attempts to publish `payload` on `topic`
	fn publish(
		&self,
		topic: &Topic,
		payload: &[u8],
	) -> impl Future<Output = DeliveryOutcome> + Send;

	/// Registers interest in every topic matched by `filter`
	fn subscribe(
		&self,
		filter: &TopicFilter,
	) -> impl Future<Output = Result<BrokerSubscription, SubscriptionError>> + Send;
}

impl<B> MessageBroker for &B
where B: MessageBroker + ?Sized
{
	fn publish(
		&self,
		topic: &Topic,
		payload: &[u8],
	) -> impl Future<Output = DeliveryOutcome> + Send {
		(**self).publish(topic, payload)
	}

	fn subscribe(
		&self,
		filter: &TopicFilter,
	) -> impl Future<Output = Result<BrokerSubscription, SubscriptionError>> + Send
	{
		(**self).subscribe(filter)
	}
}
