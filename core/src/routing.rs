//! Message routing and subscription management module
//!
//! A router actor owns the table of active subscriptions and fans inbound
//! messages out to every subscription whose filter matches.

use std::fmt::Display;

use bytes::Bytes;

use crate::topic::Topic;

/// Routing and subscription error types
pub mod error;
pub(crate) mod router;
/// Channel endpoint handed to subscribers
pub mod subscription;

pub use error::{SendError, SubscriptionError};
pub(crate) use router::{RouterActor, RouterController, RouterHandle};
pub use subscription::BrokerSubscription;

/// A subscription identifier.
///
/// Unique within one router for the lifetime of the process.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub struct SubscriptionId(pub(crate) usize);

impl Display for SubscriptionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "SubscriptionId({})", self.0)
	}
}

/// Message delivered by the broker to a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
	/// Concrete topic the message was published to
	pub topic: Topic,
	/// Raw payload bytes
	pub payload: Bytes,
}

impl InboundMessage {
	pub fn new(topic: Topic, payload: impl Into<Bytes>) -> Self {
		Self {
			topic,
			payload: payload.into(),
		}
	}

	/// Payload decoded as UTF-8, with invalid sequences replaced
	pub fn payload_lossy(&self) -> std::borrow::Cow<'_, str> {
		String::from_utf8_lossy(&self.payload)
	}
}
