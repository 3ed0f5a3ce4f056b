use std::future::Future;
use std::pin::pin;

use tracing::{debug, info, warn};

use super::error::SessionError;
use super::menu::{self, TopicSelection};
use crate::broker::MessageBroker;
use crate::routing::BrokerSubscription;
use crate::topic::{Topic, TopicFilter};

/// Receives every message delivered to a session.
pub trait MessageHandler: Send {
	fn handle(&mut self, topic: &Topic, payload: &[u8]);
}

impl<F> MessageHandler for F
where F: FnMut(&Topic, &[u8]) + Send
{
	fn handle(&mut self, topic: &Topic, payload: &[u8]) {
		self(topic, payload)
	}
}

/// Why a session stopped receiving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
	/// The shutdown signal fired
	Cancelled,
	/// The broker ended the subscription stream
	StreamClosed,
}

/// Totals of a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
	pub received: u64,
	pub stop_reason: StopReason,
}

/// Resolves a menu key without needing a broker.
pub fn selection_for(key: &str) -> Result<TopicSelection, SessionError> {
	menu::lookup(key)
		.map(|entry| entry.selection)
		.ok_or_else(|| SessionError::InvalidSelection(key.trim().to_string()))
}

/// A subscriber bound to one filter, not yet subscribed.
pub struct SubscriberSession<B> {
	broker: B,
	filter: TopicFilter,
	label: String,
}

impl<B: MessageBroker> SubscriberSession<B> {
	/// Session for an explicit filter
	pub fn new(broker: B, filter: TopicFilter) -> Self {
		let label = filter.to_string();
		Self {
			broker,
			filter,
			label,
		}
	}

	pub fn from_selection(broker: B, selection: TopicSelection) -> Self {
		Self {
			broker,
			filter: selection.filter(),
			label: selection.label(),
		}
	}

	/// Session for a menu key. Unknown keys fail before the broker is
	/// contacted.
	pub fn select_topic(broker: B, key: &str) -> Result<Self, SessionError> {
		Ok(Self::from_selection(broker, selection_for(key)?))
	}

	pub fn filter(&self) -> &TopicFilter {
		&self.filter
	}

	/// Human readable name of what this session listens to
	pub fn label(&self) -> &str {
		&self.label
	}

	/// Establishes the subscription.
	pub async fn subscribe(self) -> Result<ActiveSession<B>, SessionError> {
		let subscription = self.broker.subscribe(&self.filter).await?;
		info!(filter = %self.filter, label = %self.label, "Subscribed");
		Ok(ActiveSession {
			broker: self.broker,
			subscription,
		})
	}

	/// Subscribes, then hands every message to `handler` until `shutdown`
	/// resolves or the stream ends.
	pub async fn run<H, F>(
		self,
		handler: H,
		shutdown: F,
	) -> Result<SessionSummary, SessionError>
	where
		H: MessageHandler,
		F: Future<Output = ()>,
	{
		let session = self.subscribe().await?;
		Ok(session.run(handler, shutdown).await)
	}
}

/// A session with a live subscription
pub struct ActiveSession<B> {
	broker: B,
	subscription: BrokerSubscription,
}

impl<B> ActiveSession<B> {
	pub fn filter(&self) -> &TopicFilter {
		self.subscription.filter()
	}

	pub fn broker(&self) -> &B {
		&self.broker
	}

	/// Receives until `shutdown` resolves or the broker closes the stream,
	/// then releases the subscription.
	///
	/// A handler call that has started always finishes before the
	/// shutdown signal is looked at again.
	pub async fn run<H, F>(self, mut handler: H, shutdown: F) -> SessionSummary
	where
		H: MessageHandler,
		F: Future<Output = ()>,
	{
		let Self {
			broker: _broker,
			mut subscription,
		} = self;
		let mut shutdown = pin!(shutdown);
		let mut received = 0;

		let stop_reason = loop {
			tokio::select! {
				biased;
				_ = &mut shutdown => break StopReason::Cancelled,
				message = subscription.recv() => {
					let Some(message) = message else {
						break StopReason::StreamClosed;
					};
					received += 1;
					debug!(
						topic = %message.topic,
						bytes = message.payload.len(),
						"Message received"
					);
					handler.handle(&message.topic, &message.payload);
				}
			}
		};

		let filter = subscription.filter().clone();
		if subscription.unsubscribe().await.is_err() {
			// Router already stopped, nothing left to release.
			debug!(filter = %filter, "Subscription already released");
		}
		match stop_reason {
			| StopReason::Cancelled => {
				info!(filter = %filter, received, "Session cancelled");
			}
			| StopReason::StreamClosed => {
				warn!(filter = %filter, received, "Broker closed the stream");
			}
		}
		SessionSummary {
			received,
			stop_reason,
		}
	}
}
