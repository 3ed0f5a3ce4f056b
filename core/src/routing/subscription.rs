use tokio::sync::mpsc::error::{SendError, TrySendError};
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, warn};

use super::{InboundMessage, SubscriptionId};
use crate::topic::TopicFilter;

/// Channel endpoint of an active subscription.
///
/// Messages matching the filter arrive through [`recv`](Self::recv). The
/// subscription is released by [`unsubscribe`](Self::unsubscribe) or, as a
/// fallback, when the value is dropped.
#[derive(Debug)]
pub struct BrokerSubscription {
	receiver: Receiver<InboundMessage>,
	unsubscribe_tx: Option<Sender<SubscriptionId>>,
	filter: TopicFilter,
	id: SubscriptionId,
}

impl BrokerSubscription {
	pub(crate) fn new(
		receiver: Receiver<InboundMessage>,
		unsubscribe_tx: Sender<SubscriptionId>,
		filter: TopicFilter,
		id: SubscriptionId,
	) -> Self {
		Self {
			receiver,
			unsubscribe_tx: Some(unsubscribe_tx),
			filter,
			id,
		}
	}

	/// Receives the next message.
	///
	/// Returns `None` once the broker side has shut down.
	pub async fn recv(&mut self) -> Option<InboundMessage> {
		self.receiver.recv().await
	}

	pub fn filter(&self) -> &TopicFilter {
		&self.filter
	}

	pub fn id(&self) -> SubscriptionId {
		self.id
	}

	/// Releases the subscription.
	pub async fn unsubscribe(mut self) -> Result<(), SendError<SubscriptionId>> {
		if let Some(unsubscribe_tx) = self.unsubscribe_tx.take() {
			unsubscribe_tx.send(self.id).await
		} else {
			warn!(subscription_id = %self.id, "Subscription already canceled");
			Ok(())
		}
	}
}

impl Drop for BrokerSubscription {
	fn drop(&mut self) {
		if let Some(unsubscribe_tx) = self.unsubscribe_tx.take() {
			match unsubscribe_tx.try_send(self.id) {
				| Ok(()) => {
					debug!(
						subscription_id = %self.id,
						"Subscription unsubscribed in Drop"
					);
				}
				// Router already gone, nothing left to release.
				| Err(TrySendError::Closed(_)) => {}
				| Err(err) => {
					warn!(
						subscription_id = %self.id,
						error = ?err,
						"Failed to unsubscribe in Drop"
					);
				}
			}
		}
	}
}
