use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use rumqttc::QoS;
use tokio::sync::Mutex;
use tracing::debug;

use super::config::ClientSettings;
use super::error::PublishFailure;
use super::{DeliveryOutcome, MessageBroker};
use crate::routing::{
	BrokerSubscription, InboundMessage, RouterActor, RouterController,
	RouterHandle, SubscriptionError,
};
use crate::topic::{Topic, TopicFilter};

/// In-process broker routing published messages straight to local
/// subscriptions.
///
/// Can be switched offline to make every publish fail, which simulates a
/// broker outage without any network. Clones share the same broker.
#[derive(Clone)]
pub struct MemoryBroker {
	inner: Arc<Inner>,
}

struct Inner {
	router: RouterHandle,
	controller: Mutex<Option<RouterController>>,
	online: AtomicBool,
	publish_calls: AtomicUsize,
	subscribe_calls: AtomicUsize,
}

impl MemoryBroker {
	/// Creates an online broker. Must be called within a tokio runtime.
	pub fn new() -> Self {
		let settings = ClientSettings::default();
		Self::with_capacity(
			settings.command_channel_capacity,
			settings.subscription_capacity,
		)
	}

	/// Creates a broker with explicit channel capacities (both must be > 0)
	pub fn with_capacity(
		command_channel_capacity: usize,
		subscription_capacity: usize,
	) -> Self {
		let (controller, router) = RouterActor::spawn(
			None,
			command_channel_capacity,
			subscription_capacity,
		);
		Self {
			inner: Arc::new(Inner {
				router,
				controller: Mutex::new(Some(controller)),
				online: AtomicBool::new(true),
				publish_calls: AtomicUsize::new(0),
				subscribe_calls: AtomicUsize::new(0),
			}),
		}
	}

	/// Switches the simulated connection up or down
	pub fn set_online(&self, online: bool) {
		debug!(online, "Memory broker availability changed");
		self.inner.online.store(online, Ordering::Release);
	}

	pub fn is_online(&self) -> bool {
		self.inner.online.load(Ordering::Acquire)
	}

	/// Number of publish attempts, successful or not
	pub fn publish_calls(&self) -> usize {
		self.inner.publish_calls.load(Ordering::Relaxed)
	}

	/// Number of subscribe requests
	pub fn subscribe_calls(&self) -> usize {
		self.inner.subscribe_calls.load(Ordering::Relaxed)
	}

	/// Number of subscriptions not yet released.
	///
	/// Zero once the router has stopped.
	pub async fn active_subscriptions(&self) -> usize {
		self.inner.router.route_count().await.unwrap_or(0)
	}

	/// Stops the router; every open subscription stream ends.
	pub async fn shutdown(&self) {
		let controller = self.inner.controller.lock().await.take();
		if let Some(controller) = controller {
			let _ = controller.shutdown().await;
		}
	}
}

impl MessageBroker for MemoryBroker {
	async fn publish(&self, topic: &Topic, payload: &[u8]) -> DeliveryOutcome {
		self.inner.publish_calls.fetch_add(1, Ordering::Relaxed);
		if !self.is_online() {
			return DeliveryOutcome::Failed(PublishFailure::NotConnected);
		}
		let message =
			InboundMessage::new(topic.clone(), Bytes::copy_from_slice(payload));
		match self.inner.router.dispatch(message).await {
			| Ok(()) => DeliveryOutcome::Delivered,
			| Err(_) => DeliveryOutcome::Failed(PublishFailure::BrokerClosed),
		}
	}

	async fn subscribe(
		&self,
		filter: &TopicFilter,
	) -> Result<BrokerSubscription, SubscriptionError> {
		self.inner.subscribe_calls.fetch_add(1, Ordering::Relaxed);
		self.inner
			.router
			.subscribe(filter.clone(), QoS::AtMostOnce)
			.await
	}
}
