//! MQTT connection lifecycle management
//!
//! Kept separate from [`MqttBroker`](crate::broker::MqttBroker) so the
//! broker handle can be cloned freely while exactly one owner decides when
//! the connection ends.

use std::time::Duration;

use rumqttc::AsyncClient;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info, warn};

use crate::routing::RouterController;

/// MQTT connection handle for lifecycle management
///
/// It should be kept alive for the duration of the MQTT session and
/// consumed with [`shutdown`](Self::shutdown).
pub struct MqttConnection {
	client: AsyncClient,
	router_controller: Option<RouterController>,
	event_loop_handle: Option<JoinHandle<()>>,
	stop_tx: Option<oneshot::Sender<()>>,
	shutdown_timeout: Duration,
}

impl MqttConnection {
	pub(crate) fn new(
		client: AsyncClient,
		router_controller: RouterController,
		event_loop_handle: JoinHandle<()>,
		stop_tx: oneshot::Sender<()>,
		shutdown_timeout: Duration,
	) -> Self {
		Self {
			client,
			router_controller: Some(router_controller),
			event_loop_handle: Some(event_loop_handle),
			stop_tx: Some(stop_tx),
			shutdown_timeout,
		}
	}

	/// Gracefully shuts the connection down:
	/// 1. Stops the subscription router, which unsubscribes every filter
	///    and ends all subscriber streams
	/// 2. Queues an MQTT DISCONNECT, which ends the event loop once sent
	/// 3. Waits for the event loop, stopping it explicitly if the
	///    DISCONNECT cannot go out within the shutdown timeout (broker
	///    unreachable)
	pub async fn shutdown(mut self) {
		if let Some(controller) = self.router_controller.take() {
			if let Err(err) = controller.shutdown().await {
				warn!(error = %err, "Failed to shut down subscription router");
			}
		}

		if let Err(err) = self.client.try_disconnect() {
			warn!(error = %err, "Failed to queue MQTT disconnect");
		}

		if let Some(mut handle) = self.event_loop_handle.take() {
			match time::timeout(self.shutdown_timeout, &mut handle).await {
				| Ok(Ok(())) => {}
				| Ok(Err(err)) => warn!(error = %err, "Event loop task failed"),
				| Err(_) => {
					warn!(
						timeout_ms = self.shutdown_timeout.as_millis() as u64,
						"Disconnect not sent in time, stopping event loop"
					);
					if let Some(stop_tx) = self.stop_tx.take() {
						let _ = stop_tx.send(());
					}
					if let Err(err) = handle.await {
						warn!(error = %err, "Event loop task failed");
					}
				}
			}
		}
		self.stop_tx.take();
		info!("MQTT connection closed");
	}
}

impl Drop for MqttConnection {
	fn drop(&mut self) {
		if self.router_controller.is_some() || self.event_loop_handle.is_some()
		{
			error!(
				"MqttConnection dropped without calling shutdown(). Please \
				 call shutdown() and await its completion before dropping."
			);
		}
	}
}
