use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::Event::{Incoming, Outgoing};
use rumqttc::Packet::{self, Disconnect, Publish};
use rumqttc::{AsyncClient, ConnAck, ConnectReturnCode, EventLoop, QoS};
use tokio::sync::oneshot;
use tokio::time;
use tracing::{debug, error, info, warn};

use super::config::{BrokerConfig, ClientSettings};
use super::error::{ConnectionError, PublishFailure};
use super::{DeliveryOutcome, MessageBroker};
use crate::connection::MqttConnection;
use crate::routing::{
	BrokerSubscription, InboundMessage, RouterActor, RouterHandle,
	SubscriptionError,
};
use crate::topic::{Topic, TopicFilter};

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Broker connection backed by a rumqttc client.
///
/// Cheap to clone. The network event loop runs in its own task and keeps
/// reconnecting after failures; while the connection is down `publish`
/// fails immediately with [`PublishFailure::NotConnected`].
#[derive(Clone, Debug)]
pub struct MqttBroker {
	client: AsyncClient,
	router: RouterHandle,
	connected: Arc<AtomicBool>,
	publish_qos: QoS,
	subscribe_qos: QoS,
}

impl MqttBroker {
	/// Connects using an MQTT URL and default settings.
	///
	/// Returns both broker and connection handle. Keep the connection alive
	/// for the session duration, call `connection.shutdown()` when done.
	pub async fn connect(
		url: &str,
	) -> Result<(Self, MqttConnection), ConnectionError> {
		let config = BrokerConfig::from_url(url)?;
		Self::connect_with_config(config).await
	}

	/// Connects and waits for a successful CONNACK.
	pub async fn connect_with_config(
		config: BrokerConfig,
	) -> Result<(Self, MqttConnection), ConnectionError> {
		config.settings.validate()?;
		let (client, event_loop) = AsyncClient::new(
			config.connection,
			config.settings.event_loop_capacity,
		);

		let timeout_millis = config.settings.connection_timeout_millis;
		let connected_event_loop = time::timeout(
			config.settings.connection_timeout(),
			establish_connection(event_loop),
		)
		.await
		.map_err(|_| ConnectionError::Timeout { timeout_millis })??;

		info!("Connected to MQTT broker");
		Ok(Self::launch(
			client,
			connected_event_loop,
			&config.settings,
			true,
		))
	}

	/// Starts the client without waiting for the broker.
	///
	/// The event loop connects in the background and keeps retrying; until
	/// it succeeds every publish is reported as failed. Only configuration
	/// problems are returned as errors.
	pub fn start(
		config: BrokerConfig,
	) -> Result<(Self, MqttConnection), ConnectionError> {
		config.settings.validate()?;
		let (client, event_loop) = AsyncClient::new(
			config.connection,
			config.settings.event_loop_capacity,
		);
		Ok(Self::launch(client, event_loop, &config.settings, false))
	}

	fn launch(
		client: AsyncClient,
		event_loop: EventLoop,
		settings: &ClientSettings,
		connected: bool,
	) -> (Self, MqttConnection) {
		let (router_controller, router) = RouterActor::spawn(
			Some(client.clone()),
			settings.command_channel_capacity,
			settings.subscription_capacity,
		);
		let connected = Arc::new(AtomicBool::new(connected));
		let (stop_tx, stop_rx) = oneshot::channel();

		let event_loop_handle = tokio::spawn(run_event_loop(
			event_loop,
			router.clone(),
			Arc::clone(&connected),
			stop_rx,
		));

		let broker = Self {
			client: client.clone(),
			router,
			connected,
			publish_qos: settings.publish_qos,
			subscribe_qos: settings.subscribe_qos,
		};
		let connection = MqttConnection::new(
			client,
			router_controller,
			event_loop_handle,
			stop_tx,
			settings.shutdown_timeout(),
		);
		(broker, connection)
	}

	/// Whether the last CONNACK succeeded and no error happened since
	pub fn is_connected(&self) -> bool {
		self.connected.load(Ordering::Acquire)
	}
}

impl MessageBroker for MqttBroker {
	async fn publish(&self, topic: &Topic, payload: &[u8]) -> DeliveryOutcome {
		if !self.is_connected() {
			return DeliveryOutcome::Failed(PublishFailure::NotConnected);
		}
		// try_publish keeps a full request queue from stalling the caller.
		match self.client.try_publish(
			topic.as_str(),
			self.publish_qos,
			false,
			payload.to_vec(),
		) {
			| Ok(()) => DeliveryOutcome::Delivered,
			| Err(err) => DeliveryOutcome::Failed(PublishFailure::Client(err)),
		}
	}

	async fn subscribe(
		&self,
		filter: &TopicFilter,
	) -> Result<BrokerSubscription, SubscriptionError> {
		self.router
			.subscribe(filter.clone(), self.subscribe_qos)
			.await
	}
}

async fn establish_connection(
	mut event_loop: EventLoop,
) -> Result<EventLoop, ConnectionError> {
	loop {
		match event_loop.poll().await {
			| Ok(Incoming(Packet::ConnAck(ConnAck { code, .. }))) => {
				if code == ConnectReturnCode::Success {
					debug!("MQTT connection established successfully");
					return Ok(event_loop);
				}
				debug!(code = ?code, "MQTT connection rejected by broker");
				return Err(ConnectionError::BrokerRejected { code });
			}
			| Ok(notification) => {
				debug!(notification = ?notification, "Bootstrap phase notification");
			}
			| Err(err) => {
				debug!(error = %err, "MQTT connection error during bootstrap phase");
				return Err(ConnectionError::Network(err));
			}
		}
	}
}

/// Drives the rumqttc event loop until DISCONNECT or an explicit stop.
///
/// Keeps the shared `connected` flag current and hands incoming PUBLISH
/// packets to the router.
async fn run_event_loop(
	mut event_loop: EventLoop,
	router: RouterHandle,
	connected: Arc<AtomicBool>,
	mut stop_rx: oneshot::Receiver<()>,
) {
	let mut error_count: u32 = 0;

	loop {
		let event = tokio::select! {
			_ = &mut stop_rx => {
				info!("MQTT event loop stop requested");
				break;
			}
			event = event_loop.poll() => event,
		};

		match event {
			| Ok(Incoming(Packet::ConnAck(ConnAck {
				session_present,
				code: ConnectReturnCode::Success,
			}))) => {
				error_count = 0;
				connected.store(true, Ordering::Release);
				if session_present {
					info!(
						"MQTT connected with session preserved, subscriptions \
						 maintained by broker"
					);
				} else {
					info!("MQTT connected without session, resubscribing");
					if let Err(err) = router.resubscribe_all().await {
						error!(error = %err, "Failed to resubscribe to topics");
					}
				}
			}
			| Ok(Incoming(Packet::ConnAck(ConnAck { code, .. }))) => {
				connected.store(false, Ordering::Release);
				warn!(code = ?code, "MQTT connection rejected by broker");
			}
			| Ok(Incoming(Publish(packet))) => {
				error_count = 0;
				debug!(
					topic = %packet.topic,
					payload_size = packet.payload.len(),
					"Received MQTT message"
				);
				match Topic::new(packet.topic) {
					| Ok(topic) => {
						let message = InboundMessage::new(topic, packet.payload);
						if let Err(err) = router.dispatch(message).await {
							error!(error = %err, "Failed to hand message to router");
						}
					}
					| Err(err) => {
						warn!(error = %err, "Dropping message with invalid topic");
					}
				}
			}
			| Ok(Incoming(Disconnect)) => {
				connected.store(false, Ordering::Release);
				// The next poll reconnects.
				warn!("Received MQTT Disconnect packet from server");
			}
			| Ok(Outgoing(rumqttc::Outgoing::Disconnect)) => {
				connected.store(false, Ordering::Release);
				info!("Sent MQTT Disconnect packet to server");
				break;
			}
			| Ok(notification) => {
				error_count = 0;
				debug!(notification = ?notification, "MQTT notification");
			}
			| Err(err) => {
				connected.store(false, Ordering::Release);
				error_count = error_count.saturating_add(1);
				error!(error_count, error = %err, "MQTT event loop error");

				let delay = INITIAL_RETRY_DELAY
					* 2_u32.pow((error_count - 1).min(10));
				let delay = delay.min(MAX_RETRY_DELAY);
				warn!(delay = ?delay, error_count, "Retrying MQTT connection");

				tokio::select! {
					_ = &mut stop_rx => {
						info!("MQTT event loop stop requested during backoff");
						break;
					}
					_ = time::sleep(delay) => {}
				}
			}
		}
	}

	connected.store(false, Ordering::Release);
	info!("MQTT event loop terminated");
}
