use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use rumqttc::{AsyncClient, QoS};
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use super::error::{SendError, SubscriptionError};
use super::subscription::BrokerSubscription;
use super::{InboundMessage, SubscriptionId};
use crate::topic::TopicFilter;

const SLOW_SEND_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_PENDING_SLOW_SENDS: usize = 100;
const CLEANUP_TIMEOUT: Duration = Duration::from_millis(500);

pub(crate) enum Command {
	Subscribe {
		filter: TopicFilter,
		qos: QoS,
		respond_to: oneshot::Sender<Result<BrokerSubscription, SubscriptionError>>,
	},
	Dispatch(InboundMessage),
	ResubscribeAll,
	RouteCount(oneshot::Sender<usize>),
}

struct Route {
	filter: TopicFilter,
	qos: QoS,
	sender: Sender<InboundMessage>,
}

type SlowSendResult = (
	SubscriptionId,
	Result<(), SendTimeoutError<InboundMessage>>,
);

/// Actor owning the routing table from subscription ids to channels.
///
/// When backed by an MQTT client it also issues SUBSCRIBE/UNSUBSCRIBE for
/// the first/last route of each filter. Without a client it routes purely
/// in process.
pub(crate) struct RouterActor {
	routes: HashMap<SubscriptionId, Route>,
	next_id: usize,
	client: Option<AsyncClient>,
	subscription_capacity: usize,
	command_rx: Receiver<Command>,
	unsubscribe_rx: Receiver<SubscriptionId>,
	unsubscribe_tx: Sender<SubscriptionId>,
	shutdown_rx: oneshot::Receiver<()>,
	slow_sends: FuturesUnordered<JoinHandle<SlowSendResult>>,
}

impl RouterActor {
	pub(crate) fn spawn(
		client: Option<AsyncClient>,
		command_channel_capacity: usize,
		subscription_capacity: usize,
	) -> (RouterController, RouterHandle) {
		let (command_tx, command_rx) = mpsc::channel(command_channel_capacity);
		let (unsubscribe_tx, unsubscribe_rx) =
			mpsc::channel(command_channel_capacity);
		let (shutdown_tx, shutdown_rx) = oneshot::channel();
		let actor = Self {
			routes: HashMap::new(),
			next_id: 0,
			client,
			subscription_capacity,
			command_rx,
			unsubscribe_rx,
			unsubscribe_tx,
			shutdown_rx,
			slow_sends: FuturesUnordered::new(),
		};
		let join_handle = tokio::spawn(async move { actor.run().await });

		let controller = RouterController {
			shutdown_tx,
			join_handle,
		};
		(controller, RouterHandle { command_tx })
	}

	async fn run(mut self) {
		loop {
			// Queued unsubscribes are applied before any later command.
			tokio::select! {
				biased;
				_ = &mut self.shutdown_rx => {
					info!("Subscription router: shutdown signal received");
					break;
				}
				Some(slow_send) = self.slow_sends.next() => {
					self.handle_slow_send(slow_send).await;
				}
				Some(id) = self.unsubscribe_rx.recv() => {
					self.handle_unsubscribe(id).await;
				}
				command = self.command_rx.recv() => {
					let Some(command) = command else {
						info!("Subscription router: command channel closed");
						break;
					};
					match command {
						| Command::Subscribe { filter, qos, respond_to } => {
							self.handle_subscribe(filter, qos, respond_to).await
						}
						| Command::Dispatch(message) => {
							self.handle_dispatch(message).await
						}
						| Command::ResubscribeAll => self.resubscribe_all().await,
						| Command::RouteCount(respond_to) => {
							let _ = respond_to.send(self.routes.len());
						}
					}
				}
			}
		}
		self.cleanup().await;
		info!("Subscription router stopped");
	}

	fn allocate_id(&mut self) -> SubscriptionId {
		let id = SubscriptionId(self.next_id);
		self.next_id += 1;
		id
	}

	fn filter_in_use(&self, filter: &TopicFilter) -> bool {
		self.routes.values().any(|route| &route.filter == filter)
	}

	async fn handle_subscribe(
		&mut self,
		filter: TopicFilter,
		qos: QoS,
		respond_to: oneshot::Sender<Result<BrokerSubscription, SubscriptionError>>,
	) {
		if !self.filter_in_use(&filter) {
			if let Some(client) = &self.client {
				if let Err(err) = client.subscribe(filter.as_str(), qos).await {
					error!(
						filter = %filter,
						error = ?err,
						"Failed to subscribe to MQTT topic filter"
					);
					let _ = respond_to.send(Err(
						SubscriptionError::SubscribeFailed {
							filter: filter.to_string(),
						},
					));
					return;
				}
			}
		}

		let id = self.allocate_id();
		let (sender, receiver) = mpsc::channel(self.subscription_capacity);
		self.routes.insert(id, Route {
			filter: filter.clone(),
			qos,
			sender,
		});
		debug!(subscription_id = %id, filter = %filter, "Route added");

		let subscription = BrokerSubscription::new(
			receiver,
			self.unsubscribe_tx.clone(),
			filter,
			id,
		);
		// A lost response drops the subscription, whose Drop queues the
		// unsubscribe back to this actor.
		if respond_to.send(Ok(subscription)).is_err() {
			warn!(
				subscription_id = %id,
				"Subscriber went away before receiving its subscription"
			);
		}
	}

	async fn handle_unsubscribe(&mut self, id: SubscriptionId) {
		let Some(route) = self.routes.remove(&id) else {
			debug!(subscription_id = %id, "Unknown or already removed route");
			return;
		};
		debug!(subscription_id = %id, filter = %route.filter, "Route removed");

		if self.filter_in_use(&route.filter) {
			return;
		}
		if let Some(client) = &self.client {
			if let Err(err) = client.unsubscribe(route.filter.as_str()).await {
				error!(
					filter = %route.filter,
					error = ?err,
					"Failed to unsubscribe from MQTT topic filter"
				);
			}
		}
	}

	async fn handle_dispatch(&mut self, message: InboundMessage) {
		let mut closed = Vec::new();
		for (id, route) in &self.routes {
			if !route.filter.matches(&message.topic) {
				continue;
			}
			match route.sender.try_send(message.clone()) {
				| Ok(()) => {}
				| Err(TrySendError::Closed(_)) => closed.push(*id),
				| Err(TrySendError::Full(message)) => {
					if self.slow_sends.len() >= MAX_PENDING_SLOW_SENDS {
						error!(
							subscription_id = %id,
							topic = %message.topic,
							queue_size = self.slow_sends.len(),
							"Too many slow sends pending, message dropped"
						);
						continue;
					}
					let sender = route.sender.clone();
					let id = *id;
					self.slow_sends.push(tokio::spawn(async move {
						let result =
							sender.send_timeout(message, SLOW_SEND_TIMEOUT).await;
						(id, result)
					}));
				}
			}
		}
		for id in closed {
			self.handle_unsubscribe(id).await;
		}
	}

	async fn handle_slow_send(
		&mut self,
		slow_send: Result<SlowSendResult, JoinError>,
	) {
		match slow_send {
			| Ok((_, Ok(()))) => {}
			| Ok((id, Err(SendTimeoutError::Closed(message)))) => {
				warn!(
					subscription_id = %id,
					topic = %message.topic,
					"Subscriber closed during slow send, removing route"
				);
				self.handle_unsubscribe(id).await;
			}
			| Ok((id, Err(SendTimeoutError::Timeout(message)))) => {
				error!(
					subscription_id = %id,
					topic = %message.topic,
					"Slow send timed out, message dropped"
				);
			}
			| Err(err) => {
				error!(error = ?err, "Slow send task failed");
			}
		}
	}

	async fn resubscribe_all(&mut self) {
		let Some(client) = &self.client else {
			return;
		};
		let mut filters: Vec<(&TopicFilter, QoS)> = Vec::new();
		for route in self.routes.values() {
			if !filters.iter().any(|(filter, _)| *filter == &route.filter) {
				filters.push((&route.filter, route.qos));
			}
		}
		for (filter, qos) in filters {
			match client.subscribe(filter.as_str(), qos).await {
				| Ok(()) => debug!(filter = %filter, "Resubscribed"),
				| Err(err) => {
					error!(filter = %filter, error = ?err, "Failed to resubscribe");
				}
			}
		}
	}

	/// Unsubscribes every filter upstream, gives pending slow sends a short
	/// grace period, then drops all routes so subscriber streams end.
	async fn cleanup(&mut self) {
		if let Some(client) = &self.client {
			let mut released: Vec<&TopicFilter> = Vec::new();
			for route in self.routes.values() {
				if released.contains(&&route.filter) {
					continue;
				}
				released.push(&route.filter);
				if let Err(err) = client.unsubscribe(route.filter.as_str()).await
				{
					error!(
						filter = %route.filter,
						error = ?err,
						"Failed to unsubscribe during shutdown"
					);
				}
			}
		}

		let drain = async {
			while let Some(slow_send) = self.slow_sends.next().await {
				self.handle_slow_send(slow_send).await;
			}
		};
		if tokio::time::timeout(CLEANUP_TIMEOUT, drain).await.is_err() {
			warn!(
				timeout_ms = CLEANUP_TIMEOUT.as_millis() as u64,
				"Subscription router: pending slow sends abandoned"
			);
		}

		self.routes.clear();
	}
}

/// Stops the router actor.
pub(crate) struct RouterController {
	shutdown_tx: oneshot::Sender<()>,
	join_handle: JoinHandle<()>,
}

impl RouterController {
	pub(crate) async fn shutdown(self) -> Result<(), JoinError> {
		if self.shutdown_tx.send(()).is_err() {
			warn!("Subscription router already stopped");
		}
		self.join_handle.await.inspect_err(|err| {
			warn!(error = ?err, "Subscription router task failed");
		})
	}
}

/// Cloneable handle used to talk to the router actor.
#[derive(Clone, Debug)]
pub(crate) struct RouterHandle {
	command_tx: Sender<Command>,
}

impl RouterHandle {
	pub(crate) async fn subscribe(
		&self,
		filter: TopicFilter,
		qos: QoS,
	) -> Result<BrokerSubscription, SubscriptionError> {
		let (respond_to, response) = oneshot::channel();
		self.command_tx
			.send(Command::Subscribe {
				filter,
				qos,
				respond_to,
			})
			.await
			.map_err(|_| SubscriptionError::ChannelClosed)?;
		response.await.map_err(|_| SubscriptionError::ResponseLost)?
	}

	pub(crate) async fn dispatch(
		&self,
		message: InboundMessage,
	) -> Result<(), SendError> {
		self.command_tx
			.send(Command::Dispatch(message))
			.await
			.map_err(|_| SendError::ChannelClosed)
	}

	/// Number of live routes, after every release queued so far
	pub(crate) async fn route_count(&self) -> Result<usize, SendError> {
		let (respond_to, response) = oneshot::channel();
		self.command_tx
			.send(Command::RouteCount(respond_to))
			.await
			.map_err(|_| SendError::ChannelClosed)?;
		response.await.map_err(|_| SendError::ChannelClosed)
	}

	pub(crate) async fn resubscribe_all(&self) -> Result<(), SendError> {
		self.command_tx
			.send(Command::ResubscribeAll)
			.await
			.map_err(|_| SendError::ChannelClosed)
	}
}
