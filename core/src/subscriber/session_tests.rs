//! Tests for subscriber sessions over the in-process broker

use tokio::sync::oneshot;

use super::{SessionError, StopReason, SubscriberSession, selection_for};
use crate::broker::{MemoryBroker, MessageBroker};
use crate::routing::SubscriptionError;
use crate::topic::{Topic, TopicClassifier, TopicFilter};

fn topic(value: &str) -> Topic {
	Topic::new(value).unwrap()
}

/// A counter to call per message and a shutdown future that resolves once
/// it has been called `count` times
fn stop_after(count: usize) -> (impl FnMut() + Send, impl Future<Output = ()>) {
	let (tx, rx) = oneshot::channel::<()>();
	let mut tx = Some(tx);
	let mut seen = 0;
	let counter = move || {
		seen += 1;
		if seen >= count {
			if let Some(tx) = tx.take() {
				let _ = tx.send(());
			}
		}
	};
	(counter, async move {
		let _ = rx.await;
	})
}

#[tokio::test]
async fn test_unknown_key_never_reaches_the_broker() {
	let broker = MemoryBroker::new();

	let result = SubscriberSession::select_topic(&broker, "99");

	match result {
		| Err(SessionError::InvalidSelection(key)) => assert_eq!(key, "99"),
		| Err(other) => panic!("unexpected error {other}"),
		| Ok(_) => panic!("key 99 must be rejected"),
	}
	assert_eq!(broker.subscribe_calls(), 0);
	broker.shutdown().await;
}

#[test]
fn test_selection_for_trims_and_rejects_keys() {
	let selection = selection_for(" 1\n").unwrap();
	assert_eq!(selection.filter().as_str(), "amerikeCDMX/PB/temp");

	assert_eq!(
		selection_for(" 31 ").unwrap_err(),
		SessionError::InvalidSelection("31".to_string())
	);
	assert!(matches!(
		selection_for(""),
		Err(SessionError::InvalidSelection(key)) if key.is_empty()
	));
}

#[tokio::test]
async fn test_wildcard_selection_receives_every_sensor_topic() {
	let broker = MemoryBroker::new();
	let session = SubscriberSession::select_topic(&broker, "0").unwrap();
	assert_eq!(session.label(), "All sensors");
	let active = session.subscribe().await.unwrap();
	assert_eq!(active.filter(), &TopicFilter::all());

	let classifier = TopicClassifier::default();
	for (index, sensor_topic) in classifier.topics().iter().enumerate() {
		let payload = format!("reading {index}");
		let outcome = broker.publish(sensor_topic, payload.as_bytes()).await;
		assert!(outcome.is_delivered());
	}

	let mut received = Vec::new();
	let (mut seen, shutdown) = stop_after(4);
	let summary = active
		.run(
			|topic: &Topic, payload: &[u8]| {
				received.push((
					topic.to_string(),
					String::from_utf8_lossy(payload).to_string(),
				));
				seen();
			},
			shutdown,
		)
		.await;

	assert_eq!(summary.received, 4);
	assert_eq!(summary.stop_reason, StopReason::Cancelled);
	assert_eq!(received, [
		("amerike/sensor/temp".to_string(), "reading 0".to_string()),
		("amerike/sensor/hum".to_string(), "reading 1".to_string()),
		("amerike/sensor/rfid".to_string(), "reading 2".to_string()),
		("amerike/sensor/otros".to_string(), "reading 3".to_string()),
	]);
	broker.shutdown().await;
}

#[tokio::test]
async fn test_menu_selection_filters_other_feeds() {
	let broker = MemoryBroker::new();
	let session = SubscriberSession::select_topic(&broker, "1").unwrap();
	assert_eq!(session.filter().as_str(), "amerikeCDMX/PB/temp");
	let active = session.subscribe().await.unwrap();

	broker.publish(&topic("amerikeCDMX/PB/hum"), b"HUM:60").await;
	broker.publish(&topic("amerikeGDJ/PB/temp"), b"TEMP:19").await;
	broker.publish(&topic("amerikeCDMX/PB/temp"), b"TEMP:24.5").await;

	let mut payloads = Vec::new();
	let (mut seen, shutdown) = stop_after(1);
	let summary = active
		.run(
			|_: &Topic, payload: &[u8]| {
				payloads.push(payload.to_vec());
				seen();
			},
			shutdown,
		)
		.await;

	assert_eq!(summary.received, 1);
	assert_eq!(payloads, [b"TEMP:24.5".to_vec()]);
	broker.shutdown().await;
}

#[tokio::test]
async fn test_broker_shutdown_ends_the_session() {
	let broker = MemoryBroker::new();
	let active = SubscriberSession::select_topic(&broker, "0")
		.unwrap()
		.subscribe()
		.await
		.unwrap();

	broker.shutdown().await;
	let summary = active
		.run(|_: &Topic, _: &[u8]| {}, std::future::pending())
		.await;

	assert_eq!(summary.received, 0);
	assert_eq!(summary.stop_reason, StopReason::StreamClosed);
}

#[tokio::test]
async fn test_cancelled_run_still_subscribes_once() {
	let broker = MemoryBroker::new();
	let session = SubscriberSession::new(
		&broker,
		TopicFilter::new("amerike/sensor/+").unwrap(),
	);

	let summary = session
		.run(|_: &Topic, _: &[u8]| {}, std::future::ready(()))
		.await
		.unwrap();

	assert_eq!(summary.stop_reason, StopReason::Cancelled);
	assert_eq!(broker.subscribe_calls(), 1);
	broker.shutdown().await;
}

#[tokio::test]
async fn test_cancelled_session_releases_its_subscription() {
	let broker = MemoryBroker::new();
	let active = SubscriberSession::select_topic(&broker, "0")
		.unwrap()
		.subscribe()
		.await
		.unwrap();
	assert_eq!(broker.active_subscriptions().await, 1);

	let summary = active
		.run(|_: &Topic, _: &[u8]| {}, std::future::ready(()))
		.await;

	assert_eq!(summary.stop_reason, StopReason::Cancelled);
	assert_eq!(broker.active_subscriptions().await, 0);
	broker.shutdown().await;
}

#[tokio::test]
async fn test_dropped_session_releases_its_subscription() {
	let broker = MemoryBroker::new();
	let active = SubscriberSession::select_topic(&broker, "5")
		.unwrap()
		.subscribe()
		.await
		.unwrap();
	assert_eq!(broker.active_subscriptions().await, 1);

	drop(active);

	assert_eq!(broker.active_subscriptions().await, 0);
	broker.shutdown().await;
}

#[tokio::test]
async fn test_subscribing_to_a_stopped_broker_fails() {
	let broker = MemoryBroker::new();
	broker.shutdown().await;

	let result = SubscriberSession::select_topic(&broker, "3")
		.unwrap()
		.subscribe()
		.await;

	assert!(matches!(
		result,
		Err(SessionError::Subscribe(SubscriptionError::ChannelClosed))
	));
}
