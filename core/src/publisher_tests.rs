//! Tests for the delivery attempt loop

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use crate::broker::{
	DeliveryOutcome, MemoryBroker, MessageBroker, PublishFailure,
};
use crate::publisher::{
	DeliveryLoop, PublisherSettings, RunLimit, RunSummary, SpoolAction,
};
use crate::sampling::ScriptedSource;
use crate::spool::{SpoolLine, SpoolStore};
use crate::topic::{TopicClassifier, TopicFilter};

fn delivery_loop(
	broker: &MemoryBroker,
	dir: &Path,
	lines: &[&str],
) -> DeliveryLoop<MemoryBroker, ScriptedSource> {
	DeliveryLoop::new(
		broker.clone(),
		ScriptedSource::new(lines.iter().copied()),
		TopicClassifier::default(),
		SpoolStore::new(dir),
	)
	.with_settings(PublisherSettings {
		interval: Duration::from_millis(10),
	})
}

fn spool_files(dir: &Path) -> Vec<PathBuf> {
	let Ok(entries) = std::fs::read_dir(dir) else {
		return Vec::new();
	};
	let mut files: Vec<_> =
		entries.map(|entry| entry.unwrap().path()).collect();
	files.sort();
	files
}

fn spooled(path: &Path) -> Vec<(String, String)> {
	std::fs::read_to_string(path)
		.unwrap()
		.lines()
		.map(|line| {
			let (payload, topic) = SpoolLine::parse(line).unwrap().into_parts();
			(payload, topic.to_string())
		})
		.collect()
}

#[tokio::test(start_paused = true)]
async fn test_healthy_broker_never_touches_the_spool() {
	let broker = MemoryBroker::new();
	let mut subscription =
		broker.subscribe(&TopicFilter::all()).await.unwrap();
	let dir = TempDir::new().unwrap();
	let spool_dir = dir.path().join("logs");
	let mut publisher =
		delivery_loop(&broker, &spool_dir, &["TEMP:24.5", "HUM:60"]);

	let summary = publisher
		.run(RunLimit::Ticks(3), std::future::pending())
		.await;

	assert_eq!(summary, RunSummary {
		ticks: 3,
		delivered: 3,
		..RunSummary::default()
	});
	assert!(!spool_dir.exists());

	let first = subscription.recv().await.unwrap();
	assert_eq!(first.topic.as_str(), "amerike/sensor/temp");
	assert_eq!(first.payload_lossy(), "TEMP:24.5");
	let second = subscription.recv().await.unwrap();
	assert_eq!(second.topic.as_str(), "amerike/sensor/hum");
	broker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_outage_streak_lands_in_one_file_in_order() {
	let broker = MemoryBroker::new();
	broker.set_online(false);
	let dir = TempDir::new().unwrap();
	let mut publisher = delivery_loop(&broker, dir.path(), &[
		"TEMP:24.5",
		"RFID:12345",
		"HUM:60",
	]);

	let summary = publisher
		.run(RunLimit::Ticks(3), std::future::pending())
		.await;

	assert_eq!(summary.failed, 3);
	assert_eq!(summary.spool_files, 1);
	assert!(!publisher.spool().is_open());

	let files = spool_files(dir.path());
	assert_eq!(files.len(), 1);
	let name = files[0].file_name().unwrap().to_string_lossy().to_string();
	assert!(name.starts_with("offline_") && name.ends_with(".txt"), "{name}");
	assert_eq!(spooled(&files[0]), [
		("TEMP:24.5".to_string(), "amerike/sensor/temp".to_string()),
		("RFID:12345".to_string(), "amerike/sensor/rfid".to_string()),
		("HUM:60".to_string(), "amerike/sensor/hum".to_string()),
	]);
	broker.shutdown().await;
}

#[tokio::test]
async fn test_recovery_closes_the_file_and_a_new_outage_opens_another() {
	let broker = MemoryBroker::new();
	let dir = TempDir::new().unwrap();
	let mut publisher = delivery_loop(&broker, dir.path(), &[
		"TEMP:1", "TEMP:2", "TEMP:3", "TEMP:4",
	]);

	broker.set_online(false);
	let first = publisher.tick().await;
	let SpoolAction::Appended(first_path) = first.spool_action else {
		panic!("expected an append, got {:?}", first.spool_action);
	};
	let second = publisher.tick().await;
	assert!(matches!(
		second.spool_action,
		SpoolAction::Appended(ref path) if *path == first_path
	));

	broker.set_online(true);
	let third = publisher.tick().await;
	assert!(third.outcome.is_delivered());
	let SpoolAction::Closed(closed) = third.spool_action else {
		panic!("expected the spool to close, got {:?}", third.spool_action);
	};
	assert_eq!(closed.path, first_path);
	assert_eq!(closed.lines, 2);

	broker.set_online(false);
	let fourth = publisher.tick().await;
	let SpoolAction::Appended(second_path) = fourth.spool_action else {
		panic!("expected an append, got {:?}", fourth.spool_action);
	};
	assert_ne!(second_path, first_path);
	assert_eq!(fourth.tick, 4);

	publisher.close().await.unwrap();
	assert_eq!(spool_files(dir.path()).len(), 2);
	assert_eq!(spooled(&first_path).len(), 2);
	assert_eq!(spooled(&second_path), [(
		"TEMP:4".to_string(),
		"amerike/sensor/temp".to_string()
	)]);
	broker.shutdown().await;
}

#[tokio::test]
async fn test_failed_tick_reports_the_reason() {
	let broker = MemoryBroker::new();
	broker.set_online(false);
	let dir = TempDir::new().unwrap();
	let mut publisher = delivery_loop(&broker, dir.path(), &["bogus"]);

	let report = publisher.tick().await;

	assert_eq!(report.topic.as_str(), "amerike/sensor/otros");
	assert!(matches!(
		report.outcome,
		DeliveryOutcome::Failed(PublishFailure::NotConnected)
	));
	publisher.close().await.unwrap();
	broker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_spool_errors_do_not_stop_the_loop() {
	let broker = MemoryBroker::new();
	broker.set_online(false);
	let dir = TempDir::new().unwrap();
	let blocker = dir.path().join("not-a-dir");
	std::fs::write(&blocker, b"occupied").unwrap();
	let mut publisher = delivery_loop(&broker, &blocker, &["HUM:60"]);

	let summary = publisher
		.run(RunLimit::Ticks(4), std::future::pending())
		.await;

	assert_eq!(summary.ticks, 4);
	assert_eq!(summary.failed, 4);
	assert_eq!(summary.spool_errors, 4);
	assert_eq!(summary.spool_files, 0);
	assert_eq!(broker.publish_calls(), 4);
	broker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_between_ticks_and_closes_the_spool() {
	let broker = MemoryBroker::new();
	broker.set_online(false);
	let dir = TempDir::new().unwrap();
	let mut publisher = delivery_loop(&broker, dir.path(), &["TEMP:24.5"])
		.with_settings(PublisherSettings {
			interval: Duration::from_secs(3600),
		});

	let summary = publisher
		.run(RunLimit::Unbounded, std::future::ready(()))
		.await;

	assert_eq!(summary.ticks, 1);
	assert!(summary.cancelled);
	assert!(!publisher.spool().is_open());
	let files = spool_files(dir.path());
	assert_eq!(files.len(), 1);
	assert_eq!(spooled(&files[0]).len(), 1);
	broker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_zero_ticks_does_nothing() {
	let broker = MemoryBroker::new();
	let dir = TempDir::new().unwrap();
	let mut publisher = delivery_loop(&broker, dir.path(), &["TEMP:1"]);

	let summary = publisher
		.run(RunLimit::Ticks(0), std::future::pending())
		.await;

	assert_eq!(summary, RunSummary::default());
	assert_eq!(broker.publish_calls(), 0);
	broker.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_of_one_channel_see_only_that_channel() {
	let broker = MemoryBroker::new();
	let filter = TopicFilter::new("amerike/sensor/rfid").unwrap();
	let mut rfid = broker.subscribe(&filter).await.unwrap();
	let dir = TempDir::new().unwrap();
	let mut publisher =
		delivery_loop(&broker, dir.path(), &["TEMP:1", "RFID:42", "HUM:2"]);

	publisher.run(RunLimit::Ticks(3), std::future::pending()).await;

	let message = rfid.recv().await.unwrap();
	assert_eq!(message.payload_lossy(), "RFID:42");
	broker.shutdown().await;
	assert!(rfid.recv().await.is_none());
}
