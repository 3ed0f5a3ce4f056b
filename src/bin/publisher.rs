//! Samples the bench sensors and publishes every reading, spooling to disk
//! whatever the broker does not accept.
//!
//! ```bash
//! MQTT_BROKER=mqtt://172.16.48.92:1883 TELEMETRY_TICKS=0 cargo run --bin publisher
//! ```

use amerike_telemetry::config::AppConfig;
use amerike_telemetry::{logging, shutdown};
use amerike_telemetry::prelude::*;
use amerike_telemetry::publisher::PublisherSettings;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	logging::setup(logging::DEFAULT_LEVEL);
	let config = AppConfig::from_env("publish")?;
	let classifier = config.classifier()?;

	let summary = if config.loopback {
		info!("Loopback mode, readings stay in process");
		let broker = MemoryBroker::new();
		let summary = publish(broker.clone(), classifier, &config).await;
		broker.shutdown().await;
		summary
	} else {
		let (broker, connection) = MqttBroker::start(config.broker_config()?)?;
		info!(broker = %config.broker_url, "Publishing");
		let summary = publish(broker, classifier, &config).await;
		connection.shutdown().await;
		summary
	};

	info!(
		ticks = summary.ticks,
		delivered = summary.delivered,
		failed = summary.failed,
		spool_errors = summary.spool_errors,
		spool_files = summary.spool_files,
		spool_dir = %config.spool_dir.display(),
		"Publisher stopped"
	);
	Ok(())
}

async fn publish<B: MessageBroker>(
	broker: B,
	classifier: TopicClassifier,
	config: &AppConfig,
) -> RunSummary {
	let mut publisher = DeliveryLoop::new(
		broker,
		SimulatedSource::new(),
		classifier,
		SpoolStore::new(&config.spool_dir),
	)
	.with_settings(PublisherSettings {
		interval: config.interval,
	});
	// Listening starts before the first tick so its spool still gets closed.
	let stop = shutdown::ctrl_c().await;
	publisher.run(config.limit, stop).await
}
