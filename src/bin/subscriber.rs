//! Lets an operator pick a sensor feed and prints every message on it.
//!
//! ```bash
//! cargo run --bin subscriber -- 3
//! ```

use std::io::Write as _;

use amerike_telemetry::config::AppConfig;
use amerike_telemetry::{logging, shutdown};
use amerike_telemetry::prelude::*;
use amerike_telemetry::subscriber::{self, StopReason, menu};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	logging::setup("warn");
	let config = AppConfig::from_env("subscribe")?;

	println!("Select the topic to subscribe to:\n");
	print!("{}", menu::render());
	let key = match std::env::args().nth(1) {
		| Some(key) => key,
		| None => read_key().await?,
	};
	let selection = subscriber::selection_for(&key).inspect_err(|err| {
		eprintln!("{err}");
	})?;
	println!("\nSubscribing to: {} - {}", selection.filter(), selection);

	let (broker, connection) =
		MqttBroker::connect_with_config(config.broker_config()?).await?;
	println!("Connected to the MQTT broker");

	let stop = shutdown::ctrl_c().await;
	let session = SubscriberSession::from_selection(&broker, selection);
	let summary = session
		.run(
			|topic: &Topic, payload: &[u8]| {
				println!(
					"Received '{}' from '{topic}'",
					String::from_utf8_lossy(payload)
				);
			},
			stop,
		)
		.await;
	connection.shutdown().await;

	let summary = summary?;
	if summary.stop_reason == StopReason::StreamClosed {
		eprintln!("Broker closed the subscription");
	}
	println!("{} messages received", summary.received);
	Ok(())
}

async fn read_key() -> std::io::Result<String> {
	print!("\nEnter the option number: ");
	std::io::stdout().flush()?;

	let mut line = String::new();
	BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
	Ok(line)
}
