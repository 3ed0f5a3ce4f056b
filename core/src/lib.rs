//! # Amerike Telemetry Core
//!
//! Reliable publish path for campus sensor telemetry over MQTT.
//!
//! ## Features
//!
//! - **Topic classification**: readings map to `<namespace>/sensor/<kind>`
//! - **Offline spool**: readings that could not be delivered are appended
//!   to a local `offline_<timestamp>.txt` file, one file per outage
//! - **Delivery loop**: sample, classify, publish, fall back to the spool
//! - **Subscriber sessions**: menu-driven subscriptions with a handler per
//!   message
//! - **Pluggable broker**: rumqttc-backed [`MqttBroker`] or the in-process
//!   [`MemoryBroker`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use amerike_telemetry_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BrokerConfig::from_url(
//!         "mqtt://localhost:1883?client_id=publish_1",
//!     )?;
//!     let (broker, connection) = MqttBroker::start(config)?;
//!
//!     let mut publisher = DeliveryLoop::new(
//!         broker,
//!         SimulatedSource::new(),
//!         TopicClassifier::default(),
//!         SpoolStore::new("logs"),
//!     );
//!     let summary = publisher
//!         .run(RunLimit::Ticks(10), async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!     println!("{summary:?}");
//!
//!     connection.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod broker;
pub mod connection;
pub mod error;
pub mod publisher;
pub mod reading;
pub mod routing;
pub mod sampling;
pub mod spool;
pub mod subscriber;
pub mod topic;

#[cfg(test)]
mod publisher_tests;

pub use broker::{
	BrokerConfig, ClientSettings, ConnectionError, DeliveryOutcome,
	MemoryBroker, MessageBroker, MqttBroker, PublishFailure,
};
pub use connection::MqttConnection;
pub use error::{Result, TelemetryError};
pub use publisher::{
	DeliveryLoop, PublisherSettings, RunLimit, RunSummary, SpoolAction,
	TickReport,
};
pub use reading::{Reading, ReadingKind};
pub use routing::{BrokerSubscription, InboundMessage, SubscriptionError};
pub use rumqttc::{MqttOptions, QoS};
pub use sampling::{SamplingSource, ScriptedSource, SimulatedSource};
pub use spool::{Clock, SpoolError, SpoolStore, SystemClock};
pub use subscriber::{
	MessageHandler, SessionError, SessionSummary, StopReason,
	SubscriberSession, TopicSelection,
};
pub use topic::{Topic, TopicClassifier, TopicError, TopicFilter};

/// Prelude module for convenient imports
///
/// ```rust
/// use amerike_telemetry_core::prelude::*;
/// ```
pub mod prelude {
	pub use crate::{
		BrokerConfig, ClientSettings, DeliveryLoop, MemoryBroker,
		MessageBroker, MessageHandler, MqttBroker, MqttConnection, QoS,
		Reading, RunLimit, RunSummary, SamplingSource, SimulatedSource,
		SpoolStore, SubscriberSession, TelemetryError, Topic,
		TopicClassifier, TopicFilter,
	};
}
