//! # Amerike Telemetry
//!
//! Campus sensor telemetry over MQTT: a publisher that never loses a
//! reading to a broker outage (undelivered readings go to a local spool
//! file) and a menu-driven subscriber.
//!
//! The protocol-agnostic core lives in `amerike_telemetry_core` and is
//! re-exported here. This crate adds the process concerns shared by the
//! `publisher` and `subscriber` binaries: environment configuration,
//! logging setup and Ctrl+C handling.
//!
//! ```rust,no_run
//! use amerike_telemetry::config::AppConfig;
//! use amerike_telemetry::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     amerike_telemetry::logging::setup("info");
//!     let config = AppConfig::from_env("subscribe")?;
//!     let (broker, connection) =
//!         MqttBroker::connect_with_config(config.broker_config()?).await?;
//!
//!     let summary = SubscriberSession::select_topic(&broker, "0")?
//!         .run(
//!             |topic: &Topic, payload: &[u8]| {
//!                 println!("{topic}: {}", String::from_utf8_lossy(payload));
//!             },
//!             async {
//!                 let _ = tokio::signal::ctrl_c().await;
//!             },
//!         )
//!         .await?;
//!     println!("received {}", summary.received);
//!
//!     connection.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod logging;
pub mod shutdown;

pub use amerike_telemetry_core::*;
pub use config::{AppConfig, ConfigError};
