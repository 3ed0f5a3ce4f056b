//! Delivery attempt loop
//!
//! Each tick samples a reading, classifies it, tries to publish it and
//! routes the outcome to the spool store: failures are appended to the
//! spool, the first success after a failing streak closes it. Failures
//! never escape a tick; they are logged and reflected in the
//! [`TickReport`].

use std::future::Future;
use std::path::PathBuf;
use std::pin::pin;
use std::time::Duration;

use tokio::time;
use tracing::{debug, error, info, warn};

use crate::broker::{DeliveryOutcome, MessageBroker};
use crate::reading::Reading;
use crate::sampling::SamplingSource;
use crate::spool::{
	Clock, ClosedSpool, SpoolEntry, SpoolError, SpoolStore, SystemClock,
};
use crate::topic::{Topic, TopicClassifier};

/// Number of ticks per run when nothing else is configured
pub const DEFAULT_TICKS: u64 = 10;
/// Pause between ticks when nothing else is configured
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// How many ticks a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLimit {
	/// Stop after this many ticks
	Ticks(u64),
	/// Run until the shutdown signal fires
	Unbounded,
}

impl RunLimit {
	fn reached(self, ticks: u64) -> bool {
		match self {
			| RunLimit::Ticks(limit) => ticks >= limit,
			| RunLimit::Unbounded => false,
		}
	}
}

impl Default for RunLimit {
	fn default() -> Self {
		RunLimit::Ticks(DEFAULT_TICKS)
	}
}

/// Publish loop settings
#[derive(Debug, Clone)]
pub struct PublisherSettings {
	/// Pause between the end of one tick and the start of the next
	pub interval: Duration,
}

impl Default for PublisherSettings {
	fn default() -> Self {
		Self {
			interval: DEFAULT_INTERVAL,
		}
	}
}

/// What a tick did with the spool
#[derive(Debug)]
pub enum SpoolAction {
	/// Delivered with no spool open
	Untouched,
	/// Failed delivery appended to this file
	Appended(PathBuf),
	/// Delivery succeeded and ended a failing streak
	Closed(ClosedSpool),
	/// Spool I/O failed; the reading is not in any fallback file
	Failed(SpoolError),
}

/// Result of one tick
#[derive(Debug)]
pub struct TickReport {
	/// 1-based tick number within the loop's lifetime
	pub tick: u64,
	pub reading: Reading,
	pub topic: Topic,
	pub outcome: DeliveryOutcome,
	pub spool_action: SpoolAction,
}

/// Totals of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
	pub ticks: u64,
	pub delivered: u64,
	pub failed: u64,
	pub spool_errors: u64,
	/// Spool files created during the run
	pub spool_files: usize,
	/// True when the run ended because the shutdown signal fired
	pub cancelled: bool,
}

impl RunSummary {
	fn record(&mut self, report: &TickReport) {
		self.ticks += 1;
		if report.outcome.is_delivered() {
			self.delivered += 1;
		} else {
			self.failed += 1;
		}
		if matches!(report.spool_action, SpoolAction::Failed(_)) {
			self.spool_errors += 1;
		}
	}
}

/// Per-tick publish-and-fallback state machine.
///
/// Owns its spool store exclusively; run one loop per publisher.
pub struct DeliveryLoop<B, S, C = SystemClock> {
	broker: B,
	source: S,
	classifier: TopicClassifier,
	spool: SpoolStore<C>,
	settings: PublisherSettings,
	ticks: u64,
}

impl<B, S, C> DeliveryLoop<B, S, C>
where
	B: MessageBroker,
	S: SamplingSource,
	C: Clock,
{
	pub fn new(
		broker: B,
		source: S,
		classifier: TopicClassifier,
		spool: SpoolStore<C>,
	) -> Self {
		Self {
			broker,
			source,
			classifier,
			spool,
			settings: PublisherSettings::default(),
			ticks: 0,
		}
	}

	pub fn with_settings(mut self, settings: PublisherSettings) -> Self {
		self.settings = settings;
		self
	}

	pub fn spool(&self) -> &SpoolStore<C> {
		&self.spool
	}

	pub fn classifier(&self) -> &TopicClassifier {
		&self.classifier
	}

	/// Ticks performed so far
	pub fn ticks(&self) -> u64 {
		self.ticks
	}

	/// Performs one sample → classify → publish → spool step.
	pub async fn tick(&mut self) -> TickReport {
		self.ticks += 1;
		let reading = self.source.next_reading();
		let topic = self.classifier.classify(&reading);
		debug!(
			tick = self.ticks,
			reading = %reading,
			topic = %topic,
			"Sampled"
		);

		let outcome = self
			.broker
			.publish(&topic, reading.payload().as_bytes())
			.await;

		let spool_action = match &outcome {
			| DeliveryOutcome::Delivered => {
				info!(payload = %reading, topic = %topic, "Published");
				match self.spool.record_success().await {
					| Ok(Some(closed)) => SpoolAction::Closed(closed),
					| Ok(None) => SpoolAction::Untouched,
					| Err(err) => {
						error!(error = %err, "Failed to close spool file");
						SpoolAction::Failed(err)
					}
				}
			}
			| DeliveryOutcome::Failed(failure) => {
				warn!(
					payload = %reading,
					topic = %topic,
					reason = %failure,
					"Publish failed, spooling locally"
				);
				let timestamp = self.spool.now();
				let entry =
					SpoolEntry::new(reading.clone(), topic.clone(), timestamp);
				match self.spool.record_failure(&entry).await {
					| Ok(path) => SpoolAction::Appended(path),
					| Err(err) => {
						error!(
							error = %err,
							payload = %reading,
							"Reading dropped, spool unavailable"
						);
						SpoolAction::Failed(err)
					}
				}
			}
		};

		TickReport {
			tick: self.ticks,
			reading,
			topic,
			outcome,
			spool_action,
		}
	}

	/// Runs ticks until `limit` is reached or `shutdown` resolves.
	///
	/// The shutdown signal is only observed between ticks, so a started
	/// tick always completes; it does interrupt the pause between ticks.
	/// Any open spool file is flushed and closed before returning.
	pub async fn run<F>(&mut self, limit: RunLimit, shutdown: F) -> RunSummary
	where F: Future<Output = ()> {
		let mut shutdown = pin!(shutdown);
		let files_before = self.spool.files_created();
		let mut summary = RunSummary::default();
		info!(
			limit = ?limit,
			interval = ?self.settings.interval,
			"Publish loop started"
		);

		while !limit.reached(summary.ticks) {
			let report = self.tick().await;
			summary.record(&report);
			if limit.reached(summary.ticks) {
				break;
			}
			tokio::select! {
				_ = &mut shutdown => {
					info!(
						ticks = summary.ticks,
						"Shutdown requested, stopping publish loop"
					);
					summary.cancelled = true;
					break;
				}
				_ = time::sleep(self.settings.interval) => {}
			}
		}

		if let Err(err) = self.close().await {
			error!(error = %err, "Failed to close spool file at shutdown");
			summary.spool_errors += 1;
		}
		summary.spool_files = self.spool.files_created() - files_before;
		info!(
			ticks = summary.ticks,
			delivered = summary.delivered,
			failed = summary.failed,
			spool_files = summary.spool_files,
			"Publish loop finished"
		);
		summary
	}

	/// Flushes and closes the open spool file, if any.
	pub async fn close(&mut self) -> Result<Option<ClosedSpool>, SpoolError> {
		self.spool.close().await
	}

	/// Consumes the loop, returning its broker and spool store
	pub fn into_parts(self) -> (B, SpoolStore<C>) {
		(self.broker, self.spool)
	}
}
