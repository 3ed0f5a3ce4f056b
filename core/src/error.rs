use thiserror::Error;

use crate::broker::{ConnectionError, PublishFailure};
use crate::routing::SubscriptionError;
use crate::spool::SpoolError;
use crate::subscriber::SessionError;
use crate::topic::TopicError;

/// Any error the telemetry core can report
#[derive(Debug, Error)]
pub enum TelemetryError {
	#[error(transparent)]
	Topic(#[from] TopicError),

	#[error(transparent)]
	Connection(#[from] ConnectionError),

	#[error(transparent)]
	Publish(#[from] PublishFailure),

	#[error(transparent)]
	Spool(#[from] SpoolError),

	#[error(transparent)]
	Subscription(#[from] SubscriptionError),

	#[error(transparent)]
	Session(#[from] SessionError),
}

/// Result type alias for the telemetry core
pub type Result<T> = std::result::Result<T, TelemetryError>;
