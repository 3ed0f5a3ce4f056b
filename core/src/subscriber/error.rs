use thiserror::Error;

use crate::routing::SubscriptionError;

/// Errors starting a subscriber session
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
	/// Menu key that names no entry
	#[error("Invalid selection '{0}'")]
	InvalidSelection(String),

	/// The broker refused or failed the subscription
	#[error("Subscription failed: {0}")]
	Subscribe(#[from] SubscriptionError),
}
