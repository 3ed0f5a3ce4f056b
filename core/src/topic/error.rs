//! Error types and limits for topic names and subscription filters

use thiserror::Error;

/// Errors raised while validating topic names and topic filters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
	/// Topic or filter string is empty
	#[error("Topic cannot be empty")]
	Empty,

	/// Topic or filter exceeds the MQTT length limit
	#[error("Topic is {len} bytes long, maximum is {max}")]
	TooLong { len: usize, max: usize },

	/// Topic name contains wildcard characters or a null byte
	#[error(
		"Topic '{topic}' contains illegal characters ('#', '+', or null byte)"
	)]
	IllegalCharacter { topic: String },

	/// Wildcard does not occupy a whole level, or `#` is not the last level
	#[error("Wildcard misplaced in filter '{filter}' at level {level}")]
	MisplacedWildcard { filter: String, level: usize },

	/// Namespace contains a line terminator or the spool line separator
	#[error(
		"Namespace '{namespace}' cannot contain line breaks or '{separator}'"
	)]
	UnspoolableNamespace {
		namespace: String,
		separator: &'static str,
	},
}

impl TopicError {
	/// Creates a new IllegalCharacter error
	pub fn illegal_character(topic: impl Into<String>) -> Self {
		Self::IllegalCharacter {
			topic: topic.into(),
		}
	}

	/// Creates a new MisplacedWildcard error
	pub fn misplaced_wildcard(filter: impl Into<String>, level: usize) -> Self {
		Self::MisplacedWildcard {
			filter: filter.into(),
			level,
		}
	}
}

/// Convenient Result type for topic operations
pub type TopicResult<T> = Result<T, TopicError>;

/// Topic processing limits
pub mod limits {
	/// Maximum topic length in bytes allowed by MQTT
	pub const MAX_TOPIC_LENGTH: usize = 65535;
}

/// Validation shared by topic names and topic filters
pub mod validation {
	use super::{TopicError, TopicResult, limits};

	/// Checks emptiness, length and null bytes
	pub fn validate_common(topic: &str) -> TopicResult<()> {
		if topic.is_empty() {
			return Err(TopicError::Empty);
		}
		if topic.len() > limits::MAX_TOPIC_LENGTH {
			return Err(TopicError::TooLong {
				len: topic.len(),
				max: limits::MAX_TOPIC_LENGTH,
			});
		}
		if topic.contains('\0') {
			return Err(TopicError::illegal_character(topic));
		}
		Ok(())
	}

	/// Validates a concrete topic name usable for publishing
	pub fn validate_topic_name(topic: &str) -> TopicResult<()> {
		validate_common(topic)?;
		if topic.chars().any(|c| matches!(c, '#' | '+')) {
			return Err(TopicError::illegal_character(topic));
		}
		Ok(())
	}

	/// Validates a subscription filter
	///
	/// `+` must occupy a whole level, `#` must be the whole last level.
	pub fn validate_topic_filter(filter: &str) -> TopicResult<()> {
		validate_common(filter)?;
		let level_count = filter.split('/').count();
		for (level, segment) in filter.split('/').enumerate() {
			let has_hash = segment.contains('#');
			let has_plus = segment.contains('+');
			if has_hash && (segment != "#" || level + 1 != level_count) {
				return Err(TopicError::misplaced_wildcard(filter, level));
			}
			if has_plus && segment != "+" {
				return Err(TopicError::misplaced_wildcard(filter, level));
			}
		}
		Ok(())
	}
}
