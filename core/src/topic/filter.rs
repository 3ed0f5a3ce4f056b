use std::fmt::Display;

use arcstr::ArcStr;

use super::error::{TopicResult, validation};

/// Concrete topic name a message is published to.
///
/// Validated on construction: non-empty, within the MQTT length limit and
/// free of wildcard characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(pub(super) ArcStr);

impl Topic {
	/// Validates and wraps a topic name
	pub fn new(topic: impl Into<ArcStr>) -> TopicResult<Self> {
		let topic = topic.into();
		validation::validate_topic_name(&topic)?;
		Ok(Self(topic))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Iterates over the `/`-separated levels
	pub fn levels(&self) -> impl Iterator<Item = &str> {
		self.0.split('/')
	}
}

impl Display for Topic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for Topic {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl TryFrom<&str> for Topic {
	type Error = super::TopicError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl TryFrom<String> for Topic {
	type Error = super::TopicError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

/// Subscription filter, possibly containing `+` and `#` wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicFilter(pub(crate) ArcStr);

impl TopicFilter {
	/// Validates and wraps a topic filter
	pub fn new(filter: impl Into<ArcStr>) -> TopicResult<Self> {
		let filter = filter.into();
		validation::validate_topic_filter(&filter)?;
		Ok(Self(filter))
	}

	/// Filter matching every topic (`#`)
	pub fn all() -> Self {
		Self(arcstr::literal!("#"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns true if the filter contains `+` or `#`
	pub fn is_wildcard(&self) -> bool {
		self.0.split('/').any(|level| level == "+" || level == "#")
	}

	/// Checks whether a concrete topic is matched by this filter.
	///
	/// `a/#` also matches `a`. Filters starting with a wildcard never match
	/// topics starting with `$`.
	pub fn matches(&self, topic: &Topic) -> bool {
		if topic.as_str().starts_with('$')
			&& matches!(self.0.as_bytes().first(), Some(b'+' | b'#'))
		{
			return false;
		}

		let mut filter_levels = self.0.split('/');
		let mut topic_levels = topic.levels();
		loop {
			match (filter_levels.next(), topic_levels.next()) {
				| (Some("#"), _) => return true,
				| (Some("+"), Some(_)) => {}
				| (Some(expected), Some(actual)) if expected == actual => {}
				| (None, None) => return true,
				| _ => return false,
			}
		}
	}
}

impl Display for TopicFilter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<Topic> for TopicFilter {
	fn from(topic: Topic) -> Self {
		Self(topic.0)
	}
}

impl TryFrom<&str> for TopicFilter {
	type Error = super::TopicError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
