use std::fmt::Display;

use thiserror::Error;

use crate::topic::{Topic, TopicError};

/// Separator between payload and topic in a spool line
pub const SEPARATOR: &str = " -> ";

/// Errors reading a spool line back
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LineParseError {
	/// Line has no ` -> ` separator
	#[error("Spool line has no '{SEPARATOR}' separator")]
	MissingSeparator,

	/// Text after the separator is not a valid topic
	#[error("Spool line has an invalid topic: {0}")]
	InvalidTopic(#[from] TopicError),
}

/// One spooled message in its stable on-disk form: `<payload> -> <topic>`.
///
/// Backslashes and line terminators inside the payload are escaped so one
/// entry always occupies exactly one line. Parsing splits on the last
/// separator, since the topic never contains one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolLine {
	payload: String,
	topic: Topic,
}

impl SpoolLine {
	pub fn new(payload: impl Into<String>, topic: Topic) -> Self {
		Self {
			payload: payload.into(),
			topic,
		}
	}

	/// Parses a line as written by [`Display`]; a trailing `\n` or `\r\n`
	/// is ignored.
	pub fn parse(line: &str) -> Result<Self, LineParseError> {
		let line = line
			.strip_suffix('\n')
			.map(|rest| rest.strip_suffix('\r').unwrap_or(rest))
			.unwrap_or(line);
		let (payload, topic) = line
			.rsplit_once(SEPARATOR)
			.ok_or(LineParseError::MissingSeparator)?;
		Ok(Self {
			payload: unescape(payload),
			topic: Topic::new(topic)?,
		})
	}

	pub fn payload(&self) -> &str {
		&self.payload
	}

	pub fn topic(&self) -> &Topic {
		&self.topic
	}

	pub fn into_parts(self) -> (String, Topic) {
		(self.payload, self.topic)
	}
}

impl Display for SpoolLine {
	/// Formats the line without its terminator
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}{SEPARATOR}{}", escape(&self.payload), self.topic)
	}
}

fn escape(payload: &str) -> std::borrow::Cow<'_, str> {
	if !payload.contains(['\\', '\n', '\r']) {
		return payload.into();
	}
	let mut escaped = String::with_capacity(payload.len() + 8);
	for c in payload.chars() {
		match c {
			| '\\' => escaped.push_str("\\\\"),
			| '\n' => escaped.push_str("\\n"),
			| '\r' => escaped.push_str("\\r"),
			| other => escaped.push(other),
		}
	}
	escaped.into()
}

fn unescape(payload: &str) -> String {
	let mut unescaped = String::with_capacity(payload.len());
	let mut chars = payload.chars();
	while let Some(c) = chars.next() {
		if c != '\\' {
			unescaped.push(c);
			continue;
		}
		match chars.next() {
			| Some('\\') => unescaped.push('\\'),
			| Some('n') => unescaped.push('\n'),
			| Some('r') => unescaped.push('\r'),
			// Unknown escapes are kept verbatim.
			| Some(other) => {
				unescaped.push('\\');
				unescaped.push(other);
			}
			| None => unescaped.push('\\'),
		}
	}
	unescaped
}
