//! Sensor readings as produced by a sampling source

use std::fmt::Display;

/// What a reading measures, derived from the prefix of the raw sensor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadingKind {
	/// `TEMP:<celsius>`
	Temperature,
	/// `HUM:<percent>`
	Humidity,
	/// `RFID:<uid>`
	TagScan,
	/// Anything the classifier does not recognise
	Unknown,
}

impl ReadingKind {
	/// All kinds, in classification priority order
	pub const ALL: [ReadingKind; 4] = [
		ReadingKind::Temperature,
		ReadingKind::Humidity,
		ReadingKind::TagScan,
		ReadingKind::Unknown,
	];

	/// Detects the kind from a raw sensor line.
	///
	/// Matching is a case-insensitive prefix test, so `TEMP:24.5` and
	/// `Temperature:24.5` are both temperature readings.
	pub fn detect(raw: &str) -> Self {
		let starts_with = |prefix: &str| {
			raw.get(.. prefix.len())
				.is_some_and(|head| head.eq_ignore_ascii_case(prefix))
		};

		if starts_with("TEMP") {
			ReadingKind::Temperature
		} else if starts_with("HUM") {
			ReadingKind::Humidity
		} else if starts_with("RFID") || starts_with("TAG") {
			ReadingKind::TagScan
		} else {
			ReadingKind::Unknown
		}
	}
}

/// A single immutable sample: its kind plus the payload sent to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
	kind: ReadingKind,
	payload: String,
}

impl Reading {
	pub fn new(kind: ReadingKind, payload: impl Into<String>) -> Self {
		Self {
			kind,
			payload: payload.into(),
		}
	}

	/// Parses a raw sensor line. Never fails: unrecognised lines become
	/// [`ReadingKind::Unknown`]. The payload is the trimmed line.
	pub fn parse(raw: &str) -> Self {
		let payload = raw.trim();
		Self::new(ReadingKind::detect(payload), payload)
	}

	pub fn kind(&self) -> ReadingKind {
		self.kind
	}

	pub fn payload(&self) -> &str {
		&self.payload
	}
}

impl Display for Reading {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.payload)
	}
}
