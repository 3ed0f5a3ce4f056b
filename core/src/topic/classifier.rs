use arcstr::ArcStr;

use super::error::{TopicError, TopicResult};
use super::filter::{Topic, TopicFilter};
use crate::reading::{Reading, ReadingKind};
use crate::spool::line::SEPARATOR;

/// Default namespace prefixed to every classified topic
pub const DEFAULT_NAMESPACE: &str = "amerike";

/// Maps readings to `<namespace>/sensor/<kind>` topics.
///
/// The four topics are built once when the classifier is created, so
/// classification itself cannot fail.
#[derive(Debug, Clone)]
pub struct TopicClassifier {
	namespace: ArcStr,
	topics: [Topic; 4],
}

impl TopicClassifier {
	/// Creates a classifier for the given namespace.
	///
	/// The namespace may span several levels (`site/floor`) but must not
	/// contain wildcards. Line breaks and the spool separator are refused
	/// too, so every spooled entry reads back as one line.
	pub fn new(namespace: impl Into<ArcStr>) -> TopicResult<Self> {
		let namespace = namespace.into();
		// A leading "-> " would pair with the separator's trailing space.
		if namespace.contains(['\n', '\r'])
			|| namespace.contains(SEPARATOR)
			|| namespace.starts_with(SEPARATOR.trim_start())
		{
			return Err(TopicError::UnspoolableNamespace {
				namespace: namespace.to_string(),
				separator: SEPARATOR,
			});
		}
		let topic_for = |kind: ReadingKind| {
			Topic::new(format!("{namespace}/sensor/{}", kind_level(kind)))
		};
		let topics = [
			topic_for(ReadingKind::Temperature)?,
			topic_for(ReadingKind::Humidity)?,
			topic_for(ReadingKind::TagScan)?,
			topic_for(ReadingKind::Unknown)?,
		];
		Ok(Self { namespace, topics })
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	/// Returns the topic a reading is published to
	pub fn classify(&self, reading: &Reading) -> Topic {
		self.topic_for_kind(reading.kind()).clone()
	}

	/// Returns the topic used for a reading kind
	pub fn topic_for_kind(&self, kind: ReadingKind) -> &Topic {
		match kind {
			| ReadingKind::Temperature => &self.topics[0],
			| ReadingKind::Humidity => &self.topics[1],
			| ReadingKind::TagScan => &self.topics[2],
			| ReadingKind::Unknown => &self.topics[3],
		}
	}

	/// All topics this classifier can produce
	pub fn topics(&self) -> &[Topic; 4] {
		&self.topics
	}

	/// Filter matching every topic of this namespace (`<namespace>/sensor/#`)
	pub fn namespace_filter(&self) -> TopicFilter {
		// Namespace was validated as a wildcard-free prefix in `new`.
		TopicFilter(arcstr::format!("{}/sensor/#", self.namespace))
	}
}

impl Default for TopicClassifier {
	fn default() -> Self {
		let namespace = arcstr::literal!("amerike");
		let topic = |level: &'static str| {
			Topic(arcstr::format!("{namespace}/sensor/{level}"))
		};
		Self {
			topics: [topic("temp"), topic("hum"), topic("rfid"), topic("otros")],
			namespace,
		}
	}
}

fn kind_level(kind: ReadingKind) -> &'static str {
	match kind {
		| ReadingKind::Temperature => "temp",
		| ReadingKind::Humidity => "hum",
		| ReadingKind::TagScan => "rfid",
		| ReadingKind::Unknown => "otros",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::spool::SpoolLine;

	#[test]
	fn test_classifies_each_kind_into_its_topic() {
		let classifier = TopicClassifier::new("amerike").unwrap();

		let cases = [
			("TEMP:24.5", "amerike/sensor/temp"),
			("Temperature:24.5", "amerike/sensor/temp"),
			("HUM:60", "amerike/sensor/hum"),
			("RFID:12345", "amerike/sensor/rfid"),
			("RFID:67890", "amerike/sensor/rfid"),
			("LUX:12", "amerike/sensor/otros"),
			("", "amerike/sensor/otros"),
		];
		for (raw, expected) in cases {
			let topic = classifier.classify(&Reading::parse(raw));
			assert_eq!(topic.as_str(), expected, "reading {raw:?}");
		}
	}

	#[test]
	fn test_classification_is_total_and_deterministic() {
		let classifier = TopicClassifier::new("plant/P1").unwrap();
		let inputs = ["TEMP:1", "hum:2", "rfid:3", "???", "tag:4", "  x  "];

		for raw in inputs {
			let reading = Reading::parse(raw);
			let first = classifier.classify(&reading);
			let second = classifier.classify(&reading);
			assert_eq!(first, second);
			assert!(classifier.topics().contains(&first));
		}
	}

	#[test]
	fn test_default_matches_amerike_namespace() {
		let built = TopicClassifier::new(DEFAULT_NAMESPACE).unwrap();
		let default = TopicClassifier::default();

		assert_eq!(built.topics(), default.topics());
		assert_eq!(default.namespace(), DEFAULT_NAMESPACE);
	}

	#[test]
	fn test_rejects_wildcard_namespace() {
		assert!(matches!(
			TopicClassifier::new("amerike/#"),
			Err(TopicError::IllegalCharacter { .. })
		));
		assert!(matches!(
			TopicClassifier::new("a/+/b"),
			Err(TopicError::IllegalCharacter { .. })
		));
	}

	#[test]
	fn test_rejects_namespace_that_breaks_spool_lines() {
		for namespace in [
			"plant -> a",
			"amer\nike",
			"amer\rike",
			"-> plant",
		] {
			assert!(
				matches!(
					TopicClassifier::new(namespace),
					Err(TopicError::UnspoolableNamespace { .. })
				),
				"{namespace:?}"
			);
		}
		// An arrow without the surrounding spaces is an ordinary level.
		assert!(TopicClassifier::new("plant->a").is_ok());
	}

	#[test]
	fn test_classified_topics_survive_a_spool_line() {
		let classifier = TopicClassifier::new("plant->a/P1").unwrap();
		let reading = Reading::parse("TEMP:24.5");
		let topic = classifier.classify(&reading);

		let line = SpoolLine::new(reading.payload(), topic.clone()).to_string();
		let read = SpoolLine::parse(&line).unwrap();

		assert_eq!(read.payload(), "TEMP:24.5");
		assert_eq!(read.topic(), &topic);
	}

	#[test]
	fn test_namespace_filter_matches_all_classified_topics() {
		let classifier = TopicClassifier::new("amerike").unwrap();
		let filter = classifier.namespace_filter();

		assert_eq!(filter.as_str(), "amerike/sensor/#");
		for topic in classifier.topics() {
			assert!(filter.matches(topic));
		}
	}
}
