use std::fmt::{Display, Write as _};

use self::Channel::{Humidity, Other, TagAccepted, TagDenied, Temperature};
use self::Floor::{First, Ground, Second};
use self::Site::{Cdmx, Gdj};
use crate::topic::TopicFilter;

/// Campus a sensor is installed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
	Cdmx,
	Gdj,
}

impl Site {
	pub const ALL: [Site; 2] = [Site::Cdmx, Site::Gdj];

	/// First topic level
	pub fn topic_level(self) -> &'static str {
		match self {
			| Site::Cdmx => "amerikeCDMX",
			| Site::Gdj => "amerikeGDJ",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			| Site::Cdmx => "CDMX",
			| Site::Gdj => "GDJ",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Floor {
	Ground,
	First,
	Second,
}

impl Floor {
	pub const ALL: [Floor; 3] = [Floor::Ground, Floor::First, Floor::Second];

	/// Topic level, also used as the label
	pub fn topic_level(self) -> &'static str {
		match self {
			| Floor::Ground => "PB",
			| Floor::First => "P1",
			| Floor::Second => "P2",
		}
	}
}

/// Kind of sensor feed on a floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
	Temperature,
	Humidity,
	TagAccepted,
	TagDenied,
	Other,
}

impl Channel {
	pub const ALL: [Channel; 5] = [
		Channel::Temperature,
		Channel::Humidity,
		Channel::TagAccepted,
		Channel::TagDenied,
		Channel::Other,
	];

	/// Trailing topic levels; denied scans live one level below `rfid`
	pub fn topic_levels(self) -> &'static str {
		match self {
			| Channel::Temperature => "temp",
			| Channel::Humidity => "hum",
			| Channel::TagAccepted => "rfid",
			| Channel::TagDenied => "rfid/denegado",
			| Channel::Other => "otros",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			| Channel::Temperature => "Temperature",
			| Channel::Humidity => "Humidity",
			| Channel::TagAccepted => "RFID authorized",
			| Channel::TagDenied => "RFID denied",
			| Channel::Other => "Other sensors",
		}
	}
}

/// What a menu entry subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicSelection {
	/// One feed of one floor
	Sensor {
		site: Site,
		floor: Floor,
		channel: Channel,
	},
	/// Every topic on the broker
	AllSensors,
}

impl TopicSelection {
	/// Subscription filter for this selection
	pub fn filter(&self) -> TopicFilter {
		match self {
			| TopicSelection::Sensor {
				site,
				floor,
				channel,
			} => TopicFilter(arcstr::format!(
				"{}/{}/{}",
				site.topic_level(),
				floor.topic_level(),
				channel.topic_levels()
			)),
			| TopicSelection::AllSensors => TopicFilter::all(),
		}
	}

	/// Human readable name, e.g. `CDMX PB - Temperature`
	pub fn label(&self) -> String {
		match self {
			| TopicSelection::Sensor {
				site,
				floor,
				channel,
			} => format!(
				"{} {} - {}",
				site.label(),
				floor.topic_level(),
				channel.label()
			),
			| TopicSelection::AllSensors => "All sensors".to_string(),
		}
	}
}

impl Display for TopicSelection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.label())
	}
}

/// A numbered menu option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuEntry {
	pub key: &'static str,
	pub selection: TopicSelection,
}

const fn sensor(
	key: &'static str,
	site: Site,
	floor: Floor,
	channel: Channel,
) -> MenuEntry {
	MenuEntry {
		key,
		selection: TopicSelection::Sensor {
			site,
			floor,
			channel,
		},
	}
}

/// Every selectable option: key `0` for everything, then `1`-`30` by site,
/// floor and channel.
pub static MENU: [MenuEntry; 31] = [
	MenuEntry {
		key: "0",
		selection: TopicSelection::AllSensors,
	},
	sensor("1", Cdmx, Ground, Temperature),
	sensor("2", Cdmx, Ground, Humidity),
	sensor("3", Cdmx, Ground, TagAccepted),
	sensor("4", Cdmx, Ground, TagDenied),
	sensor("5", Cdmx, Ground, Other),
	sensor("6", Cdmx, First, Temperature),
	sensor("7", Cdmx, First, Humidity),
	sensor("8", Cdmx, First, TagAccepted),
	sensor("9", Cdmx, First, TagDenied),
	sensor("10", Cdmx, First, Other),
	sensor("11", Cdmx, Second, Temperature),
	sensor("12", Cdmx, Second, Humidity),
	sensor("13", Cdmx, Second, TagAccepted),
	sensor("14", Cdmx, Second, TagDenied),
	sensor("15", Cdmx, Second, Other),
	sensor("16", Gdj, Ground, Temperature),
	sensor("17", Gdj, Ground, Humidity),
	sensor("18", Gdj, Ground, TagAccepted),
	sensor("19", Gdj, Ground, TagDenied),
	sensor("20", Gdj, Ground, Other),
	sensor("21", Gdj, First, Temperature),
	sensor("22", Gdj, First, Humidity),
	sensor("23", Gdj, First, TagAccepted),
	sensor("24", Gdj, First, TagDenied),
	sensor("25", Gdj, First, Other),
	sensor("26", Gdj, Second, Temperature),
	sensor("27", Gdj, Second, Humidity),
	sensor("28", Gdj, Second, TagAccepted),
	sensor("29", Gdj, Second, TagDenied),
	sensor("30", Gdj, Second, Other),
];

/// Finds the entry for `key`, ignoring surrounding whitespace
pub fn lookup(key: &str) -> Option<&'static MenuEntry> {
	let key = key.trim();
	MENU.iter().find(|entry| entry.key == key)
}

/// Menu as printed to the operator, one `<key>. <label>` per line
pub fn render() -> String {
	let mut text = String::new();
	for entry in &MENU {
		let _ = writeln!(text, "{}. {}", entry.key, entry.selection);
	}
	text
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use super::*;

	#[test]
	fn test_keys_follow_site_floor_channel_order() {
		let mut expected = vec![TopicSelection::AllSensors];
		for site in Site::ALL {
			for floor in Floor::ALL {
				for channel in Channel::ALL {
					expected.push(TopicSelection::Sensor {
						site,
						floor,
						channel,
					});
				}
			}
		}
		let actual: Vec<_> = MENU.iter().map(|entry| entry.selection).collect();
		assert_eq!(actual, expected);

		for (index, entry) in MENU.iter().enumerate() {
			assert_eq!(entry.key, index.to_string());
		}
	}

	#[test]
	fn test_filters_are_valid_and_distinct() {
		let mut seen = HashSet::new();
		for entry in &MENU {
			let filter = entry.selection.filter();
			TopicFilter::new(filter.as_str()).unwrap();
			assert!(seen.insert(filter.to_string()), "{filter}");
		}
	}

	#[test]
	fn test_known_entries() {
		let entry = lookup("4").unwrap();
		assert_eq!(
			entry.selection.filter().as_str(),
			"amerikeCDMX/PB/rfid/denegado"
		);
		assert_eq!(entry.selection.label(), "CDMX PB - RFID denied");

		let entry = lookup(" 30\n").unwrap();
		assert_eq!(entry.selection.filter().as_str(), "amerikeGDJ/P2/otros");
		assert_eq!(entry.selection.label(), "GDJ P2 - Other sensors");

		let entry = lookup("0").unwrap();
		assert!(entry.selection.filter().is_wildcard());
		assert_eq!(entry.selection.to_string(), "All sensors");
	}

	#[test]
	fn test_unknown_keys() {
		for key in ["", "31", "99", "-1", "01", "temp"] {
			assert!(lookup(key).is_none(), "{key:?}");
		}
	}

	#[test]
	fn test_render_lists_every_entry() {
		let text = render();
		assert_eq!(text.lines().count(), MENU.len());
		assert!(text.starts_with("0. All sensors\n1. CDMX PB - Temperature\n"));
	}
}
