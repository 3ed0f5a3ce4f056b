//! Sources of sensor readings for the publish loop

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::reading::Reading;

/// Produces a reading each time the publish loop asks for one.
pub trait SamplingSource: Send {
	fn next_reading(&mut self) -> Reading;
}

impl<F> SamplingSource for F
where F: FnMut() -> Reading + Send
{
	fn next_reading(&mut self) -> Reading {
		self()
	}
}

/// Raw lines emitted by the bench simulator
pub const SIMULATED_LINES: [&str; 4] =
	["TEMP:24.5", "HUM:60", "RFID:12345", "RFID:67890"];

/// Picks uniformly among [`SIMULATED_LINES`].
#[derive(Debug, Clone)]
pub struct SimulatedSource {
	rng: StdRng,
}

impl SimulatedSource {
	/// Seeds from the operating system
	pub fn new() -> Self {
		Self {
			rng: StdRng::from_os_rng(),
		}
	}

	/// Deterministic sequence, for reproducible runs
	pub fn seeded(seed: u64) -> Self {
		Self {
			rng: StdRng::seed_from_u64(seed),
		}
	}
}

impl Default for SimulatedSource {
	fn default() -> Self {
		Self::new()
	}
}

impl SamplingSource for SimulatedSource {
	fn next_reading(&mut self) -> Reading {
		let index = self.rng.random_range(0 .. SIMULATED_LINES.len());
		Reading::parse(SIMULATED_LINES[index])
	}
}

/// Replays a fixed list of raw lines, starting over after the last one.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
	lines: Vec<String>,
	position: usize,
}

impl ScriptedSource {
	/// An empty script yields `Unknown` readings with an empty payload
	pub fn new<I, S>(lines: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			lines: lines.into_iter().map(Into::into).collect(),
			position: 0,
		}
	}
}

impl SamplingSource for ScriptedSource {
	fn next_reading(&mut self) -> Reading {
		let Some(line) = self.lines.get(self.position % self.lines.len().max(1))
		else {
			return Reading::parse("");
		};
		self.position = self.position.wrapping_add(1);
		Reading::parse(line)
	}
}
