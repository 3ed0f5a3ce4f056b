use chrono::{DateTime, Local};

/// Source of wall-clock time for spool file names and entry timestamps.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Local>;
}

/// Clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Local> {
		Local::now()
	}
}

impl<C> Clock for &C
where C: Clock + ?Sized
{
	fn now(&self) -> DateTime<Local> {
		(**self).now()
	}
}
