//! Offline spool: local fallback log of readings that could not be
//! delivered
//!
//! A spool file is opened on the first failure of a streak and closed on
//! the first success after it. Files are never reopened; every streak gets
//! its own file.

pub mod clock;
pub mod error;
pub mod line;
pub mod store;


pub use clock::{Clock, SystemClock};
pub use error::SpoolError;
pub use line::{LineParseError, SpoolLine};
pub use store::{ClosedSpool, SpoolEntry, SpoolStore};
