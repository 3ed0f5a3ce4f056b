//! Topic handling module
//!
//! Validated topic names and subscription filters, wildcard matching, and
//! the classifier that maps sensor readings to their publish topic.

pub mod classifier;
pub mod error;
pub mod filter;


pub use classifier::{DEFAULT_NAMESPACE, TopicClassifier};
pub use error::{TopicError, TopicResult, limits, validation};
pub use filter::{Topic, TopicFilter};
