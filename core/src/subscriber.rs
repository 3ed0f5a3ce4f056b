//! Subscriber session
//!
//! An operator picks a feed from the numbered [`menu`], the session
//! subscribes to its filter and passes every inbound message to a
//! [`MessageHandler`] until told to stop.

pub mod error;
pub mod menu;
pub mod session;

#[cfg(test)]
mod session_tests;

pub use error::SessionError;
pub use menu::{Channel, Floor, MENU, MenuEntry, Site, TopicSelection};
pub use session::{
	ActiveSession, MessageHandler, SessionSummary, StopReason,
	SubscriberSession, selection_for,
};
