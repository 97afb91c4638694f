//! Readiness watchers for asynchronous page rendering: wait for an element
//! to disappear from a streamed document, or check that an exact number of
//! table elements are present.
//!
//! Both capabilities sit on the `dom` crate's update broadcast and shared
//! query index; neither depends on the other.

pub mod disappear;
pub use disappear::{DisappearanceWatch, Resolution, watch_for_disappearance};

pub mod tables;
pub use tables::check_tables_ready;
