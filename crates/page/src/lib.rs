//! Page loading and lifecycle glue: fetch a document, stream it into a
//! [`dom::Document`], and surface fire-once lifecycle events for loggers
//! and readiness checks to hang off.

pub mod config;
pub use config::PageConfig;

pub mod fetch;
pub use fetch::fetch_url;

pub mod session;
pub use session::{LifecycleEvent, PageSession};

pub mod lifecycle;
pub use lifecycle::attach_lifecycle_loggers;
