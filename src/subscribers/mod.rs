//! # Built-in subscribers
//!
//! Small, self-contained observers of the hub streams.
//!
//! - [`LogWriter`]: renders snapshots, notifications and activity as `tracing` events.

mod log;

pub use log::LogWriter;
