//! Broadcast streams: the hub's only output channel.
//!
//! ## Contents
//! - [`EventStream`] thread-safe multi-subscriber broadcast of one value type
//! - [`Subscription`] RAII token returned by `subscribe`
//! - [`Subscribe`] named observer trait
//!
//! ## Quick reference
//! - **Publishers**: the operation manager (snapshot list, activity) and operation
//!   contexts (notifications), always outside hub locks.
//! - **Consumers**: UI panes, toasts, progress indicators, [`LogWriter`](crate::LogWriter).

mod stream;
mod subscriber;
mod subscription;

pub use stream::EventStream;
pub use subscriber::Subscribe;
pub use subscription::Subscription;
