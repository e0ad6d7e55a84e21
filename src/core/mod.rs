//! Hub core: contexts, repository, manager, scopes and the façade.
//!
//! The public API from this module is [`OperationHub`] plus the handles it hands out
//! ([`OperationContext`], [`OperationScope`], [`BroadcastHandle`]).
//!
//! Internal modules:
//! - [`context`]: per-operation state and the single mutation point;
//! - [`repository`]: active set + broadcast set behind two mutexes;
//! - [`outbox`]: ticketed publication handoff, delivered in order with no hub lock held;
//! - [`manager`]: repository mutation, policy application, stream publication;
//! - [`scope`]: begin/end guarantees and the executor;
//! - [`options`]: per-execution options;
//! - [`hub`]: the façade.

mod context;
mod hub;
mod manager;
mod options;
mod outbox;
mod repository;
mod scope;

pub use context::{BroadcastHandle, ContextRef, OperationContext, Outcome};
pub use hub::OperationHub;
pub use manager::SnapshotList;
pub use options::ExecutionOptions;
pub use scope::OperationScope;
