//! # Reusable operations.
//!
//! This module provides the operation-object flavor of the executor entry points:
//! - [`Operation`] - trait for implementing named, reusable units of work
//! - [`OperationFn`] - closure-backed operation
//! - [`OperationRef`] - shared reference to an operation (`Arc<dyn Operation<..>>`)

mod operation;
mod operation_fn;

pub use operation::{Operation, OperationRef};
pub use operation_fn::OperationFn;
