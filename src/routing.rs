//! Handler execution
//!
//! Matched routes are handed from the transport's context to a single
//! consumer through [`DispatchQueue`]. The consumer runs handlers one at a
//! time in arrival order, so handler code never needs its own locking.

/// Dispatch and handler error types
pub mod error;
pub mod dispatch_queue;
/// Route handlers
pub mod handler;

pub use dispatch_queue::{
	Delivery, DispatchController, DispatchHandle, DispatchQueue,
	DispatchRunner, DispatchStats,
};
pub use error::{DispatchError, HandlerError, HandlerFailure, HandlerResult};
pub use handler::{Handler, Route};
