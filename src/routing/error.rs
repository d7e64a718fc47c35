use thiserror::Error;

/// Boxed error a handler may return
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of a single handler invocation
pub type HandlerResult = Result<(), HandlerError>;

/// Enqueue refused by the dispatch queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
	/// Consumer has not started yet; the delivery was dropped
	#[error("Dispatch consumer is not running yet, delivery dropped")]
	NotReady,
	/// Consumer has exited; the delivery was dropped
	#[error("Dispatch consumer has stopped, delivery dropped")]
	Closed,
}

/// Why a handler invocation did not complete cleanly
#[derive(Debug, Error)]
pub enum HandlerFailure {
	#[error("handler returned an error: {0}")]
	Failed(#[source] HandlerError),
	#[error("handler panicked: {0}")]
	Panicked(String),
}
