//! Route handlers and the per-route options they travel with.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arcstr::ArcStr;
use futures::FutureExt;
use futures::future::BoxFuture;

use super::error::{HandlerFailure, HandlerResult};
use crate::message::{MqttMessage, PayloadFormat};
use crate::topic::TopicParameters;

type SyncFn =
	dyn FnMut(ArcStr, MqttMessage, TopicParameters) -> HandlerResult + Send;
type AsyncFn = dyn FnMut(ArcStr, MqttMessage, TopicParameters) -> BoxFuture<'static, HandlerResult>
	+ Send;

#[derive(Clone)]
enum HandlerKind {
	Sync(Arc<Mutex<Box<SyncFn>>>),
	Async(Arc<Mutex<Box<AsyncFn>>>),
}

/// Callback attached to a route.
///
/// Handlers are `FnMut`: state captured by the closure can be mutated freely
/// because the dispatch consumer never runs two invocations at once.
/// Cloning a handler shares the same closure.
#[derive(Clone)]
pub struct Handler {
	kind: HandlerKind,
}

impl Handler {
	/// Wraps a callback that completes without suspending.
	pub fn sync<F>(handler: F) -> Self
	where F: FnMut(ArcStr, MqttMessage, TopicParameters) -> HandlerResult
			+ Send
			+ 'static {
		Self {
			kind: HandlerKind::Sync(Arc::new(Mutex::new(Box::new(handler)))),
		}
	}

	/// Wraps a callback returning a future; the consumer awaits it before
	/// taking the next delivery.
	pub fn from_async<F, Fut>(mut handler: F) -> Self
	where
		F: FnMut(ArcStr, MqttMessage, TopicParameters) -> Fut + Send + 'static,
		Fut: Future<Output = HandlerResult> + Send + 'static,
	{
		let boxed: Box<AsyncFn> = Box::new(move |topic, message, parameters| {
			handler(topic, message, parameters).boxed()
		});
		Self {
			kind: HandlerKind::Async(Arc::new(Mutex::new(boxed))),
		}
	}

	pub fn is_async(&self) -> bool {
		matches!(self.kind, HandlerKind::Async(_))
	}

	/// Runs the handler to completion, turning errors and panics into
	/// a [`HandlerFailure`].
	pub(crate) async fn invoke(
		&self,
		topic: ArcStr,
		message: MqttMessage,
		parameters: TopicParameters,
	) -> Result<(), HandlerFailure> {
		match &self.kind {
			| HandlerKind::Sync(callback) => {
				let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
					let mut callback = lock(callback);
					(*callback)(topic, message, parameters)
				}));
				settle(outcome)
			}
			| HandlerKind::Async(callback) => {
				let future = panic::catch_unwind(AssertUnwindSafe(|| {
					let mut callback = lock(callback);
					(*callback)(topic, message, parameters)
				}))
				.map_err(|payload| {
					HandlerFailure::Panicked(panic_message(payload.as_ref()))
				})?;
				settle(AssertUnwindSafe(future).catch_unwind().await)
			}
		}
	}
}

impl fmt::Debug for Handler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kind = if self.is_async() { "async" } else { "sync" };
		f.debug_struct("Handler").field("kind", &kind).finish()
	}
}

// A panic inside a previous invocation poisons the lock; the closure itself
// is still usable.
fn lock<T: ?Sized>(mutex: &Mutex<Box<T>>) -> MutexGuard<'_, Box<T>> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn settle(
	outcome: Result<HandlerResult, Box<dyn Any + Send>>,
) -> Result<(), HandlerFailure> {
	match outcome {
		| Ok(Ok(())) => Ok(()),
		| Ok(Err(err)) => Err(HandlerFailure::Failed(err)),
		| Err(payload) => {
			Err(HandlerFailure::Panicked(panic_message(payload.as_ref())))
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"non-string panic payload".to_string()
	}
}

/// Handler plus the options it was registered with
#[derive(Debug, Clone)]
pub struct Route {
	pub handler: Handler,
	pub payload_format: PayloadFormat,
}

impl Route {
	pub fn new(handler: Handler, payload_format: PayloadFormat) -> Self {
		Self {
			handler,
			payload_format,
		}
	}
}
