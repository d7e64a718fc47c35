#![allow(clippy::missing_docs_in_private_items)]
#![allow(missing_docs)]
use std::future::Future;

use tokio::sync::{
	mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
	oneshot, watch,
};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use super::error::{DispatchError, HandlerFailure};
use super::handler::Route;
use crate::message::InboundMessage;
use crate::topic::CallbackRequest;

/// One matched route paired with the message that matched it
#[derive(Debug)]
pub struct Delivery {
	pub request: CallbackRequest<Route>,
	pub message: InboundMessage,
}

/// Counters reported by the consumer when it exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
	/// Handler invocations that completed cleanly
	pub completed: u64,
	/// Handler invocations that returned an error or panicked
	pub failed: u64,
	/// Deliveries dropped because the payload could not be decoded
	pub undecodable: u64,
}

/// Entry point creating the producer and consumer halves.
pub struct DispatchQueue;

impl DispatchQueue {
	#[allow(clippy::new_ret_no_self)]
	pub fn new() -> (DispatchHandle, DispatchRunner) {
		let (tx, rx) = unbounded_channel();
		let (ready_tx, ready_rx) = watch::channel(false);
		let handle = DispatchHandle { tx, ready: ready_rx };
		let runner = DispatchRunner {
			rx,
			ready: ready_tx,
			stats: DispatchStats::default(),
		};
		(handle, runner)
	}
}

/// Producer half; safe to clone and use from any thread.
#[derive(Debug, Clone)]
pub struct DispatchHandle {
	tx: UnboundedSender<Delivery>,
	ready: watch::Receiver<bool>,
}

impl DispatchHandle {
	/// Queues a delivery without blocking.
	///
	/// Deliveries offered before the consumer has started are dropped and
	/// reported as [`DispatchError::NotReady`]; they are never replayed.
	pub fn enqueue(
		&self,
		request: CallbackRequest<Route>,
		message: InboundMessage,
	) -> Result<(), DispatchError> {
		if self.tx.is_closed() {
			warn!(topic = %message.topic, "Dispatch consumer gone, delivery dropped");
			return Err(DispatchError::Closed);
		}
		if !self.is_ready() {
			warn!(topic = %message.topic, "Dispatch consumer not started, delivery dropped");
			return Err(DispatchError::NotReady);
		}
		self.tx.send(Delivery { request, message }).map_err(|err| {
			warn!(topic = %err.0.message.topic, "Dispatch consumer gone, delivery dropped");
			DispatchError::Closed
		})
	}

	/// Whether the consumer is currently draining the queue
	pub fn is_ready(&self) -> bool {
		*self.ready.borrow()
	}

	/// Resolves once the consumer has started, or immediately if it has
	/// already exited.
	pub async fn wait_ready(&self) {
		let mut ready = self.ready.clone();
		let _ = ready.wait_for(|ready| *ready).await;
	}
}

/// Consumer half; owns the queue and runs handlers one at a time.
pub struct DispatchRunner {
	rx: UnboundedReceiver<Delivery>,
	ready: watch::Sender<bool>,
	stats: DispatchStats,
}

impl DispatchRunner {
	/// Starts the consumer on its own task.
	pub fn spawn(self) -> DispatchController {
		let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
		let join_handle = tokio::spawn(self.run(async move {
			let _ = shutdown_rx.await;
		}));
		DispatchController {
			shutdown_tx,
			join_handle,
		}
	}

	/// Drains the queue until `shutdown` resolves or every handle is dropped.
	///
	/// Shutdown is only observed between handler invocations; deliveries
	/// still queued at that point are discarded.
	pub async fn run(
		mut self,
		shutdown: impl Future<Output = ()> + Send,
	) -> DispatchStats {
		tokio::pin!(shutdown);
		self.ready.send_replace(true);
		info!("Dispatch consumer started");

		loop {
			tokio::select! {
				biased;
				_ = &mut shutdown => {
					info!(
						discarded = self.rx.len(),
						"Dispatch consumer: Shutdown signal received"
					);
					break;
				}
				delivery = self.rx.recv() => {
					match delivery {
						| Some(delivery) => self.execute(delivery).await,
						| None => {
							info!("Dispatch consumer: All handles dropped, exiting");
							break;
						}
					}
				}
			}
		}

		self.ready.send_replace(false);
		self.rx.close();
		info!(stats = ?self.stats, "Dispatch consumer stopped");
		self.stats
	}

	async fn execute(&mut self, delivery: Delivery) {
		let Delivery { request, message } = delivery;
		let CallbackRequest {
			handler: route,
			topic,
			parameters,
		} = request;

		let message = match route.payload_format.decode(&message) {
			| Ok(message) => message,
			| Err(err) => {
				self.stats.undecodable += 1;
				warn!(topic = %topic, error = %err, "Dropping undecodable payload");
				return;
			}
		};

		trace!(topic = %topic, parameters = ?parameters, "Invoking handler");
		match route.handler.invoke(topic.clone(), message, parameters).await {
			| Ok(()) => {
				self.stats.completed += 1;
				debug!(topic = %topic, "Handler completed");
			}
			| Err(HandlerFailure::Failed(err)) => {
				self.stats.failed += 1;
				error!(topic = %topic, error = %err, "Handler returned an error");
			}
			| Err(HandlerFailure::Panicked(reason)) => {
				self.stats.failed += 1;
				error!(topic = %topic, panic = %reason, "Handler panicked");
			}
		}
	}
}

/// Owner-side control of a spawned consumer.
///
/// Dropping the controller without calling [`shutdown`](Self::shutdown)
/// also stops the consumer.
pub struct DispatchController {
	shutdown_tx: oneshot::Sender<()>,
	join_handle: JoinHandle<DispatchStats>,
}

impl DispatchController {
	pub async fn shutdown(self) -> Result<DispatchStats, JoinError> {
		let _ = self.shutdown_tx.send(()).inspect_err(|_| {
			warn!("DispatchController: Consumer already exited");
		});
		self.join_handle.await.inspect_err(|e| {
			warn!(error = ?e, "DispatchController: Consumer task failed");
		})
	}

	pub fn is_finished(&self) -> bool {
		self.join_handle.is_finished()
	}
}

#[cfg(test)]
#[path = "dispatch_queue_tests.rs"]
mod tests;
