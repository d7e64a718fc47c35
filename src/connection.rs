//! Transport connection loop
//!
//! [`MqttConnection::run`] owns the rumqttc event loop. It moves the client
//! through `Disconnected -> Connecting -> Connected`, re-subscribes every
//! known route on each connect, feeds inbound publishes into the resolver
//! and dispatch queue, and backs off between failed connection attempts.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, Outgoing, Packet};
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use crate::client::async_client::{
	ClientShared, ConnectionState, request_subscriptions, subscribe_filters,
};
use crate::client::error::MqttClientError;
use crate::client::reconnect::ReconnectPolicy;
use crate::routing::{DispatchRunner, DispatchStats};

const DISCONNECT_GRACE: Duration = Duration::from_secs(5);

/// Drives the transport for an [`MqttClient`](crate::MqttClient).
pub struct MqttConnection {
	client: AsyncClient,
	event_loop: EventLoop,
	shared: Arc<ClientShared>,
	runner: DispatchRunner,
	reconnect: ReconnectPolicy,
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
	Continue,
	Finished,
}

impl MqttConnection {
	pub(crate) fn new(
		client: AsyncClient,
		event_loop: EventLoop,
		shared: Arc<ClientShared>,
		runner: DispatchRunner,
		reconnect: ReconnectPolicy,
	) -> Self {
		Self {
			client,
			event_loop,
			shared,
			runner,
			reconnect,
		}
	}

	#[cfg(test)]
	pub(crate) fn into_runner(self) -> DispatchRunner {
		self.runner
	}

	/// Starts the dispatch consumer, then connects and keeps the transport
	/// alive until [`MqttClient::stop`](crate::MqttClient::stop) is called or
	/// the client disconnects on its own.
	///
	/// Connection failures are retried forever with backoff; they never end
	/// the loop.
	pub async fn run(self) -> Result<DispatchStats, MqttClientError> {
		let Self {
			client,
			mut event_loop,
			shared,
			runner,
			mut reconnect,
		} = self;
		let mut stop = shared.stop_signal();

		let controller = runner.spawn();
		shared.dispatch.wait_ready().await;
		shared.set_running(true);
		shared.set_state(ConnectionState::Connecting);
		info!("MQTT connection loop started");

		loop {
			let polled = tokio::select! {
				biased;
				_ = stop_requested(&mut stop) => {
					info!("Stop signal received");
					Self::flush_disconnect(&shared, &mut event_loop).await;
					break;
				}
				polled = event_loop.poll() => polled,
			};

			let step = match polled {
				| Ok(event) => Self::handle_event(&client, &shared, &mut reconnect, event),
				| Err(err) => {
					shared.set_state(ConnectionState::Disconnected);
					let delay = reconnect.next_delay();
					warn!(
						error = %err,
						attempt = reconnect.attempts(),
						delay = ?delay,
						"MQTT connection lost, retrying"
					);
					tokio::select! {
						biased;
						_ = stop_requested(&mut stop) => {
							info!("Stop signal received during backoff");
							Step::Finished
						}
						_ = tokio::time::sleep(delay) => {
							shared.set_state(ConnectionState::Connecting);
							Step::Continue
						}
					}
				}
			};
			if let Step::Finished = step {
				break;
			}
		}

		shared.set_state(ConnectionState::Disconnected);
		shared.set_running(false);
		let stats = match controller.shutdown().await {
			| Ok(stats) => stats,
			| Err(err) => {
				error!(error = %err, "Dispatch consumer task failed");
				DispatchStats::default()
			}
		};
		info!(stats = ?stats, "MQTT connection loop terminated");
		Ok(stats)
	}

	fn handle_event(
		client: &AsyncClient,
		shared: &ClientShared,
		reconnect: &mut ReconnectPolicy,
		event: Event,
	) -> Step {
		match event {
			| Event::Incoming(Packet::ConnAck(ack)) => {
				if ack.code != ConnectReturnCode::Success {
					warn!(code = ?ack.code, "Broker refused connection");
					return Step::Continue;
				}
				reconnect.reset();
				let subscriptions = shared.mark_connected();
				info!(
					session_present = ack.session_present,
					subscriptions = subscriptions.len(),
					"Connected to MQTT broker"
				);
				if subscriptions.is_empty() {
					warn!("Connected without any subscriptions");
				} else {
					request_subscriptions(client, subscribe_filters(&subscriptions));
				}
			}
			| Event::Incoming(Packet::Publish(publish)) => {
				trace!(
					topic = %publish.topic,
					payload_size = publish.payload.len(),
					"Received MQTT message"
				);
				shared.deliver(&publish.topic, publish.payload);
			}
			| Event::Incoming(Packet::Disconnect) => {
				warn!("Broker sent Disconnect");
				shared.set_state(ConnectionState::Disconnected);
			}
			| Event::Outgoing(Outgoing::Disconnect) => {
				info!("Sent MQTT Disconnect packet to server");
				return Step::Finished;
			}
			| notification => {
				debug!(notification = ?notification, "Received MQTT notification");
			}
		}
		Step::Continue
	}

	// Lets a queued Disconnect reach the broker before the loop returns.
	async fn flush_disconnect(shared: &ClientShared, event_loop: &mut EventLoop) {
		if shared.state() != ConnectionState::Connected {
			return;
		}
		let flushed = tokio::time::timeout(DISCONNECT_GRACE, async {
			loop {
				match event_loop.poll().await {
					| Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
					| Ok(_) => {}
				}
			}
		})
		.await;
		if flushed.is_err() {
			warn!(grace = ?DISCONNECT_GRACE, "Disconnect not flushed in time");
		}
	}
}

async fn stop_requested(stop: &mut watch::Receiver<bool>) {
	let _ = stop.wait_for(|stop| *stop).await;
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
