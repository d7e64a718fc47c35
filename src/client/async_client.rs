use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arcstr::ArcStr;
use bytes::Bytes;
use rumqttc::{AsyncClient, QoS, SubscribeFilter};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::config::MqttClientConfig;
use super::error::MqttClientError;
use super::publisher::MqttPublisher;
use super::reconnect::ReconnectPolicy;
use super::subscription_builder::RouteBuilder;
use crate::connection::MqttConnection;
use crate::message::{InboundMessage, PayloadFormat};
use crate::message_serializer::{JsonSerializer, MessageSerializer};
use crate::routing::{DispatchHandle, DispatchQueue, Handler, Route};
use crate::topic::{RouteKind, TopicResolver};

/// Transport lifecycle as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	Disconnected,
	Connecting,
	Connected,
}

/// Transport-level subscription for one canonical pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
	/// Canonical pattern, as sent to the broker
	pub pattern: ArcStr,
	pub qos: QoS,
}

impl Subscription {
	fn filter(&self) -> SubscribeFilter {
		SubscribeFilter::new(self.pattern.to_string(), self.qos)
	}
}

/// Per-route registration options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOptions {
	/// Subscription QoS; the client default when unset
	pub qos: Option<QoS>,
	/// Hand the payload over as bytes instead of decoding JSON
	pub raw_payload: bool,
	/// Only fire when no regular route matched the topic
	pub fallback: bool,
}

impl RouteOptions {
	fn payload_format(&self) -> PayloadFormat {
		if self.raw_payload {
			PayloadFormat::Raw
		} else {
			PayloadFormat::Json
		}
	}

	fn kind(&self) -> RouteKind {
		if self.fallback {
			RouteKind::Fallback
		} else {
			RouteKind::Primary
		}
	}
}

// State and subscriptions share one lock so a registration racing a connect
// is either part of the connect batch or subscribes on its own.
#[derive(Debug)]
struct Registry {
	state: ConnectionState,
	subscriptions: Vec<Subscription>,
}

/// State shared by every client handle and the connection loop.
pub(crate) struct ClientShared {
	resolver: Mutex<TopicResolver<Route>>,
	registry: Mutex<Registry>,
	pub(crate) dispatch: DispatchHandle,
	running: AtomicBool,
	stop_tx: watch::Sender<bool>,
	default_qos: QoS,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ClientShared {
	pub(crate) fn state(&self) -> ConnectionState {
		lock(&self.registry).state
	}

	pub(crate) fn set_state(&self, state: ConnectionState) {
		lock(&self.registry).state = state;
	}

	/// Marks the transport connected and returns the subscriptions to send
	/// in one batch.
	pub(crate) fn mark_connected(&self) -> Vec<Subscription> {
		let mut registry = lock(&self.registry);
		registry.state = ConnectionState::Connected;
		registry.subscriptions.clone()
	}

	pub(crate) fn set_running(&self, running: bool) {
		self.running.store(running, Ordering::Release);
	}

	pub(crate) fn stop_signal(&self) -> watch::Receiver<bool> {
		self.stop_tx.subscribe()
	}

	/// Resolves an inbound message and queues one delivery per matched
	/// route. Returns the number of deliveries queued.
	pub(crate) fn deliver(&self, topic: &str, payload: Bytes) -> usize {
		let requests = match lock(&self.resolver).lookup(topic) {
			| Ok(requests) => requests,
			| Err(err) => {
				warn!(topic = %topic, error = %err, "Ignoring message on invalid topic");
				return 0;
			}
		};
		if requests.is_empty() {
			debug!(topic = %topic, "No route matched message");
			return 0;
		}

		let message = InboundMessage::new(topic, payload);
		let mut queued = 0;
		for request in requests.iter() {
			if self.dispatch.enqueue(request.clone(), message.clone()).is_err() {
				// Every later enqueue fails the same way.
				break;
			}
			queued += 1;
		}
		queued
	}

	// Returns whether the transport should be asked to subscribe right away.
	fn upsert_subscription(&self, pattern: ArcStr, qos: QoS) -> bool {
		let mut registry = lock(&self.registry);
		match registry
			.subscriptions
			.iter_mut()
			.find(|existing| existing.pattern == pattern)
		{
			| Some(existing) => existing.qos = qos,
			| None => registry.subscriptions.push(Subscription { pattern, qos }),
		}
		registry.state == ConnectionState::Connected
	}
}

/// Cloneable handle for registering routes, publishing and stopping.
#[derive(Clone)]
pub struct MqttClient<F = JsonSerializer> {
	client: AsyncClient,
	shared: Arc<ClientShared>,
	serializer: F,
}

impl<F> MqttClient<F>
where F: Default + Clone + Send + Sync + 'static
{
	/// Builds the client handle and the connection that drives it.
	///
	/// Nothing touches the network until [`MqttConnection::run`] is awaited.
	pub fn new(
		config: MqttClientConfig,
	) -> Result<(Self, MqttConnection), MqttClientError> {
		let MqttClientConfig {
			connection,
			settings,
		} = config;
		if settings.event_loop_capacity == 0 {
			return Err(MqttClientError::ConfigurationValue(
				"event_loop_capacity must be greater than zero".to_string(),
			));
		}
		if settings.reconnect.cap.is_zero() {
			return Err(MqttClientError::ConfigurationValue(
				"reconnect cap must be greater than zero".to_string(),
			));
		}

		let (client, event_loop) =
			AsyncClient::new(connection, settings.event_loop_capacity);
		let resolver = match NonZeroUsize::new(settings.lookup_cache_size) {
			| Some(capacity) => TopicResolver::with_cache(capacity),
			| None => TopicResolver::new(),
		};
		let (dispatch, runner) = DispatchQueue::new();
		let (stop_tx, _) = watch::channel(false);

		let shared = Arc::new(ClientShared {
			resolver: Mutex::new(resolver),
			registry: Mutex::new(Registry {
				state: ConnectionState::Disconnected,
				subscriptions: Vec::new(),
			}),
			dispatch,
			running: AtomicBool::new(false),
			stop_tx,
			default_qos: settings.default_qos,
		});

		let connection = MqttConnection::new(
			client.clone(),
			event_loop,
			Arc::clone(&shared),
			runner,
			ReconnectPolicy::new(settings.reconnect),
		);
		let fresh_client = Self {
			client,
			shared,
			serializer: F::default(),
		};
		Ok((fresh_client, connection))
	}

	/// Registers a route and returns its canonical pattern.
	///
	/// Usable before or after the connection starts; when connected the
	/// transport subscription is requested immediately. The route is live
	/// once this returns `Ok`. If the request channel is full the subscribe
	/// is retried in the background, or left to the next connect when no
	/// runtime is available.
	pub fn register(
		&self,
		pattern: &str,
		handler: Handler,
		options: RouteOptions,
	) -> Result<ArcStr, MqttClientError> {
		let (canonical, qos, subscribe_now) =
			self.add_route(pattern, handler, options)?;
		if subscribe_now {
			request_subscriptions(&self.client, vec![SubscribeFilter::new(
				canonical.to_string(),
				qos,
			)]);
		}
		Ok(canonical)
	}

	/// Like [`register`](Self::register), but waits for room in the event
	/// loop's request channel instead of deferring the subscribe when it is full.
	pub async fn add_subscription(
		&self,
		pattern: &str,
		handler: Handler,
		options: RouteOptions,
	) -> Result<ArcStr, MqttClientError> {
		let (canonical, qos, subscribe_now) =
			self.add_route(pattern, handler, options)?;
		if subscribe_now {
			self.client.subscribe(canonical.as_str(), qos).await?;
		}
		Ok(canonical)
	}

	/// Starts a fluent registration.
	pub fn route(&self, pattern: &str, handler: Handler) -> RouteBuilder<'_, F> {
		RouteBuilder::new(self, pattern, handler)
	}

	fn add_route(
		&self,
		pattern: &str,
		handler: Handler,
		options: RouteOptions,
	) -> Result<(ArcStr, QoS, bool), MqttClientError> {
		let route = Route::new(handler, options.payload_format());
		let canonical = {
			let mut resolver = lock(&self.shared.resolver);
			match options.kind() {
				| RouteKind::Primary => resolver.register(pattern, route)?,
				| RouteKind::Fallback => resolver.register_fallback(pattern, route)?,
			}
		};
		let qos = options.qos.unwrap_or(self.shared.default_qos);
		let subscribe_now =
			self.shared.upsert_subscription(canonical.clone(), qos);
		info!(
			pattern = %pattern,
			canonical = %canonical,
			qos = ?qos,
			fallback = options.fallback,
			"Route registered"
		);
		Ok((canonical, qos, subscribe_now))
	}

	pub async fn publish<T>(
		&self,
		topic: &str,
		data: &T,
		qos: QoS,
	) -> Result<(), MqttClientError>
	where
		F: MessageSerializer<T>,
	{
		validate_publish_topic(topic)?;
		let payload = self.encode(data)?;
		self.client
			.publish(topic, qos, false, payload)
			.await
			.map_err(MqttClientError::from)
	}

	/// Non-suspending publish, usable from synchronous handlers.
	pub fn try_publish<T>(
		&self,
		topic: &str,
		data: &T,
		qos: QoS,
	) -> Result<(), MqttClientError>
	where
		F: MessageSerializer<T>,
	{
		validate_publish_topic(topic)?;
		let payload = self.encode(data)?;
		self.client
			.try_publish(topic, qos, false, payload)
			.map_err(MqttClientError::from)
	}

	pub fn get_publisher<T>(
		&self,
		topic: impl Into<ArcStr>,
	) -> Result<MqttPublisher<T, F>, MqttClientError>
	where
		F: MessageSerializer<T>,
	{
		let topic = topic.into();
		validate_publish_topic(topic.as_str())?;
		Ok(MqttPublisher::new(
			self.client.clone(),
			self.serializer.clone(),
			topic,
		))
	}

	fn encode<T>(&self, data: &T) -> Result<Vec<u8>, MqttClientError>
	where F: MessageSerializer<T> {
		self.serializer
			.serialize(data)
			.map_err(|e| MqttClientError::Serialization(Box::new(e)))
	}

	/// Asks the connection loop to disconnect and return.
	///
	/// Safe to call from handlers and more than once.
	pub fn stop(&self) {
		if self.shared.stop_tx.send_replace(true) {
			return;
		}
		info!("Stop requested");
		if let Err(err) = self.client.try_disconnect() {
			debug!(error = %err, "Disconnect request not queued");
		}
	}

	pub fn state(&self) -> ConnectionState {
		self.shared.state()
	}

	/// Whether the dispatch consumer is accepting deliveries
	pub fn ready(&self) -> bool {
		self.shared.dispatch.is_ready()
	}

	/// Whether the connection loop is active
	pub fn running(&self) -> bool {
		self.shared.running.load(Ordering::Acquire)
	}

	/// Snapshot of transport subscriptions in registration order
	pub fn subscriptions(&self) -> Vec<Subscription> {
		lock(&self.shared.registry).subscriptions.clone()
	}

	/// Registered route patterns, with parameter names
	pub fn patterns(&self) -> Vec<String> {
		lock(&self.shared.resolver).patterns()
	}

	/// The underlying rumqttc client
	pub fn transport(&self) -> &AsyncClient {
		&self.client
	}

	#[cfg(test)]
	pub(crate) fn shared(&self) -> &Arc<ClientShared> {
		&self.shared
	}
}

pub(crate) fn subscribe_filters(
	subscriptions: &[Subscription],
) -> Vec<SubscribeFilter> {
	subscriptions.iter().map(Subscription::filter).collect()
}

/// Queues a subscribe without waiting. A full request channel hands the
/// filters to a task that waits for room; the event loop never waits on its
/// own channel.
pub(crate) fn request_subscriptions(
	client: &AsyncClient,
	filters: Vec<SubscribeFilter>,
) {
	let Err(err) = client.try_subscribe_many(filters.clone()) else {
		return;
	};
	let Ok(runtime) = Handle::try_current() else {
		warn!(
			error = %err,
			"Subscribe request not queued, deferred to the next connect"
		);
		return;
	};
	warn!(
		error = %err,
		filters = filters.len(),
		"Request channel full, deferring subscriptions"
	);
	let client = client.clone();
	runtime.spawn(async move {
		match client.subscribe_many(filters).await {
			| Ok(()) => debug!("Deferred subscriptions requested"),
			| Err(err) => error!(error = %err, "Failed to request subscriptions"),
		}
	});
}

fn validate_publish_topic(topic: &str) -> Result<(), MqttClientError> {
	let reason = if topic.is_empty() || topic.len() > 65535 {
		"Topic is empty or too long"
	} else if topic.chars().any(|c| matches!(c, '\0' | '#' | '+')) {
		"Topic contains illegal characters ('#', '+', or null byte)"
	} else {
		return Ok(());
	};
	Err(MqttClientError::InvalidPublishTopic {
		topic: topic.to_string(),
		reason,
	})
}

#[cfg(test)]
#[path = "async_client_tests.rs"]
mod tests;
