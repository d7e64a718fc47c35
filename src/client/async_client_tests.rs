use arcstr::ArcStr;
use bytes::Bytes;
use rumqttc::QoS;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

use super::{ConnectionState, MqttClient, RouteOptions, Subscription};
use crate::client::config::{ClientSettings, MqttClientConfig};
use crate::client::error::MqttClientError;
use crate::connection::MqttConnection;
use crate::message::Payload;
use crate::message_serializer::JsonSerializer;
use crate::routing::{DispatchController, Handler};
use crate::topic::{TopicError, TopicPatternError};

type Seen = UnboundedReceiver<(String, String, Option<String>)>;

fn new_client() -> (MqttClient<JsonSerializer>, MqttConnection) {
	MqttClient::new(MqttClientConfig::localhost("unit-test")).unwrap()
}

// Handler reporting (label, topic, "room" parameter) for every delivery.
fn reporting(label: &'static str) -> (Handler, Seen) {
	let (tx, rx) = unbounded_channel();
	let handler = Handler::sync(move |topic, _message, parameters| {
		tx.send((
			label.to_string(),
			topic.to_string(),
			parameters.get("room").map(str::to_string),
		))?;
		Ok(())
	});
	(handler, rx)
}

fn start_consumer(connection: MqttConnection) -> DispatchController {
	connection.into_runner().spawn()
}

fn drain(seen: &mut Seen) -> Vec<(String, String, Option<String>)> {
	let mut items = Vec::new();
	while let Ok(item) = seen.try_recv() {
		items.push(item);
	}
	items
}

#[test]
fn test_register_returns_canonical_and_records_subscription() {
	let (client, _connection) = new_client();
	let (handler, _seen) = reporting("temp");

	let canonical = client
		.register("home/+room+/temp", handler, RouteOptions::default())
		.unwrap();

	assert_eq!(canonical, "home/+/temp");
	assert_eq!(
		client.subscriptions(),
		vec![Subscription {
			pattern: ArcStr::from("home/+/temp"),
			qos: QoS::AtMostOnce,
		}]
	);
	assert_eq!(client.patterns(), vec!["home/+room+/temp"]);
}

#[test]
fn test_reregistering_updates_qos_instead_of_duplicating() {
	let (client, _connection) = new_client();
	let (first, _) = reporting("first");
	let (second, _) = reporting("second");

	client
		.register("sensors/+id+", first, RouteOptions::default())
		.unwrap();
	client
		.route("sensors/+id+", second)
		.qos(QoS::ExactlyOnce)
		.register()
		.unwrap();

	let subscriptions = client.subscriptions();
	assert_eq!(subscriptions.len(), 1);
	assert_eq!(subscriptions[0].qos, QoS::ExactlyOnce);
}

#[test]
fn test_invalid_pattern_is_rejected() {
	let (client, _connection) = new_client();
	let (handler, _) = reporting("bad");

	let err = client
		.register("a/#/b", handler, RouteOptions::default())
		.unwrap_err();

	assert!(matches!(
		err,
		MqttClientError::Topic(TopicError::Pattern(
			TopicPatternError::HashPosition { .. }
		))
	));
	assert!(client.subscriptions().is_empty());
}

#[test]
fn test_initial_state() {
	let (client, _connection) = new_client();

	assert_eq!(client.state(), ConnectionState::Disconnected);
	assert!(!client.running());
	assert!(!client.ready());
}

#[test]
fn test_zero_event_loop_capacity_is_rejected() {
	let config = MqttClientConfig::localhost("unit-test").with_settings(
		ClientSettings {
			event_loop_capacity: 0,
			..ClientSettings::default()
		},
	);

	let result = MqttClient::<JsonSerializer>::new(config);

	assert!(matches!(result, Err(MqttClientError::ConfigurationValue(_))));
}

#[tokio::test]
async fn test_messages_before_consumer_start_are_dropped() {
	let (client, connection) = new_client();
	let (handler, mut seen) = reporting("temp");
	client
		.register("home/+room+/temp", handler, RouteOptions {
			raw_payload: true,
			..RouteOptions::default()
		})
		.unwrap();

	let queued = client
		.shared()
		.deliver("home/kitchen/temp", Bytes::from_static(b"21"));
	assert_eq!(queued, 0);

	let controller = start_consumer(connection);
	client.shared().dispatch.wait_ready().await;
	assert!(client.ready());
	let queued = client
		.shared()
		.deliver("home/hall/temp", Bytes::from_static(b"19"));
	assert_eq!(queued, 1);

	assert_eq!(
		seen.recv().await.unwrap(),
		(
			"temp".to_string(),
			"home/hall/temp".to_string(),
			Some("hall".to_string())
		)
	);
	let stats = controller.shutdown().await.unwrap();
	assert_eq!(stats.completed, 1);
	assert!(drain(&mut seen).is_empty());
}

#[tokio::test]
async fn test_inbound_message_reaches_every_matching_route_in_order() {
	let (client, connection) = new_client();
	let (tx, mut seen) = unbounded_channel();
	let labelled = |label: &'static str| {
		let tx = tx.clone();
		Handler::sync(move |_topic, message, _parameters| {
			let text = match message.payload {
				| Payload::Json(value) => value.to_string(),
				| Payload::Raw(bytes) => format!("raw:{}", bytes.len()),
			};
			tx.send(format!("{label}={text}"))?;
			Ok(())
		})
	};

	client
		.register("home/kitchen/temp", labelled("exact"), RouteOptions::default())
		.unwrap();
	client
		.route("home/+room+/temp", labelled("room"))
		.raw_payload(true)
		.register()
		.unwrap();
	client
		.route("#", labelled("fallback"))
		.fallback(true)
		.register()
		.unwrap();

	let controller = start_consumer(connection);
	client.shared().dispatch.wait_ready().await;
	assert_eq!(
		client
			.shared()
			.deliver("home/kitchen/temp", Bytes::from_static(b"21.5")),
		2
	);
	assert_eq!(
		client
			.shared()
			.deliver("garage/door", Bytes::from_static(b"\"open\"")),
		1
	);
	let mut received = Vec::new();
	for _ in 0..3 {
		received.push(seen.recv().await.unwrap());
	}
	controller.shutdown().await.unwrap();

	assert_eq!(received, vec![
		"exact=21.5".to_string(),
		"room=raw:4".to_string(),
		"fallback=\"open\"".to_string(),
	]);
}

#[tokio::test]
async fn test_runtime_registration_is_visible_to_next_message() {
	let (client, connection) = new_client();
	let (known, _) = reporting("known");
	client
		.register("known/topic", known, RouteOptions::default())
		.unwrap();
	let controller = start_consumer(connection);
	client.shared().dispatch.wait_ready().await;

	assert_eq!(
		client.shared().deliver("late/topic", Bytes::from_static(b"1")),
		0
	);

	let (late, mut seen) = reporting("late");
	client
		.add_subscription("late/+", late, RouteOptions::default())
		.await
		.unwrap();

	assert_eq!(
		client.shared().deliver("late/topic", Bytes::from_static(b"1")),
		1
	);
	let (_, topic, _) = seen.recv().await.unwrap();
	assert_eq!(topic, "late/topic");
	controller.shutdown().await.unwrap();
}

#[test]
fn test_registration_while_connected_subscribes_immediately() {
	let (client, _connection) = new_client();
	client.shared().mark_connected();
	let (handler, _) = reporting("live");

	let canonical = client
		.register("live/+id+", handler, RouteOptions::default())
		.unwrap();

	assert_eq!(canonical, "live/+");
	assert_eq!(client.state(), ConnectionState::Connected);
	assert_eq!(client.subscriptions().len(), 1);
}

#[test]
fn test_registration_with_full_request_channel_still_succeeds() {
	let config = MqttClientConfig::localhost("unit-test").with_settings(
		ClientSettings {
			event_loop_capacity: 1,
			..ClientSettings::default()
		},
	);
	let (client, _connection) =
		MqttClient::<JsonSerializer>::new(config).unwrap();
	client.shared().mark_connected();
	client
		.try_publish("status", &"online".to_string(), QoS::AtMostOnce)
		.unwrap();
	let (handler, _) = reporting("live");

	let canonical = client
		.register("live/+id+", handler, RouteOptions::default())
		.unwrap();

	assert_eq!(canonical, "live/+");
	assert_eq!(client.subscriptions().len(), 1);
	assert_eq!(client.patterns(), vec!["live/+id+"]);
}

#[test]
fn test_publish_topic_validation() {
	let (client, _connection) = new_client();
	let reading = serde_json::json!({"temp": 21.5});

	for topic in ["", "a/+", "a/#", "a/\0"] {
		let err = client
			.try_publish(topic, &reading, QoS::AtMostOnce)
			.unwrap_err();
		assert!(
			matches!(err, MqttClientError::InvalidPublishTopic { .. }),
			"topic {topic:?} should be rejected, got {err:?}"
		);
	}
	assert!(
		client
			.try_publish("home/kitchen/temp", &reading, QoS::AtMostOnce)
			.is_ok()
	);
}

#[test]
fn test_get_publisher() {
	let (client, _connection) = new_client();

	assert!(client.get_publisher::<u32>("a/#").is_err());

	let publisher = client
		.get_publisher::<u32>("counters/total")
		.unwrap()
		.with_qos(QoS::AtLeastOnce)
		.with_retain(true);
	assert_eq!(publisher.topic(), "counters/total");
	assert_eq!(publisher.qos(), QoS::AtLeastOnce);
	assert!(publisher.retain());
	assert!(publisher.try_publish(&7).is_ok());
}

#[test]
fn test_stop_is_idempotent() {
	let (client, _connection) = new_client();
	let mut stop = client.shared().stop_signal();

	client.stop();
	client.stop();

	assert!(*stop.borrow_and_update());
}
