use arcstr::ArcStr;
use rumqttc::QoS;

use super::async_client::{MqttClient, RouteOptions};
use super::error::MqttClientError;
use crate::routing::Handler;

/// Fluent route registration, started with [`MqttClient::route`].
///
/// ```rust,no_run
/// # use mqtt_router::{Handler, MqttClient, MqttClientConfig, QoS};
/// # let (client, _connection) =
/// #     MqttClient::<mqtt_router::JsonSerializer>::new(MqttClientConfig::localhost("doc"))?;
/// let canonical = client
/// 	.route("weather/+channel+/wflrealtime.txt", Handler::sync(|_, message, _| {
/// 		println!("{}", message.payload.text());
/// 		Ok(())
/// 	}))
/// 	.qos(QoS::AtLeastOnce)
/// 	.raw_payload(true)
/// 	.register()?;
/// assert_eq!(canonical, "weather/+/wflrealtime.txt");
/// # Ok::<(), mqtt_router::MqttClientError>(())
/// ```
#[must_use = "a route is only added once `register` or `subscribe` is called"]
pub struct RouteBuilder<'a, F> {
	client: &'a MqttClient<F>,
	pattern: String,
	handler: Handler,
	options: RouteOptions,
}

impl<'a, F> RouteBuilder<'a, F>
where F: Default + Clone + Send + Sync + 'static
{
	pub(crate) fn new(
		client: &'a MqttClient<F>,
		pattern: &str,
		handler: Handler,
	) -> Self {
		Self {
			client,
			pattern: pattern.to_string(),
			handler,
			options: RouteOptions::default(),
		}
	}

	pub fn qos(self, qos: QoS) -> Self {
		Self {
			options: RouteOptions {
				qos: Some(qos),
				..self.options
			},
			..self
		}
	}

	pub fn raw_payload(self, raw_payload: bool) -> Self {
		Self {
			options: RouteOptions {
				raw_payload,
				..self.options
			},
			..self
		}
	}

	pub fn fallback(self, fallback: bool) -> Self {
		Self {
			options: RouteOptions {
				fallback,
				..self.options
			},
			..self
		}
	}

	pub fn options(&self) -> &RouteOptions {
		&self.options
	}

	/// See [`MqttClient::register`].
	pub fn register(self) -> Result<ArcStr, MqttClientError> {
		self.client
			.register(&self.pattern, self.handler, self.options)
	}

	/// See [`MqttClient::add_subscription`].
	pub async fn subscribe(self) -> Result<ArcStr, MqttClientError> {
		self.client
			.add_subscription(&self.pattern, self.handler, self.options)
			.await
	}
}
