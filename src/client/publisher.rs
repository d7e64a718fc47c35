use std::marker::PhantomData;

use arcstr::ArcStr;
use rumqttc::{AsyncClient, QoS};

use super::error::MqttClientError;
use crate::message_serializer::MessageSerializer;

/// Publisher bound to one topic and payload type
pub struct MqttPublisher<T, F> {
	client: AsyncClient,
	topic: ArcStr,
	qos: QoS,
	retain: bool,
	serializer: F,
	_phantom: PhantomData<fn(&T)>,
}

impl<T, F> MqttPublisher<T, F>
where F: MessageSerializer<T>
{
	pub(crate) fn new(client: AsyncClient, serializer: F, topic: ArcStr) -> Self {
		Self {
			client,
			topic,
			qos: QoS::AtLeastOnce,
			retain: false,
			serializer,
			_phantom: PhantomData,
		}
	}

	pub fn with_qos(mut self, qos: QoS) -> Self {
		self.qos = qos;
		self
	}

	pub fn with_retain(mut self, retain: bool) -> Self {
		self.retain = retain;
		self
	}

	pub fn topic(&self) -> &ArcStr {
		&self.topic
	}

	pub fn qos(&self) -> QoS {
		self.qos
	}

	pub fn retain(&self) -> bool {
		self.retain
	}

	pub async fn publish(&self, data: &T) -> Result<(), MqttClientError> {
		let payload = self.encode(data)?;
		self.client
			.publish(self.topic.as_str(), self.qos, self.retain, payload)
			.await
			.map_err(MqttClientError::from)
	}

	/// Non-suspending variant of [`publish`](Self::publish)
	pub fn try_publish(&self, data: &T) -> Result<(), MqttClientError> {
		let payload = self.encode(data)?;
		self.client
			.try_publish(self.topic.as_str(), self.qos, self.retain, payload)
			.map_err(MqttClientError::from)
	}

	fn encode(&self, data: &T) -> Result<Vec<u8>, MqttClientError> {
		self.serializer
			.serialize(data)
			.map_err(|e| MqttClientError::Serialization(Box::new(e)))
	}
}
