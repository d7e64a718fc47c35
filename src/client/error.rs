use rumqttc::{ClientError, OptionError};
use thiserror::Error;

use crate::topic::{TopicError, TopicPatternError, TopicTrieError};

/// Errors that can occur in MQTT client operations
#[derive(Debug, Error)]
pub enum MqttClientError {
	/// Request could not be handed to the rumqttc event loop
	#[error("Connection error: {0}")]
	Connection(#[from] ClientError),
	/// Configuration errors when parsing MQTT options
	#[error("Configuration error: {0}")]
	Configuration(#[from] OptionError),
	/// Invalid configuration parameter values
	#[error("Invalid configuration value: {0}")]
	ConfigurationValue(String),
	/// Payload could not be encoded
	#[error("Serialization error: {0}")]
	Serialization(#[source] Box<dyn std::error::Error + Send + Sync>),
	/// Route pattern or inbound topic rejected
	#[error("Topic error: {0}")]
	Topic(#[from] TopicError),
	/// Topic not usable for publishing
	#[error("Invalid publish topic '{topic}': {reason}")]
	InvalidPublishTopic {
		/// Offending topic
		topic: String,
		/// What is wrong with it
		reason: &'static str,
	},
}

impl From<TopicPatternError> for MqttClientError {
	fn from(err: TopicPatternError) -> Self {
		MqttClientError::Topic(TopicError::from(err))
	}
}

impl From<TopicTrieError> for MqttClientError {
	fn from(err: TopicTrieError) -> Self {
		MqttClientError::Topic(TopicError::from(err))
	}
}
