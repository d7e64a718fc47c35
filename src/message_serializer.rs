//! Payload encoders used on the publishing side.

use std::error::Error;

use bincode::{Decode, Encode};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Converts outgoing values to payload bytes and back.
pub trait MessageSerializer<T>: Default + Clone + Send + Sync + 'static {
	type SerializeError: Error + Send + Sync + 'static;
	type DeserializeError: Error + Send + Sync + 'static;

	fn serialize(&self, data: &T) -> Result<Vec<u8>, Self::SerializeError>;
	fn deserialize(&self, bytes: &[u8]) -> Result<T, Self::DeserializeError>;
}

/// JSON via serde; the format inbound routes decode by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl<T> MessageSerializer<T> for JsonSerializer
where T: Serialize + DeserializeOwned + 'static
{
	type SerializeError = serde_json::Error;
	type DeserializeError = serde_json::Error;

	fn serialize(&self, data: &T) -> Result<Vec<u8>, Self::SerializeError> {
		serde_json::to_vec(data)
	}

	fn deserialize(&self, bytes: &[u8]) -> Result<T, Self::DeserializeError> {
		serde_json::from_slice(bytes)
	}
}

#[derive(Clone, Default)]
pub struct BincodeSerializer {
	config: bincode::config::Configuration,
}

impl BincodeSerializer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_config(config: bincode::config::Configuration) -> Self {
		Self { config }
	}
}

impl<T> MessageSerializer<T> for BincodeSerializer
where T: Encode + Decode<()> + 'static
{
	type SerializeError = bincode::error::EncodeError;
	type DeserializeError = bincode::error::DecodeError;

	fn serialize(&self, data: &T) -> Result<Vec<u8>, Self::SerializeError> {
		bincode::encode_to_vec(data, self.config)
	}

	fn deserialize(&self, bytes: &[u8]) -> Result<T, Self::DeserializeError> {
		bincode::decode_from_slice(bytes, self.config).map(|(value, _)| value)
	}
}
