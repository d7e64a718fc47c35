//! Messages as handlers see them.

use std::borrow::Cow;

use arcstr::ArcStr;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Payload could not be decoded in the format the route asked for
#[derive(Debug, Error)]
#[error("Payload on '{topic}' is not valid JSON: {source}")]
pub struct PayloadError {
	/// Topic the payload arrived on
	pub topic: ArcStr,
	/// Underlying decoder error
	#[source]
	pub source: serde_json::Error,
}

/// How a route wants its payload handed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
	/// Parse the payload as JSON before invoking the handler
	#[default]
	Json,
	/// Pass the bytes through untouched
	Raw,
}

impl PayloadFormat {
	/// Builds the handler-facing message for `raw` in this format.
	pub fn decode(&self, raw: &InboundMessage) -> Result<MqttMessage, PayloadError> {
		let payload = match self {
			| PayloadFormat::Raw => Payload::Raw(raw.payload.clone()),
			| PayloadFormat::Json => {
				let value = serde_json::from_slice(&raw.payload).map_err(
					|source| PayloadError {
						topic: raw.topic.clone(),
						source,
					},
				)?;
				Payload::Json(value)
			}
		};
		Ok(MqttMessage {
			topic: raw.topic.clone(),
			payload,
		})
	}
}

/// Message exactly as delivered by the transport.
///
/// Shared by every route the topic matched; cloning only bumps reference
/// counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
	pub topic: ArcStr,
	pub payload: Bytes,
}

impl InboundMessage {
	pub fn new(topic: impl Into<ArcStr>, payload: impl Into<Bytes>) -> Self {
		Self {
			topic: topic.into(),
			payload: payload.into(),
		}
	}
}

/// Decoded payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
	/// Untouched bytes, for routes registered with a raw payload
	Raw(Bytes),
	/// Parsed JSON document
	Json(serde_json::Value),
}

impl Payload {
	/// Raw bytes, if the payload was not decoded
	pub fn as_bytes(&self) -> Option<&Bytes> {
		match self {
			| Payload::Raw(bytes) => Some(bytes),
			| Payload::Json(_) => None,
		}
	}

	/// Parsed document, if the payload was decoded
	pub fn as_json(&self) -> Option<&serde_json::Value> {
		match self {
			| Payload::Json(value) => Some(value),
			| Payload::Raw(_) => None,
		}
	}

	/// Payload as text; raw bytes are read as lossy UTF-8.
	pub fn text(&self) -> Cow<'_, str> {
		match self {
			| Payload::Raw(bytes) => String::from_utf8_lossy(bytes),
			| Payload::Json(value) => Cow::Owned(value.to_string()),
		}
	}
}

/// Message handed to a route's handler
#[derive(Debug, Clone, PartialEq)]
pub struct MqttMessage {
	pub topic: ArcStr,
	pub payload: Payload,
}

impl MqttMessage {
	/// Deserializes the payload into `T`, whichever form it arrived in.
	pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
		match &self.payload {
			| Payload::Json(value) => T::deserialize(value),
			| Payload::Raw(bytes) => serde_json::from_slice(bytes),
		}
	}
}
