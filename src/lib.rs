//! # MQTT Router
//!
//! An MQTT client that routes inbound messages to handlers by topic pattern.
//!
//! ## Features
//!
//! - **Pattern routing**: MQTT wildcards (`+`, `#`) plus named wildcards
//!   (`+room+`) whose matched segment is handed to the handler
//! - **Deterministic fan-out**: every matching route fires, in the order its
//!   trie branch was created
//! - **Serialized dispatch**: handlers run one at a time on a single consumer,
//!   in arrival order, so they can own mutable state without locks
//! - **Runtime registration**: routes added while connected are subscribed
//!   immediately and visible to the next message
//! - **Reconnect with backoff**: exponential, jittered, capped, reset on
//!   every successful connect
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mqtt_router::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = MqttClientConfig::localhost(&generate_client_id());
//!     let (client, connection) = MqttClient::<JsonSerializer>::new(config)?;
//!
//!     let mut readings = 0u64;
//!     client
//!         .route(
//!             "home/+room+/temperature",
//!             Handler::sync(move |topic, message, parameters| {
//!                 readings += 1;
//!                 println!(
//!                     "#{readings} {topic} in {:?}: {}",
//!                     parameters.get("room"),
//!                     message.payload.text()
//!                 );
//!                 Ok(())
//!             }),
//!         )
//!         .qos(QoS::AtLeastOnce)
//!         .register()?;
//!
//!     let stopper = client.clone();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         stopper.stop();
//!     });
//!
//!     connection.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Pattern Matching
//!
//! - `+` matches exactly one topic level
//! - `+name+` matches one level and binds it as parameter `name`
//! - `#` matches all remaining levels, including none (`a/#` matches `a`)
//!
//! Named wildcards are stripped before subscribing, so the broker only ever
//! sees plain MQTT filters.

#![warn(missing_docs)]

// Core modules
#[allow(missing_docs)]
pub mod client;
#[allow(missing_docs)]
pub mod connection;
#[allow(missing_docs)]
pub mod message;
#[allow(missing_docs)]
pub mod message_serializer;
#[allow(missing_docs)]
pub mod routing;
#[allow(missing_docs)]
pub mod topic;

// === Core Public API ===
pub use client::{
	ClientSettings, ConnectionState, MqttClient, MqttClientConfig,
	MqttClientError, MqttPublisher, ReconnectConfig, RouteBuilder,
	RouteOptions, Subscription, generate_client_id,
};
pub use connection::MqttConnection;
pub use message::{MqttMessage, Payload};
pub use message_serializer::{BincodeSerializer, JsonSerializer, MessageSerializer};
pub use routing::{Handler, HandlerError, HandlerResult};
pub use topic::{TopicParameters, TopicPatternPath, TopicResolver, TopicTrie};

// Essential external types
pub use rumqttc::QoS;

/// Result type alias for operations that may fail with MqttClientError
pub type Result<T> = std::result::Result<T, MqttClientError>;

/// Prelude module for convenient imports
///
/// ```rust
/// use mqtt_router::prelude::*;
/// ```
pub mod prelude {
	//! Essential types for most MQTT applications

	pub use crate::{
		Handler, HandlerResult, JsonSerializer, MqttClient, MqttClientConfig,
		MqttClientError, MqttConnection, MqttMessage, Payload, QoS, Result,
		TopicParameters, generate_client_id,
	};
}

/// Error types used throughout the library
///
/// ```rust
/// use mqtt_router::errors::*;
/// ```
pub mod errors {
	//! All error types used in the library

	pub use crate::MqttClientError;
	pub use crate::message::PayloadError;
	pub use crate::routing::{DispatchError, HandlerError, HandlerFailure};
	pub use crate::topic::{TopicError, TopicPatternError, TopicTrieError};
}
