//! MQTT client module
//!
//! Route registration, publishing and the shared state the connection loop
//! works against.

/// Client handle and route registration
pub mod async_client;
pub mod config;
/// Client error types
pub mod error;
/// Fixed-topic publishers
pub mod publisher;
pub mod reconnect;
/// Fluent route registration
pub mod subscription_builder;

// Re-export commonly used types for convenience
pub use async_client::{ConnectionState, MqttClient, RouteOptions, Subscription};
pub use config::{ClientSettings, MqttClientConfig, ReconnectConfig, generate_client_id};
pub use error::MqttClientError;
pub use publisher::MqttPublisher;
pub use reconnect::ReconnectPolicy;
pub use subscription_builder::RouteBuilder;
