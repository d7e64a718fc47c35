//! Configuration for MQTT client initialization

use std::time::Duration;

use rand::Rng;
use rumqttc::{MqttOptions, OptionError, QoS};

/// Reconnect backoff parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
	/// First delay after a failure
	pub base: Duration,
	/// Upper bound for any delay
	pub cap: Duration,
	/// Largest random jitter added on each doubling (zero disables jitter)
	pub max_jitter: Duration,
}

impl Default for ReconnectConfig {
	fn default() -> Self {
		Self {
			base: Duration::from_secs(1),
			cap: Duration::from_secs(60),
			max_jitter: Duration::from_secs(1),
		}
	}
}

/// Client-level behavior settings
#[derive(Debug, Clone)]
pub struct ClientSettings {
	/// Number of concrete topics whose lookup results are memoized
	/// (0 disables memoization)
	pub lookup_cache_size: usize,
	/// Capacity of the request channel between client and event loop
	pub event_loop_capacity: usize,
	/// QoS used for routes registered without an explicit one
	pub default_qos: QoS,
	/// Transport reconnect backoff
	pub reconnect: ReconnectConfig,
}

impl Default for ClientSettings {
	fn default() -> Self {
		Self {
			lookup_cache_size: 256,
			event_loop_capacity: 10,
			default_qos: QoS::AtMostOnce,
			reconnect: ReconnectConfig::default(),
		}
	}
}

/// Configuration for MQTT client creation
#[derive(Debug, Clone)]
pub struct MqttClientConfig {
	/// Underlying MQTT connection options (from rumqttc)
	pub connection: MqttOptions,
	/// Client-level behavior settings
	pub settings: ClientSettings,
}

impl MqttClientConfig {
	/// Create new config with common defaults
	///
	/// # Example
	/// ```rust
	/// use mqtt_router::MqttClientConfig;
	///
	/// let config = MqttClientConfig::new("my_client", "broker.hivemq.com", 1883);
	/// ```
	pub fn new(client_id: &str, host: &str, port: u16) -> Self {
		Self {
			connection: MqttOptions::new(client_id, host, port),
			settings: ClientSettings::default(),
		}
	}

	/// Parse configuration from URL string
	///
	/// Supports URLs with protocols: tcp://, mqtt://, ssl://, mqtts://, ws://, wss://
	///
	/// # Example
	/// ```rust
	/// use mqtt_router::MqttClientConfig;
	///
	/// let config = MqttClientConfig::from_url("mqtt://broker.hivemq.com:1883?client_id=my_client")?;
	/// # Ok::<(), rumqttc::OptionError>(())
	/// ```
	pub fn from_url(url: &str) -> Result<Self, OptionError> {
		Ok(Self {
			connection: MqttOptions::parse_url(url)?,
			settings: ClientSettings::default(),
		})
	}

	/// Convenience method for localhost development
	pub fn localhost(client_id: &str) -> Self {
		Self::new(client_id, "localhost", 1883)
	}

	pub fn with_settings(mut self, settings: ClientSettings) -> Self {
		self.settings = settings;
		self
	}
}

/// Client id made of the local host name and a random suffix, e.g.
/// `gateway-3fa9c2d1`.
pub fn generate_client_id() -> String {
	let host = std::env::var("HOSTNAME")
		.ok()
		.filter(|name| !name.is_empty())
		.unwrap_or_else(|| "mqtt-router".to_string());
	let suffix: u32 = rand::rng().random();
	format!("{host}-{suffix:08x}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = MqttClientConfig::localhost("unit");

		assert_eq!(config.connection.broker_address(), ("localhost".to_string(), 1883));
		assert_eq!(config.settings.lookup_cache_size, 256);
		assert_eq!(config.settings.default_qos, QoS::AtMostOnce);
		assert_eq!(config.settings.reconnect.base, Duration::from_secs(1));
		assert_eq!(config.settings.reconnect.cap, Duration::from_secs(60));
	}

	#[test]
	fn test_from_url() {
		let config =
			MqttClientConfig::from_url("mqtt://example.com:1884?client_id=router")
				.unwrap();

		assert_eq!(config.connection.client_id(), "router");
		assert_eq!(config.connection.broker_address(), ("example.com".to_string(), 1884));
	}

	#[test]
	fn test_from_url_requires_client_id() {
		assert!(MqttClientConfig::from_url("mqtt://example.com:1883").is_err());
	}

	#[test]
	fn test_generated_client_ids_differ() {
		let first = generate_client_id();
		let second = generate_client_id();

		assert_ne!(first, second);
		assert!(first.len() > 9);
		assert!(first.rsplit('-').next().unwrap().chars().all(|c| c.is_ascii_hexdigit()));
	}
}
