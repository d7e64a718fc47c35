use std::time::Duration;

use rand::Rng;

use super::config::ReconnectConfig;

/// Exponential reconnect backoff with jitter.
///
/// The first failure waits `base`; each further failure waits
/// `min(cap, previous * 2 + jitter)`. [`reset`](Self::reset) is called after
/// a successful connect so the next outage starts from `base` again.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
	config: ReconnectConfig,
	previous: Option<Duration>,
	attempts: u32,
}

impl ReconnectPolicy {
	pub fn new(config: ReconnectConfig) -> Self {
		Self {
			config,
			previous: None,
			attempts: 0,
		}
	}

	/// Delay before the next attempt; advances the sequence.
	pub fn next_delay(&mut self) -> Duration {
		let delay = match self.previous {
			| None => self.config.base.min(self.config.cap),
			| Some(previous) => previous
				.saturating_mul(2)
				.saturating_add(self.jitter())
				.min(self.config.cap),
		};
		self.previous = Some(delay);
		self.attempts = self.attempts.saturating_add(1);
		delay
	}

	/// Sleeps for [`next_delay`](Self::next_delay) and returns the delay.
	pub async fn wait(&mut self) -> Duration {
		let delay = self.next_delay();
		tokio::time::sleep(delay).await;
		delay
	}

	pub fn reset(&mut self) {
		self.previous = None;
		self.attempts = 0;
	}

	/// Failed attempts since the last reset
	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	fn jitter(&self) -> Duration {
		let max = u64::try_from(self.config.max_jitter.as_millis()).unwrap_or(u64::MAX);
		if max == 0 {
			return Duration::ZERO;
		}
		Duration::from_millis(rand::rng().random_range(0..=max))
	}
}
