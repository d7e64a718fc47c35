//! Error types and utilities for the topic module
//!
//! This module contains the composite error type and shared constants
//! for the entire topic module, while individual error types remain
//! in their respective modules.

use thiserror::Error;

use super::topic_pattern_item::TopicPatternError;
use super::topic_trie::TopicTrieError;

/// Comprehensive error type for all topic-related operations
///
/// Aggregates pattern parsing and trie errors into the single error type
/// the resolver hands back to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
	/// Topic pattern parsing or validation error
	#[error("Topic pattern error: {0}")]
	Pattern(#[from] TopicPatternError),

	/// Registration or matching error inside the trie
	#[error("Topic trie error: {0}")]
	Trie(#[from] TopicTrieError),
}

/// Convenient Result type for topic operations
pub type TopicResult<T> = Result<T, TopicError>;

/// Convenient Result type for pattern operations
pub type PatternResult<T> = Result<T, TopicPatternError>;

/// Convenient Result type for trie operations
pub type TrieResult<T> = Result<T, TopicTrieError>;

/// Topic processing limits and constants
///
/// Depth and segment limits bound registered patterns. Inbound topics are
/// only held to the protocol's own size limit, since a `#` route matches
/// whatever depth the broker delivers.
pub mod limits {
	/// Maximum pattern nesting depth allowed
	pub const MAX_TOPIC_DEPTH: usize = 32;

	/// Maximum length of a single pattern segment
	pub const MAX_SEGMENT_LENGTH: usize = 256;

	/// Largest topic name MQTT can encode (u16 length prefix)
	pub const MAX_MQTT_TOPIC_LENGTH: usize = 65535;
}

/// Validation utilities for topic operations
pub mod validation {
	use super::TopicTrieError;
	use super::limits::MAX_MQTT_TOPIC_LENGTH;

	/// Validates a concrete topic before it is matched against the trie.
	pub fn validate_topic_path(path: &str) -> Result<(), TopicTrieError> {
		if path.is_empty() {
			return Err(TopicTrieError::EmptyTopicPath);
		}

		if path.len() > MAX_MQTT_TOPIC_LENGTH {
			return Err(TopicTrieError::TopicTooLong {
				length: path.len(),
				max: MAX_MQTT_TOPIC_LENGTH,
			});
		}

		if let Some((index, segment)) = path
			.split('/')
			.enumerate()
			.find(|(_, segment)| segment.contains('\0'))
		{
			return Err(TopicTrieError::invalid_segment(
				format!("null-byte-in-{}", segment.replace('\0', "\\0")),
				index,
			));
		}

		Ok(())
	}
}
