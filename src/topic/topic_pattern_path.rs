use std::collections::HashSet;
use std::convert::TryFrom;
use std::slice::Iter;

use arcstr::{ArcStr, Substr};

use super::error::limits::{MAX_SEGMENT_LENGTH, MAX_TOPIC_DEPTH};
use super::topic_pattern_item::{TopicPatternError, TopicPatternItem};

/// Parsed MQTT topic pattern with wildcard support.
///
/// Keeps the pattern as written (`sensors/+room+/#`) next to its canonical
/// form (`sensors/+/#`). Only the canonical form is ever sent to the broker;
/// parameter names are a local annotation used for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPatternPath {
	template_pattern: ArcStr, // pattern as registered "sensors/+room+/data"
	mqtt_topic_subscription: ArcStr, // wire pattern "sensors/+/data"
	segments: Vec<TopicPatternItem>,
}

impl TopicPatternPath {
	/// Parses and validates a topic pattern.
	pub fn new_from_string(
		topic_pattern: impl Into<ArcStr>,
	) -> Result<Self, TopicPatternError> {
		let topic_pattern = topic_pattern.into();
		if topic_pattern.is_empty() {
			return Err(TopicPatternError::EmptyTopic);
		}

		let segments = topic_pattern
			.split('/')
			.map(|s| {
				if s.len() > MAX_SEGMENT_LENGTH {
					return Err(TopicPatternError::limit_exceeded(
						topic_pattern.as_str(),
						format!(
							"segment longer than {MAX_SEGMENT_LENGTH} bytes"
						),
					));
				}
				TopicPatternItem::try_from(topic_pattern.substr_from(s))
			})
			.collect::<Result<Vec<_>, _>>()?;

		if segments.len() > MAX_TOPIC_DEPTH {
			return Err(TopicPatternError::limit_exceeded(
				topic_pattern.as_str(),
				format!(
					"{} segments > {MAX_TOPIC_DEPTH}",
					segments.len()
				),
			));
		}

		// Error on duplicate named parameters
		let mut seen_names = HashSet::new();
		for name in segments.iter().filter_map(TopicPatternItem::param_name) {
			if !seen_names.insert(name.as_str()) {
				return Err(TopicPatternError::duplicate_parameter(
					name.as_str(),
					topic_pattern.as_str(),
				));
			}
		}

		if let Some(hash_pos) = segments
			.iter()
			.position(|s| matches!(s, TopicPatternItem::Hash))
		{
			if hash_pos != segments.len() - 1 {
				return Err(TopicPatternError::hash_position(
					topic_pattern.as_str(),
				));
			}
		}

		Ok(Self {
			mqtt_topic_subscription: ArcStr::from(
				Self::to_mqtt_subscription_pattern(&segments),
			),
			template_pattern: topic_pattern,
			segments,
		})
	}

	/// Returns MQTT pattern with bare wildcards for broker subscription.
	pub fn mqtt_pattern(&self) -> ArcStr {
		self.mqtt_topic_subscription.clone()
	}

	/// Returns original pattern with named parameters.
	pub fn topic_pattern(&self) -> ArcStr {
		self.template_pattern.clone()
	}

	/// Returns true if pattern has no segments.
	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// Returns true if pattern ends with the multi-level wildcard (#).
	pub fn contains_hash(&self) -> bool {
		self.segments
			.last()
			.is_some_and(|s| matches!(s, TopicPatternItem::Hash))
	}

	/// Returns iterator over pattern segments.
	pub fn iter(&self) -> Iter<'_, TopicPatternItem> {
		self.segments.iter()
	}

	/// Returns number of segments in pattern.
	pub fn len(&self) -> usize {
		self.segments.len()
	}

	/// Returns pattern segments as slice.
	pub fn slice(&self) -> &[TopicPatternItem] {
		&self.segments
	}

	/// Names bound by this pattern, in segment order.
	pub fn param_names(&self) -> impl Iterator<Item = &Substr> {
		self.segments.iter().filter_map(TopicPatternItem::param_name)
	}

	fn str_len(segments: &[TopicPatternItem]) -> usize {
		if segments.is_empty() {
			return 0;
		}
		(segments.len() - 1) + // slashes count
		segments.iter().map(|s| s.as_str().len()).sum::<usize>()
	}

	fn to_mqtt_subscription_pattern(segments: &[TopicPatternItem]) -> String {
		let mut mqtt_topic = String::with_capacity(Self::str_len(segments));
		segments.iter().enumerate().for_each(|(i, segment)| {
			if i > 0 {
				mqtt_topic.push('/');
			}
			mqtt_topic.push_str(segment.as_str());
		});
		mqtt_topic
	}
}

impl std::fmt::Display for TopicPatternPath {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.template_pattern)
	}
}

impl TryFrom<String> for TopicPatternPath {
	type Error = TopicPatternError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new_from_string(value)
	}
}

impl TryFrom<&str> for TopicPatternPath {
	type Error = TopicPatternError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::new_from_string(value)
	}
}

impl TryFrom<ArcStr> for TopicPatternPath {
	type Error = TopicPatternError;

	fn try_from(value: ArcStr) -> Result<Self, Self::Error> {
		Self::new_from_string(value)
	}
}
