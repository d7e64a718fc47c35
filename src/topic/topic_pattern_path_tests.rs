//! Tests for TopicPatternPath functionality

use super::limits::{MAX_SEGMENT_LENGTH, MAX_TOPIC_DEPTH};
use super::{TopicPatternError, TopicPatternItem, TopicPatternPath};

fn create_pattern(pattern: &str) -> TopicPatternPath {
	TopicPatternPath::new_from_string(pattern).expect("Pattern should be valid")
}

#[test]
fn test_simple_string_pattern() {
	let pattern = create_pattern("sensors/temperature/room1");

	assert_eq!(pattern.len(), 3);
	assert_eq!(pattern.mqtt_pattern(), "sensors/temperature/room1");
	assert_eq!(pattern.topic_pattern(), "sensors/temperature/room1");
	assert!(!pattern.contains_hash());
	assert!(pattern.iter().all(|s| !s.is_wildcard()));
}

#[test]
fn test_named_wildcards_are_canonicalized() {
	let pattern = create_pattern("weather/+channel+/wflrealtime.txt");

	assert_eq!(pattern.mqtt_pattern(), "weather/+/wflrealtime.txt");
	assert_eq!(pattern.topic_pattern(), "weather/+channel+/wflrealtime.txt");
	assert_eq!(pattern.to_string(), "weather/+channel+/wflrealtime.txt");
	let names: Vec<_> = pattern.param_names().map(|n| n.as_str()).collect();
	assert_eq!(names, vec!["channel"]);
}

#[test]
fn test_mixed_named_and_anonymous_wildcards() {
	let pattern = create_pattern("bus/+vehicle+/+/+boat+/#");

	assert_eq!(pattern.mqtt_pattern(), "bus/+/+/+/#");
	assert!(pattern.contains_hash());
	let names: Vec<_> = pattern.param_names().map(|n| n.as_str()).collect();
	assert_eq!(names, vec!["vehicle", "boat"]);
}

#[test]
fn test_pattern_with_hash_only() {
	let pattern = create_pattern("#");

	assert_eq!(pattern.len(), 1);
	assert_eq!(pattern.slice(), &[TopicPatternItem::Hash]);
	assert_eq!(pattern.mqtt_pattern(), "#");
}

#[test]
fn test_empty_string() {
	assert_eq!(
		TopicPatternPath::new_from_string(""),
		Err(TopicPatternError::EmptyTopic)
	);
}

#[test]
fn test_whitespace_is_a_literal_segment() {
	let pattern = create_pattern(" ");

	assert_eq!(pattern.len(), 1);
	assert_eq!(pattern.mqtt_pattern(), " ");

	let padded = create_pattern("a/ b /+");
	assert_eq!(padded.slice()[1].as_str(), " b ");
}

#[test]
fn test_consecutive_separators() {
	let pattern = create_pattern("a//b");

	assert_eq!(pattern.len(), 3);
	assert_eq!(pattern.slice()[1].as_str(), "");
}

#[test]
fn test_starting_and_ending_with_separator() {
	assert_eq!(create_pattern("/a").len(), 2);
	assert_eq!(create_pattern("a/").len(), 2);
}

#[test]
fn test_invalid_hash_wildcard_position() {
	let result = TopicPatternPath::new_from_string("sensors/#/temperature");

	assert_eq!(
		result,
		Err(TopicPatternError::hash_position("sensors/#/temperature"))
	);
}

#[test]
fn test_duplicate_parameter_names() {
	let result = TopicPatternPath::new_from_string("a/+id+/b/+id+");

	assert_eq!(
		result,
		Err(TopicPatternError::duplicate_parameter("id", "a/+id+/b/+id+"))
	);
}

#[test]
fn test_invalid_segment_propagates() {
	let result = TopicPatternPath::new_from_string("a/b+c/d");

	assert_eq!(result, Err(TopicPatternError::wildcard_usage("b+c")));
}

#[test]
fn test_depth_limit() {
	let deep = vec!["x"; MAX_TOPIC_DEPTH + 1].join("/");
	assert!(matches!(
		TopicPatternPath::new_from_string(deep),
		Err(TopicPatternError::LimitExceeded { .. })
	));

	let at_limit = vec!["x"; MAX_TOPIC_DEPTH].join("/");
	assert_eq!(create_pattern(&at_limit).len(), MAX_TOPIC_DEPTH);
}

#[test]
fn test_segment_length_limit() {
	let long_segment = "s".repeat(MAX_SEGMENT_LENGTH + 1);
	let result = TopicPatternPath::new_from_string(format!("a/{long_segment}"));

	assert!(matches!(result, Err(TopicPatternError::LimitExceeded { .. })));
}

#[test]
fn test_try_from_variants() {
	let from_str = TopicPatternPath::try_from("a/+b+").unwrap();
	let from_string = TopicPatternPath::try_from("a/+b+".to_string()).unwrap();
	let from_arcstr =
		TopicPatternPath::try_from(arcstr::ArcStr::from("a/+b+")).unwrap();

	assert_eq!(from_str, from_string);
	assert_eq!(from_string, from_arcstr);
}
