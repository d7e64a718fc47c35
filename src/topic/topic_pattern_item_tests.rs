//! Tests for TopicPatternItem functionality

use arcstr::Substr;

use super::{TopicPatternError, TopicPatternItem};

fn parse(segment: &str) -> Result<TopicPatternItem, TopicPatternError> {
	TopicPatternItem::try_from(Substr::from(segment))
}

#[test]
fn test_literal_string_item() {
	let item = parse("sensors").unwrap();

	assert_eq!(item, TopicPatternItem::Str(Substr::from("sensors")));
	assert_eq!(item.as_str(), "sensors");
	assert_eq!(item.as_template(), "sensors");
	assert_eq!(item.param_name(), None);
	assert!(!item.is_wildcard());
}

#[test]
fn test_empty_literal_is_allowed() {
	let item = parse("").unwrap();
	assert_eq!(item, TopicPatternItem::Str(Substr::from("")));
}

#[test]
fn test_anonymous_plus_wildcard() {
	let item = parse("+").unwrap();

	assert_eq!(item, TopicPatternItem::Plus(None));
	assert_eq!(item.as_str(), "+");
	assert_eq!(item.as_template(), "+");
	assert_eq!(item.param_name(), None);
	assert!(item.is_wildcard());
}

#[test]
fn test_hash_wildcard() {
	let item = parse("#").unwrap();

	assert_eq!(item, TopicPatternItem::Hash);
	assert_eq!(item.as_str(), "#");
	assert_eq!(item.as_template(), "#");
	assert!(item.is_wildcard());
}

#[test]
fn test_named_plus_wildcard() {
	let item = parse("+sensor_id+").unwrap();

	if let TopicPatternItem::Plus(Some(name)) = &item {
		assert_eq!(name.as_str(), "sensor_id");
	} else {
		panic!("Expected Plus with Some name");
	}

	assert_eq!(item.as_str(), "+");
	assert_eq!(item.as_template(), "+sensor_id+");
	assert_eq!(item.param_name().unwrap().as_str(), "sensor_id");
	assert_eq!(item.to_string(), "+sensor_id+");
}

#[test]
fn test_single_character_name() {
	let item = parse("+x+").unwrap();
	assert_eq!(item.param_name().unwrap().as_str(), "x");
}

#[test]
fn test_double_plus_is_invalid() {
	let result = parse("++");
	assert_eq!(result, Err(TopicPatternError::wildcard_usage("++")));
}

#[test]
fn test_unterminated_name_is_invalid() {
	assert!(matches!(
		parse("+room"),
		Err(TopicPatternError::WildcardUsage { .. })
	));
	assert!(matches!(
		parse("room+"),
		Err(TopicPatternError::WildcardUsage { .. })
	));
}

#[test]
fn test_wildcard_inside_name_is_invalid() {
	assert!(parse("+ro+om+").is_err());
	assert!(parse("+ro#om+").is_err());
}

#[test]
fn test_embedded_wildcards_are_invalid() {
	for segment in ["sensor#", "#all", "a+b", "temp+", "##"] {
		let result = parse(segment);
		assert!(
			matches!(result, Err(TopicPatternError::WildcardUsage { .. })),
			"segment '{segment}' should be rejected, got {result:?}"
		);
	}
}

#[test]
fn test_unicode_literal() {
	let item = parse("température").unwrap();
	assert_eq!(item.as_str(), "température");
}
