use super::filter::{TopicFilter, TopicFilterError};
use super::path::TopicPath;

// Helper to test a filter against a list of topics
fn assert_matches(filter: &str, cases: &[(&str, bool)]) {
	let parsed = TopicFilter::parse(filter).unwrap();
	for (topic, expected) in cases {
		let path = TopicPath::new(*topic);
		assert_eq!(
			parsed.matches(&path),
			*expected,
			"filter '{}' against topic '{}'",
			filter,
			topic
		);
	}
}

#[test]
fn exact_filters() {
	assert_matches("sensors/temperature", &[
		("sensors/temperature", true),
		("sensors/humidity", false),
		("sensors/temperature/indoor", false),
		("sensors", false),
	]);
}

#[test]
fn single_level_wildcards() {
	assert_matches("sensors/+/reading", &[
		("sensors/temperature/reading", true),
		("sensors/humidity/reading", true),
		("sensors/temperature/value", false),
		("sensors/reading", false),
		("sensors/a/b/reading", false),
	]);
	assert_matches("home/+", &[
		("home/kitchen", true),
		("home/kitchen/temp", false),
		("home", false),
	]);
}

#[test]
fn multi_level_wildcards() {
	assert_matches("sensors/#", &[
		("sensors/temperature", true),
		("sensors/a/b/c", true),
		// parent level is covered by the multi-level wildcard
		("sensors", true),
		("devices/light", false),
	]);
	assert_matches("#", &[
		("anything", true),
		("a/b/c", true),
	]);
}

#[test]
fn mixed_wildcards() {
	assert_matches("home/+/sensors/#", &[
		("home/kitchen/sensors/temp", true),
		("home/kitchen/sensors/temp/raw", true),
		("home/kitchen/sensors", true),
		("home/kitchen/lights", false),
	]);
}

#[test]
fn empty_segments_are_literal() {
	assert_matches("home//temp", &[
		("home//temp", true),
		("home/x/temp", false),
	]);
}

#[test]
fn invalid_filters() {
	assert_eq!(
		TopicFilter::parse("").unwrap_err(),
		TopicFilterError::Empty
	);
	assert_eq!(
		TopicFilter::parse("   ").unwrap_err(),
		TopicFilterError::Empty
	);
	assert!(matches!(
		TopicFilter::parse("a/#/b").unwrap_err(),
		TopicFilterError::HashPosition { .. }
	));
	assert!(matches!(
		TopicFilter::parse("a/b+").unwrap_err(),
		TopicFilterError::WildcardUsage { .. }
	));
	assert!(matches!(
		TopicFilter::parse("a/#c").unwrap_err(),
		TopicFilterError::WildcardUsage { .. }
	));
}

#[test]
fn pattern_preserves_original_string() {
	let filter = TopicFilter::parse("home/+/sensors/#").unwrap();
	assert_eq!(filter.pattern(), "home/+/sensors/#");
	assert_eq!(filter.to_string(), "home/+/sensors/#");
}
