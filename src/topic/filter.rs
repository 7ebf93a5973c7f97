use std::fmt;

use arcstr::{ArcStr, Substr};
use thiserror::Error;

use super::path::TopicPath;

/// Errors that can occur when parsing a topic filter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicFilterError {
	/// Empty filter strings never match anything and are rejected
	#[error("topic filter cannot be empty")]
	Empty,

	/// Hash wildcard (#) used somewhere other than the last segment
	#[error(
		"invalid topic filter '{filter}': # wildcard can only be the last \
		 segment"
	)]
	HashPosition { filter: String },

	/// Wildcard characters mixed into a literal segment
	#[error("invalid wildcard usage in segment '{segment}'")]
	WildcardUsage { segment: String },
}

/// One segment of a parsed topic filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSegment {
	/// Exact segment match
	Literal(Substr),
	/// `+` wildcard, matches exactly one topic level
	SingleLevel,
	/// `#` wildcard, matches the remainder of the topic
	MultiLevel,
}

/// A parsed MQTT topic filter, possibly containing wildcard segments.
///
/// Matching follows the broker's wildcard semantics: `+` matches a single
/// level, `#` matches any number of remaining levels (including none) and
/// is only valid as the final segment.
#[derive(Debug, Clone)]
pub struct TopicFilter {
	filter: ArcStr,
	segments: Vec<FilterSegment>,
}

impl TopicFilter {
	/// Parse and validate a topic filter string.
	pub fn parse(
		filter: impl Into<ArcStr>,
	) -> Result<Self, TopicFilterError> {
		let filter = filter.into();
		if filter.trim().is_empty() {
			return Err(TopicFilterError::Empty);
		}

		let segments = filter
			.split('/')
			.map(|s| match s {
				| "+" => Ok(FilterSegment::SingleLevel),
				| "#" => Ok(FilterSegment::MultiLevel),
				| _ if s.contains(['+', '#']) => {
					Err(TopicFilterError::WildcardUsage {
						segment: s.to_string(),
					})
				}
				| _ => Ok(FilterSegment::Literal(filter.substr_from(s))),
			})
			.collect::<Result<Vec<_>, _>>()?;

		if let Some(pos) = segments
			.iter()
			.position(|s| matches!(s, FilterSegment::MultiLevel))
		{
			if pos != segments.len() - 1 {
				return Err(TopicFilterError::HashPosition {
					filter: filter.to_string(),
				});
			}
		}

		Ok(Self { filter, segments })
	}

	/// The filter exactly as configured, suitable for subscribe calls.
	pub fn pattern(&self) -> ArcStr {
		self.filter.clone()
	}

	/// The filter as a string slice.
	pub fn as_str(&self) -> &str {
		&self.filter
	}

	/// Whether a concrete topic belongs to this filter.
	pub fn matches(&self, topic: &TopicPath) -> bool {
		let mut topic_segments = topic.segments().iter();
		for segment in &self.segments {
			match segment {
				| FilterSegment::MultiLevel => return true,
				| FilterSegment::SingleLevel => {
					if topic_segments.next().is_none() {
						return false;
					}
				}
				| FilterSegment::Literal(literal) => {
					match topic_segments.next() {
						| Some(s) if s.as_str() == literal.as_str() => {}
						| _ => return false,
					}
				}
			}
		}
		topic_segments.next().is_none()
	}
}

impl fmt::Display for TopicFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.filter)
	}
}
