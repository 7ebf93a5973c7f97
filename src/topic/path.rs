use std::fmt;

use arcstr::{ArcStr, Substr};

/// A concrete topic as delivered by the broker, split into `/` segments.
///
/// Segments are zero-copy substrings of the topic string.
#[derive(Debug, Clone)]
pub struct TopicPath {
	path: ArcStr,
	segments: Vec<Substr>,
}

impl TopicPath {
	/// Split a concrete topic string into its segments.
	pub fn new(path: impl Into<ArcStr>) -> Self {
		let path = path.into();
		let segments =
			path.split('/').map(|s| path.substr_from(s)).collect();
		Self { path, segments }
	}

	/// The full topic string.
	pub fn as_str(&self) -> &str {
		&self.path
	}

	/// The topic split on `/`, in order.
	pub fn segments(&self) -> &[Substr] {
		&self.segments
	}
}

impl fmt::Display for TopicPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.path)
	}
}

#[cfg(test)]
mod tests {
	use super::TopicPath;

	#[test]
	fn splits_into_segments() {
		let path = TopicPath::new("home/kitchen/temp");
		let segments: Vec<&str> =
			path.segments().iter().map(|s| s.as_str()).collect();
		assert_eq!(segments, ["home", "kitchen", "temp"]);
		assert_eq!(path.as_str(), "home/kitchen/temp");
	}

	#[test]
	fn keeps_empty_segments() {
		let path = TopicPath::new("home//temp");
		let segments: Vec<&str> =
			path.segments().iter().map(|s| s.as_str()).collect();
		assert_eq!(segments, ["home", "", "temp"]);
	}

	#[test]
	fn single_segment() {
		let path = TopicPath::new("status");
		assert_eq!(path.segments().len(), 1);
	}
}
