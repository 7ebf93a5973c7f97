use serde::Serialize;

use crate::topic::TopicPath;

/// Template input for one arrived message.
///
/// Exposes the raw payload as `payload` and the topic split into `/`
/// segments as `topic`, indexable by position (`topic[1]`). Built per
/// message and discarded after rendering.
#[derive(Debug, Serialize)]
pub struct TemplateContext {
	payload: String,
	topic: Vec<String>,
}

impl TemplateContext {
	/// Build the context for one message.
	pub fn new(topic: &TopicPath, payload: &str) -> Self {
		Self {
			payload: payload.to_string(),
			topic: topic
				.segments()
				.iter()
				.map(|s| s.to_string())
				.collect(),
		}
	}
}
