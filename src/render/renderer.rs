use crate::registry::SubscriptionRule;
use crate::topic::TopicPath;

use super::context::TemplateContext;
use super::template::RenderError;

/// A rendered notification, ready for the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
	/// Notification title
	pub title: String,
	/// Notification body, may be empty
	pub body: String,
}

/// Produce title and body for a message that arrived on `topic`.
///
/// Rules without templates use the default split: the first line becomes
/// the title, everything after the first newline becomes the body. Rules
/// with templates evaluate both fields against the message context;
/// failure of either field fails the whole message and no notification
/// is sent for it.
pub fn render(
	rule: &SubscriptionRule,
	topic: &TopicPath,
	payload: &str,
) -> Result<Rendered, RenderError> {
	if !rule.has_templates() {
		let (title, body) = match payload.split_once('\n') {
			| Some((first, rest)) => (first.to_string(), rest.to_string()),
			| None => (payload.to_string(), String::new()),
		};
		return Ok(Rendered { title, body });
	}

	let templates = rule.templates()?;
	let context = TemplateContext::new(topic, payload);
	let (title, body) = templates.render(&context)?;
	Ok(Rendered { title, body })
}
