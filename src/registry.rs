//! Configured subscription rules and rule lookup
//!
//! The registry holds the validated rules in registration order and maps
//! an arriving concrete topic back to the rule that subscribed to it.

use std::sync::OnceLock;

use tracing::warn;

use crate::config::RuleConfig;
use crate::render::{RenderError, RuleTemplates};
use crate::topic::{TopicFilter, TopicFilterError, TopicPath};

/// One validated subscription rule.
///
/// Immutable after registration, apart from the lazily-built template
/// cache: templates are compiled on first use and memoized, including a
/// memoized compile failure. Concurrent first use is guarded by the
/// compute-once cell.
#[derive(Debug)]
pub struct SubscriptionRule {
	filter: TopicFilter,
	title: Option<String>,
	body: Option<String>,
	icon: Option<String>,
	templates: OnceLock<Result<RuleTemplates, RenderError>>,
}

fn non_empty(value: String) -> Option<String> {
	if value.is_empty() { None } else { Some(value) }
}

impl SubscriptionRule {
	fn from_config(rule: RuleConfig) -> Result<Self, TopicFilterError> {
		let filter = TopicFilter::parse(rule.topic)?;
		Ok(Self {
			filter,
			title: non_empty(rule.title),
			body: non_empty(rule.body),
			icon: non_empty(rule.icon),
			templates: OnceLock::new(),
		})
	}

	/// The rule's topic filter.
	pub fn filter(&self) -> &TopicFilter {
		&self.filter
	}

	/// Rule-specific icon, `None` means use the global default.
	pub fn icon(&self) -> Option<&str> {
		self.icon.as_deref()
	}

	/// Whether this rule renders through templates rather than the
	/// default first-line split.
	pub fn has_templates(&self) -> bool {
		self.title.is_some() || self.body.is_some()
	}

	/// Compiled templates, built on first use. A missing field compiles
	/// as an empty-literal template.
	pub fn templates(&self) -> Result<&RuleTemplates, RenderError> {
		self.templates
			.get_or_init(|| {
				RuleTemplates::compile(
					self.title.as_deref().unwrap_or(""),
					self.body.as_deref().unwrap_or(""),
				)
			})
			.as_ref()
			.map_err(Clone::clone)
	}
}

/// The configured rules, in registration order.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
	rules: Vec<SubscriptionRule>,
}

impl SubscriptionRegistry {
	/// Build the registry from configured rules.
	///
	/// Rules with an invalid or empty topic filter are skipped with a
	/// warning; they never fail the registration as a whole.
	pub fn register(rules: Vec<RuleConfig>) -> Self {
		let mut valid = Vec::with_capacity(rules.len());
		for rule in rules {
			match SubscriptionRule::from_config(rule) {
				| Ok(rule) => valid.push(rule),
				| Err(err) => {
					warn!(
						error = %err,
						"Ignoring subscription with invalid topic filter"
					);
				}
			}
		}
		if valid.is_empty() {
			warn!("No subscriptions configured");
		}
		Self { rules: valid }
	}

	/// Valid rules, in subscribe order.
	pub fn rules(&self) -> &[SubscriptionRule] {
		&self.rules
	}

	/// Whether no valid rule survived registration.
	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}

	/// Resolve the rule an arrived topic belongs to.
	///
	/// When several filters match the same concrete topic, the first
	/// registered rule wins, deterministically.
	pub fn lookup(&self, topic: &TopicPath) -> Option<&SubscriptionRule> {
		self.rules.iter().find(|rule| rule.filter.matches(topic))
	}
}
