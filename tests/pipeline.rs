//! End-to-end pipeline tests with a recording notification sink.
//!
//! Drives the dispatcher the same way the broker event loop does and
//! asserts on the notify calls that come out the other end.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use mqttoast::config::RuleConfig;
use mqttoast::dispatch::Dispatcher;
use mqttoast::registry::SubscriptionRegistry;
use mqttoast::sink::{Notifier, NotifyError};

#[derive(Default)]
struct RecordingSink {
	calls: Mutex<Vec<(String, String, String)>>,
}

impl RecordingSink {
	fn calls(&self) -> Vec<(String, String, String)> {
		self.calls.lock().unwrap().clone()
	}
}

#[async_trait]
impl Notifier for RecordingSink {
	async fn notify(
		&self,
		title: &str,
		body: &str,
		icon: &str,
	) -> Result<(), NotifyError> {
		self.calls.lock().unwrap().push((
			title.to_string(),
			body.to_string(),
			icon.to_string(),
		));
		Ok(())
	}
}

fn rule(topic: &str, title: &str, body: &str, icon: &str) -> RuleConfig {
	RuleConfig {
		topic: topic.to_string(),
		title: title.to_string(),
		body: body.to_string(),
		icon: icon.to_string(),
	}
}

fn dispatcher(
	rules: Vec<RuleConfig>,
	default_icon: &str,
) -> (Dispatcher, Arc<RecordingSink>) {
	let registry = Arc::new(SubscriptionRegistry::register(rules));
	let sink = Arc::new(RecordingSink::default());
	let dispatcher = Dispatcher::new(
		registry,
		Arc::clone(&sink) as Arc<dyn Notifier>,
		default_icon.to_string(),
	);
	(dispatcher, sink)
}

#[tokio::test]
async fn default_rule_notifies_with_global_icon() {
	let (dispatcher, sink) = dispatcher(
		vec![rule("calendar/alert", "", "", "")],
		"dialog-information",
	);

	dispatcher
		.handle(
			"calendar/alert".to_string(),
			Bytes::from("Standup\nDaily sync at 9am"),
		)
		.await;

	assert_eq!(sink.calls(), vec![(
		"Standup".to_string(),
		"Daily sync at 9am".to_string(),
		"dialog-information".to_string(),
	)]);
}

#[tokio::test]
async fn rule_icon_overrides_global_default() {
	let (dispatcher, sink) = dispatcher(
		vec![rule("calendar/alert", "", "", "appointment-soon")],
		"dialog-information",
	);

	dispatcher
		.handle("calendar/alert".to_string(), Bytes::from("Standup"))
		.await;

	let calls = sink.calls();
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].2, "appointment-soon");
}

#[tokio::test]
async fn template_rules_substitute_topic_and_payload() {
	let (dispatcher, sink) = dispatcher(
		vec![rule(
			"home/+/temp",
			"{{ topic[1] }}",
			"Temperature: {{ payload }}",
			"",
		)],
		"dialog-information",
	);

	dispatcher
		.handle("home/kitchen/temp".to_string(), Bytes::from("21.5"))
		.await;

	assert_eq!(sink.calls(), vec![(
		"kitchen".to_string(),
		"Temperature: 21.5".to_string(),
		"dialog-information".to_string(),
	)]);
}

#[tokio::test]
async fn template_failure_drops_the_message() {
	let (dispatcher, sink) = dispatcher(
		vec![rule("a/b", "{{ topic[5] }}", "{{ payload }}", "")],
		"dialog-information",
	);

	dispatcher.handle("a/b".to_string(), Bytes::from("hi")).await;

	assert!(sink.calls().is_empty());
}

#[tokio::test]
async fn first_registered_rule_wins() {
	let (dispatcher, sink) = dispatcher(
		vec![
			rule("a/+", "from wildcard", "", ""),
			rule("a/b", "from exact", "", ""),
		],
		"dialog-information",
	);

	dispatcher.handle("a/b".to_string(), Bytes::from("x")).await;

	let calls = sink.calls();
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].0, "from wildcard");
}

#[tokio::test]
async fn non_utf8_payload_is_dropped() {
	let (dispatcher, sink) = dispatcher(
		vec![rule("a/b", "", "", "")],
		"dialog-information",
	);

	dispatcher
		.handle("a/b".to_string(), Bytes::from_static(&[0xff, 0xfe]))
		.await;

	assert!(sink.calls().is_empty());
}

#[tokio::test]
async fn unmatched_topic_is_dropped() {
	let (dispatcher, sink) = dispatcher(
		vec![rule("a/b", "", "", "")],
		"dialog-information",
	);

	dispatcher.handle("c/d".to_string(), Bytes::from("x")).await;

	assert!(sink.calls().is_empty());
}

#[tokio::test]
async fn one_bad_rule_does_not_break_the_others() {
	let (dispatcher, sink) = dispatcher(
		vec![
			rule("a/b", "{{ broken", "", ""),
			rule("a/c", "", "", ""),
		],
		"dialog-information",
	);

	dispatcher.handle("a/b".to_string(), Bytes::from("x")).await;
	dispatcher
		.handle("a/c".to_string(), Bytes::from("still works"))
		.await;

	let calls = sink.calls();
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].0, "still works");
}
