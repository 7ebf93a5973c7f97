//! Per-message dispatch
//!
//! Each arrived message is handled in its own spawned task: resolve the
//! matching rule, render title and body, send the notification. Every
//! failure on this path is logged and drops only the affected message,
//! never the session.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::registry::SubscriptionRegistry;
use crate::render;
use crate::sink::Notifier;
use crate::topic::TopicPath;

/// Routes arrived messages through the rendering pipeline to the sink.
pub struct Dispatcher {
	registry: Arc<SubscriptionRegistry>,
	sink: Arc<dyn Notifier>,
	default_icon: String,
}

impl Dispatcher {
	/// Wire the registry and the sink into a dispatcher.
	pub fn new(
		registry: Arc<SubscriptionRegistry>,
		sink: Arc<dyn Notifier>,
		default_icon: String,
	) -> Self {
		Self {
			registry,
			sink,
			default_icon,
		}
	}

	/// Spawn a handling task for one arrived message so the session's
	/// I/O loop never waits on rendering or the notification service.
	pub fn spawn_handle(self: &Arc<Self>, topic: String, payload: Bytes) {
		let dispatcher = Arc::clone(self);
		tokio::spawn(async move {
			dispatcher.handle(topic, payload).await;
		});
	}

	/// Handle one arrived message end to end.
	pub async fn handle(&self, topic: String, payload: Bytes) {
		let payload = match std::str::from_utf8(&payload) {
			| Ok(payload) => payload,
			| Err(err) => {
				warn!(
					topic = %topic,
					error = %err,
					"Dropping message with non-UTF-8 payload"
				);
				return;
			}
		};

		let topic = TopicPath::new(topic);
		let Some(rule) = self.registry.lookup(&topic) else {
			debug!(topic = %topic, "No rule matches topic");
			return;
		};

		let rendered = match render::render(rule, &topic, payload) {
			| Ok(rendered) => rendered,
			| Err(err) => {
				warn!(
					topic = %topic,
					error = %err,
					"Dropping message, rendering failed"
				);
				return;
			}
		};

		let icon = rule.icon().unwrap_or(&self.default_icon);
		if let Err(err) = self
			.sink
			.notify(&rendered.title, &rendered.body, icon)
			.await
		{
			warn!(
				topic = %topic,
				error = %err,
				"Failed to send notification"
			);
		}
	}
}
