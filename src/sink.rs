//! Desktop notification sink
//!
//! Owns access to the desktop notification service. One outbound call per
//! message; the underlying crate opens its own session-bus connection per
//! call, so concurrent notify calls are independently safe.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use notify_rust::{Notification, Timeout};
use thiserror::Error;
use tracing::info;

use crate::APP_NAME;

/// Fixed expiry for every notification, in milliseconds.
const EXPIRE_TIMEOUT_MS: u32 = 7000;

/// Errors that can occur when talking to the notification service
#[derive(Error, Debug)]
pub enum NotifyError {
	/// The notification service could not be reached
	#[error("notification service unavailable: {0}")]
	Unavailable(String),

	/// The service rejected or failed the notify call
	#[error("failed to show notification: {0}")]
	Show(String),

	/// The blocking worker task was cancelled or panicked
	#[error("notification worker failed")]
	Worker(#[from] tokio::task::JoinError),
}

/// Anything that can deliver a rendered notification.
#[async_trait]
pub trait Notifier: Send + Sync {
	/// Deliver one notification.
	async fn notify(
		&self,
		title: &str,
		body: &str,
		icon: &str,
	) -> Result<(), NotifyError>;
}

/// Connection to the desktop notification service.
pub struct NotificationSink {
	connected: AtomicBool,
}

impl NotificationSink {
	/// Probe the notification service and acquire the sink.
	pub async fn connect() -> Result<Self, NotifyError> {
		let server = tokio::task::spawn_blocking(|| {
			notify_rust::get_server_information()
		})
		.await?
		.map_err(|e| NotifyError::Unavailable(e.to_string()))?;

		info!(
			name = %server.name,
			vendor = %server.vendor,
			version = %server.version,
			"Connected to notification service"
		);
		Ok(Self {
			connected: AtomicBool::new(true),
		})
	}

	/// Release the sink. Idempotent: calling it again (or without a
	/// prior connect) is a no-op.
	pub fn disconnect(&self) {
		if self.connected.swap(false, Ordering::SeqCst) {
			info!("Disconnected from notification service");
		}
	}
}

#[async_trait]
impl Notifier for NotificationSink {
	async fn notify(
		&self,
		title: &str,
		body: &str,
		icon: &str,
	) -> Result<(), NotifyError> {
		if !self.connected.load(Ordering::SeqCst) {
			return Err(NotifyError::Unavailable(
				"sink is disconnected".to_string(),
			));
		}

		let title = title.to_string();
		let body = body.to_string();
		let icon = icon.to_string();
		tokio::task::spawn_blocking(move || {
			Notification::new()
				.appname(APP_NAME)
				.summary(&title)
				.body(&body)
				.icon(&icon)
				.timeout(Timeout::Milliseconds(EXPIRE_TIMEOUT_MS))
				.show()
		})
		.await?
		.map(|_| ())
		.map_err(|e| NotifyError::Show(e.to_string()))
	}
}
