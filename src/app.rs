//! Process orchestration
//!
//! Wires the registry, the notification sink, and the broker session
//! together, runs until a shutdown signal arrives, and tears the
//! connections down in reverse order of acquisition.

use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};

use crate::config::GlobalConfig;
use crate::dispatch::Dispatcher;
use crate::error::BridgeError;
use crate::registry::SubscriptionRegistry;
use crate::session::BrokerSession;
use crate::sink::{NotificationSink, Notifier};

/// Run the bridge until interrupted.
///
/// Setup failures propagate (the process cannot do its job without the
/// broker and the sink); anything already acquired is released first.
/// Teardown errors are logged, never escalated, so the shutdown path
/// always completes.
pub async fn run(config: GlobalConfig) -> Result<(), BridgeError> {
	let registry = Arc::new(SubscriptionRegistry::register(
		config.subscriptions.clone(),
	));

	let sink = Arc::new(NotificationSink::connect().await?);
	let dispatcher = Arc::new(Dispatcher::new(
		Arc::clone(&registry),
		Arc::clone(&sink) as Arc<dyn Notifier>,
		config.icon.clone(),
	));

	let mut session = match BrokerSession::connect(&config).await {
		| Ok(session) => session,
		| Err(err) => {
			sink.disconnect();
			return Err(err.into());
		}
	};

	if let Err(err) = session.subscribe_all(&registry, &dispatcher).await {
		session.abort().await;
		sink.disconnect();
		return Err(err.into());
	}

	let handle = session.spawn_dispatch(dispatcher);
	info!("Bridge is running, press Ctrl-C to stop");

	if let Err(err) = signal::ctrl_c().await {
		error!(error = %err, "Failed to listen for shutdown signal");
	}
	info!("Shutdown signal received, closing connections");

	handle.shutdown().await;
	sink.disconnect();
	Ok(())
}
