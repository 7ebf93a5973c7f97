//! MQTT broker session
//!
//! Owns the broker connection: connect with timeout, subscribe the
//! configured rules, dispatch arriving messages, and tear the connection
//! down again. The session is kept non-clean so broker-side subscriptions
//! survive a brief reconnect.

use std::sync::Arc;
use std::time::Duration;

use arcstr::ArcStr;
use rumqttc::mqttbytes::v4::{
	ConnAck, ConnectReturnCode, SubAck, SubscribeReasonCode,
};
use rumqttc::{
	AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
	Packet, QoS, Transport,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::config::GlobalConfig;
use crate::dispatch::Dispatcher;
use crate::registry::SubscriptionRegistry;
use crate::APP_NAME;

const KEEP_ALIVE: Duration = Duration::from_secs(10);
const EVENT_LOOP_CAPACITY: usize = 10;
/// Grace period to flush the outgoing Disconnect when aborting setup.
const DISCONNECT_QUIESCE: Duration = Duration::from_millis(250);

const MAX_CONSECUTIVE_ERRORS: u32 = 10;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Errors that can occur while setting up the broker session
#[derive(Error, Debug)]
pub enum SessionError {
	/// No ConnAck arrived within the configured timeout
	#[error("MQTT connect timed out after {seconds}s")]
	ConnectTimeout {
		/// Configured timeout
		seconds: u64,
	},

	/// Transport-level failure while talking to the broker
	#[error("MQTT connection failed")]
	Connection(#[from] ConnectionError),

	/// The broker answered the connect with a refusal code
	#[error("broker refused connection: {code:?}")]
	ConnectRejected {
		/// The broker's return code
		code: ConnectReturnCode,
	},

	/// The subscribe request could not be queued
	#[error("subscribe request for '{topic}' could not be sent")]
	Subscribe {
		/// Topic filter being subscribed
		topic: String,
		/// Underlying client error
		#[source]
		source: rumqttc::ClientError,
	},

	/// No SubAck arrived within the configured timeout
	#[error("MQTT subscribe to '{topic}' timed out after {seconds}s")]
	SubscribeTimeout {
		/// Topic filter being subscribed
		topic: String,
		/// Configured timeout
		seconds: u64,
	},

	/// The broker acknowledged the subscription with a failure code
	#[error("broker rejected subscription to '{topic}'")]
	SubscribeRejected {
		/// Topic filter being subscribed
		topic: String,
	},
}

/// A connected broker session whose setup is still in progress.
///
/// Created by [`BrokerSession::connect`]; once all rules are subscribed,
/// [`BrokerSession::spawn_dispatch`] moves the event loop into a
/// background task and returns the [`SessionHandle`] used for teardown.
pub struct BrokerSession {
	client: AsyncClient,
	event_loop: EventLoop,
	subscribed: Vec<ArcStr>,
	timeout: Duration,
	timeout_secs: u64,
}

/// A running broker session.
pub struct SessionHandle {
	client: AsyncClient,
	subscribed: Vec<ArcStr>,
	loop_handle: Option<JoinHandle<()>>,
}

impl BrokerSession {
	/// Connect to the broker and wait for its acknowledgement.
	pub async fn connect(
		config: &GlobalConfig,
	) -> Result<Self, SessionError> {
		let client_id = client_id();
		info!(
			host = %config.host,
			port = config.port,
			secure = config.secure,
			client_id = %client_id,
			"Connecting to MQTT broker"
		);

		let mut options =
			MqttOptions::new(client_id, &config.host, config.port);
		options.set_keep_alive(KEEP_ALIVE);
		// Non-clean session: the broker retains our subscriptions
		// across a reconnect.
		options.set_clean_session(false);
		if config.secure {
			options.set_transport(Transport::tls_with_default_config());
		}
		if !config.user.is_empty() {
			options.set_credentials(&config.user, &config.pass);
		}

		let (client, mut event_loop) =
			AsyncClient::new(options, EVENT_LOOP_CAPACITY);

		let timeout = config.setup_timeout();
		let ack = time::timeout(timeout, wait_for_connack(&mut event_loop))
			.await
			.map_err(|_| SessionError::ConnectTimeout {
				seconds: config.timeout,
			})??;
		if ack.code != ConnectReturnCode::Success {
			return Err(SessionError::ConnectRejected { code: ack.code });
		}
		info!(
			session_present = ack.session_present,
			"Connected to MQTT broker"
		);

		Ok(Self {
			client,
			event_loop,
			subscribed: Vec::new(),
			timeout,
			timeout_secs: config.timeout,
		})
	}

	/// Subscribe every valid rule, waiting for the broker to
	/// acknowledge each one.
	///
	/// A single timeout or rejection aborts the whole startup sequence;
	/// only acknowledged filters end up in the active set. Messages that
	/// arrive while the acknowledgement is pending (retained messages,
	/// mostly) are handed to the dispatcher right away.
	pub async fn subscribe_all(
		&mut self,
		registry: &SubscriptionRegistry,
		dispatcher: &Arc<Dispatcher>,
	) -> Result<(), SessionError> {
		for rule in registry.rules() {
			let topic = rule.filter().pattern();
			info!(topic = %topic, "Subscribing");

			self.client
				.subscribe(topic.as_str(), QoS::AtMostOnce)
				.await
				.map_err(|source| SessionError::Subscribe {
					topic: topic.to_string(),
					source,
				})?;

			let ack = match time::timeout(
				self.timeout,
				wait_for_suback(&mut self.event_loop, dispatcher),
			)
			.await
			{
				| Ok(result) => result?,
				| Err(_) => {
					return Err(SessionError::SubscribeTimeout {
						topic: topic.to_string(),
						seconds: self.timeout_secs,
					});
				}
			};

			if ack
				.return_codes
				.iter()
				.any(|code| matches!(code, SubscribeReasonCode::Failure))
			{
				return Err(SessionError::SubscribeRejected {
					topic: topic.to_string(),
				});
			}

			self.subscribed.push(topic);
		}
		Ok(())
	}

	/// Move the event loop into a background task that dispatches
	/// arriving messages until the session disconnects.
	pub fn spawn_dispatch(
		self,
		dispatcher: Arc<Dispatcher>,
	) -> SessionHandle {
		let Self {
			client,
			event_loop,
			subscribed,
			..
		} = self;

		let loop_client = client.clone();
		let loop_topics = subscribed.clone();
		let loop_handle = tokio::spawn(async move {
			run(event_loop, loop_client, loop_topics, dispatcher).await;
		});

		SessionHandle {
			client,
			subscribed,
			loop_handle: Some(loop_handle),
		}
	}

	/// Best-effort teardown for a session whose setup did not complete.
	pub async fn abort(mut self) {
		unsubscribe_all(&self.client, &self.subscribed).await;
		if let Err(err) = self.client.disconnect().await {
			warn!(error = ?err, "Failed to send disconnect to broker");
		}
		// Drain the event loop briefly so the Disconnect actually
		// leaves the socket.
		let _ = time::timeout(DISCONNECT_QUIESCE, async {
			loop {
				match self.event_loop.poll().await {
					| Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
					| Ok(_) => {}
					| Err(_) => break,
				}
			}
		})
		.await;
		info!("Disconnected from MQTT broker");
	}
}

impl SessionHandle {
	/// Tear the session down: unsubscribe in reverse registration
	/// order, disconnect, and wait for the event loop to finish. Every
	/// step is best-effort; errors are logged and never escalate.
	pub async fn shutdown(mut self) {
		unsubscribe_all(&self.client, &self.subscribed).await;

		if let Err(err) = self.client.disconnect().await {
			warn!(error = ?err, "Failed to send disconnect to broker");
		}

		if let Some(handle) = self.loop_handle.take() {
			if let Err(err) = handle.await {
				warn!(error = %err, "Event loop task failed");
			}
		}
		info!("Disconnected from MQTT broker");
	}
}

impl Drop for SessionHandle {
	fn drop(&mut self) {
		if self.loop_handle.is_some() {
			error!(
				"SessionHandle dropped without calling shutdown(). Call \
				 shutdown() and await its completion before dropping."
			);
		}
	}
}

async fn wait_for_connack(
	event_loop: &mut EventLoop,
) -> Result<ConnAck, SessionError> {
	loop {
		match event_loop.poll().await {
			| Ok(Event::Incoming(Packet::ConnAck(ack))) => return Ok(ack),
			| Ok(event) => {
				debug!(event = ?event, "Event before ConnAck");
			}
			| Err(err) => return Err(SessionError::Connection(err)),
		}
	}
}

async fn wait_for_suback(
	event_loop: &mut EventLoop,
	dispatcher: &Arc<Dispatcher>,
) -> Result<SubAck, SessionError> {
	loop {
		match event_loop.poll().await {
			| Ok(Event::Incoming(Packet::SubAck(ack))) => return Ok(ack),
			| Ok(Event::Incoming(Packet::Publish(publish))) => {
				dispatcher.spawn_handle(publish.topic, publish.payload);
			}
			| Ok(event) => {
				debug!(event = ?event, "Event before SubAck");
			}
			| Err(err) => return Err(SessionError::Connection(err)),
		}
	}
}

async fn unsubscribe_all(client: &AsyncClient, subscribed: &[ArcStr]) {
	for topic in subscribed.iter().rev() {
		info!(topic = %topic, "Unsubscribing");
		if let Err(err) = client.unsubscribe(topic.as_str()).await {
			warn!(
				topic = %topic,
				error = ?err,
				"Failed to unsubscribe"
			);
		}
	}
}

/// Steady-state event loop. Terminates when a Disconnect packet passes
/// in either direction; connection losses are logged and retried with
/// bounded exponential backoff.
async fn run(
	mut event_loop: EventLoop,
	client: AsyncClient,
	subscribed: Vec<ArcStr>,
	dispatcher: Arc<Dispatcher>,
) {
	let mut error_count: u32 = 0;

	loop {
		match event_loop.poll().await {
			| Ok(Event::Incoming(Packet::Publish(publish))) => {
				error_count = 0;
				debug!(
					topic = %publish.topic,
					payload_size = publish.payload.len(),
					"Received message"
				);
				dispatcher.spawn_handle(publish.topic, publish.payload);
			}
			| Ok(Event::Incoming(Packet::ConnAck(ack))) => {
				// Only seen here after a reconnect; the initial ConnAck
				// is consumed during connect().
				error_count = 0;
				if ack.session_present {
					info!(
						"Reconnected to MQTT broker, session retained"
					);
				} else {
					warn!(
						topics = subscribed.len(),
						"Reconnected without retained session, \
						 subscribing again"
					);
					for topic in &subscribed {
						if let Err(err) = client
							.subscribe(topic.as_str(), QoS::AtMostOnce)
							.await
						{
							error!(
								topic = %topic,
								error = ?err,
								"Failed to restore subscription"
							);
						}
					}
				}
			}
			| Ok(Event::Incoming(Packet::Disconnect)) => {
				info!("Broker closed the connection");
				break;
			}
			| Ok(Event::Outgoing(Outgoing::Disconnect)) => {
				info!("Disconnect request sent to broker");
				break;
			}
			| Ok(event) => {
				error_count = 0;
				debug!(event = ?event, "MQTT event");
			}
			| Err(err) => {
				error_count += 1;
				warn!(
					error = %err,
					error_count,
					"Connection to MQTT broker lost"
				);
				if error_count >= MAX_CONSECUTIVE_ERRORS {
					error!(
						max_errors = MAX_CONSECUTIVE_ERRORS,
						"Too many consecutive errors, terminating event \
						 loop"
					);
					break;
				}

				let delay = INITIAL_RETRY_DELAY
					* 2_u32.pow((error_count - 1).min(8));
				let delay = delay.min(MAX_RETRY_DELAY);
				time::sleep(delay).await;
			}
		}
	}
	info!("MQTT event loop terminated");
}

fn client_id() -> String {
	match hostname::get() {
		| Ok(name) => {
			format!("{}-{}", APP_NAME, name.to_string_lossy())
		}
		| Err(_) => APP_NAME.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::client_id;
	use crate::APP_NAME;

	#[test]
	fn client_id_is_stable_per_host() {
		let first = client_id();
		let second = client_id();
		assert_eq!(first, second);
		assert!(first.starts_with(APP_NAME));
	}
}
