//! Crate-level error aggregate

use thiserror::Error;

use crate::config::ConfigError;
use crate::session::SessionError;
use crate::sink::NotifyError;

/// Errors that terminate the bridge.
///
/// Only setup-phase failures end up here; steady-state failures are
/// logged and recovered where they occur.
#[derive(Error, Debug)]
pub enum BridgeError {
	/// Configuration could not be loaded
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Broker session setup failed
	#[error(transparent)]
	Session(#[from] SessionError),

	/// Notification sink setup failed
	#[error(transparent)]
	Notify(#[from] NotifyError),
}
