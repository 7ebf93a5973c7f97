//! # mqttoast
//!
//! A bridge from MQTT topics to desktop notifications: subscribe to the
//! configured topic filters, turn each arriving message into a title and
//! body, and hand it to the desktop notification service.
//!
//! ## Rules
//!
//! Each configured rule maps a topic filter (wildcards `+` and `#` are
//! supported) to a rendering behavior:
//!
//! - Without templates, the first line of the payload becomes the title
//!   and the rest becomes the body.
//! - With templates, title and body are rendered from the message
//!   context: `{{ payload }}` is the raw payload, `{{ topic[1] }}` is a
//!   topic segment by index. Templates are compiled once per rule and
//!   cached. If either field fails, no notification is sent for that
//!   message.
//!
//! When several filters match the same topic, the first registered rule
//! wins.
//!
//! ## Lifecycle
//!
//! The broker session uses a persistent (non-clean) MQTT session, so a
//! brief reconnect does not lose subscriptions. Setup failures are
//! fatal; per-message failures are logged and drop only that message.

#![warn(missing_docs)]

pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod render;
pub mod session;
pub mod sink;
pub mod topic;

// === Core public API ===
pub use config::{ConfigError, GlobalConfig, RuleConfig};
pub use dispatch::Dispatcher;
pub use error::BridgeError;
pub use registry::{SubscriptionRegistry, SubscriptionRule};
pub use render::{render, Rendered, RenderError};
pub use session::{BrokerSession, SessionError, SessionHandle};
pub use sink::{NotificationSink, Notifier, NotifyError};
pub use topic::{TopicFilter, TopicFilterError, TopicPath};

/// Application name, used for the MQTT client id and as the
/// notification app name.
pub const APP_NAME: &str = "mqttoast";

/// Result type alias for operations that may fail with [`BridgeError`]
pub type Result<T> = std::result::Result<T, BridgeError>;
