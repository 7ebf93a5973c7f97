//! Message-to-notification rendering
//!
//! Turns an arrived (topic, payload) pair into a notification title and
//! body, either with the default first-line split or by evaluating the
//! rule's cached templates.

pub mod context;
mod renderer;
pub mod template;


// Re-export commonly used types for convenience
pub use context::TemplateContext;
pub use renderer::{render, Rendered};
pub use template::{RenderError, RuleTemplates, TemplateField};
