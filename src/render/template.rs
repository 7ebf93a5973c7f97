use std::fmt;

use minijinja::{Environment, UndefinedBehavior};
use thiserror::Error;

use super::context::TemplateContext;

/// Which of a rule's two templates an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateField {
	/// The notification title template
	Title,
	/// The notification body template
	Body,
}

impl fmt::Display for TemplateField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			| TemplateField::Title => write!(f, "title"),
			| TemplateField::Body => write!(f, "body"),
		}
	}
}

/// Errors that can occur when compiling or evaluating rule templates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
	/// Template source failed to compile. Memoized per rule, so a broken
	/// template fails every message without re-parsing.
	#[error("failed to parse {field} template: {detail}")]
	Parse { field: TemplateField, detail: String },

	/// Template evaluation failed for one message, for example an
	/// out-of-range topic segment index or an undefined reference.
	#[error("failed to evaluate {field} template: {detail}")]
	Eval { field: TemplateField, detail: String },
}

impl RenderError {
	fn parse(field: TemplateField, err: &minijinja::Error) -> Self {
		Self::Parse {
			field,
			detail: err.to_string(),
		}
	}

	fn eval(field: TemplateField, err: &minijinja::Error) -> Self {
		Self::Eval {
			field,
			detail: err.to_string(),
		}
	}
}

const TITLE_TEMPLATE: &str = "title";
const BODY_TEMPLATE: &str = "body";

/// Compiled title and body templates of one rule.
///
/// A missing field is compiled as an empty-literal template. Undefined
/// references are strict evaluation errors rather than silent empty
/// output, so a template naming a topic segment that does not exist
/// fails that message instead of notifying with a hole in it.
#[derive(Debug)]
pub struct RuleTemplates {
	env: Environment<'static>,
}

impl RuleTemplates {
	/// Compile both template sources.
	pub fn compile(title: &str, body: &str) -> Result<Self, RenderError> {
		let mut env = Environment::new();
		env.set_undefined_behavior(UndefinedBehavior::Strict);
		env.add_template_owned(TITLE_TEMPLATE, title.to_string())
			.map_err(|e| RenderError::parse(TemplateField::Title, &e))?;
		env.add_template_owned(BODY_TEMPLATE, body.to_string())
			.map_err(|e| RenderError::parse(TemplateField::Body, &e))?;
		Ok(Self { env })
	}

	/// Evaluate both templates against the message context.
	///
	/// All-or-nothing: if either field fails, the whole render fails and
	/// no partial result is returned.
	pub fn render(
		&self,
		context: &TemplateContext,
	) -> Result<(String, String), RenderError> {
		let title = self.eval_template(TemplateField::Title, context)?;
		let body = self.eval_template(TemplateField::Body, context)?;
		Ok((title, body))
	}

	fn eval_template(
		&self,
		field: TemplateField,
		context: &TemplateContext,
	) -> Result<String, RenderError> {
		let name = match field {
			| TemplateField::Title => TITLE_TEMPLATE,
			| TemplateField::Body => BODY_TEMPLATE,
		};
		self.env
			.get_template(name)
			.and_then(|template| template.render(context))
			.map_err(|e| RenderError::eval(field, &e))
	}
}
