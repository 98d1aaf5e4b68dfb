//! Pluggable input formatters
//!
//! The model binder asks each registered formatter, in order, whether it can
//! read a parameter, and lets the first one that can produce the value.

use super::{ModelState, ParameterMetadata};
use crate::http::Request;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// Outcome of reading one parameter value
pub enum InputFormatterResult {
    /// A value of the parameter's declared type
    Success(Box<dyn Any + Send>),
    /// The request carried no value; the binder's default-value policy decides
    NoValue,
    /// Reading failed; the reason has been recorded in model state
    Failure,
}

impl InputFormatterResult {
    pub fn success<T: Any + Send>(value: T) -> Self {
        Self::Success(Box::new(value))
    }

    pub fn no_value() -> Self {
        Self::NoValue
    }

    pub fn failure() -> Self {
        Self::Failure
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn has_error(&self) -> bool {
        matches!(self, Self::Failure)
    }

    pub fn is_model_set(&self) -> bool {
        self.is_success()
    }
}

impl std::fmt::Debug for InputFormatterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success(_) => f.write_str("Success(..)"),
            Self::NoValue => f.write_str("NoValue"),
            Self::Failure => f.write_str("Failure"),
        }
    }
}

/// What a formatter sees while reading one parameter
pub struct InputFormatterContext<'a> {
    /// `None` when the request is no longer available to binders
    pub request: Option<&'a mut Request>,
    pub metadata: &'a ParameterMetadata,
    pub model_state: &'a mut ModelState,
    pub treat_empty_input_as_default: bool,
}

impl<'a> InputFormatterContext<'a> {
    pub fn new(
        request: &'a mut Request,
        metadata: &'a ParameterMetadata,
        model_state: &'a mut ModelState,
        treat_empty_input_as_default: bool,
    ) -> Self {
        Self {
            request: Some(request),
            metadata,
            model_state,
            treat_empty_input_as_default,
        }
    }

    /// The parameter name, used as the model-state key of the parameter
    pub fn model_name(&self) -> &'static str {
        self.metadata.name()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.request.as_deref().and_then(Request::content_type)
    }
}

/// Converts request content into a typed parameter value
///
/// # Example
///
/// ```rust,ignore
/// struct PlainTextFormatter;
///
/// #[async_trait]
/// impl InputFormatter for PlainTextFormatter {
///     fn name(&self) -> &'static str { "PlainTextFormatter" }
///
///     fn can_read(&self, ctx: &InputFormatterContext<'_>) -> bool {
///         ctx.content_type() == Some("text/plain")
///     }
///
///     async fn read(&self, ctx: &mut InputFormatterContext<'_>) -> InputFormatterResult {
///         // ...
///     }
/// }
/// ```
#[async_trait]
pub trait InputFormatter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this formatter should read the parameter in `ctx`
    fn can_read(&self, ctx: &InputFormatterContext<'_>) -> bool;

    /// Read the parameter value
    ///
    /// Errors are recorded in `ctx.model_state` and reported as
    /// [`InputFormatterResult::Failure`]; they never escape.
    async fn read(&self, ctx: &mut InputFormatterContext<'_>) -> InputFormatterResult;
}

/// Ordered list of formatters; earlier entries are asked first
#[derive(Clone, Default)]
pub struct FormatterCollection {
    formatters: Vec<Arc<dyn InputFormatter>>,
}

impl FormatterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, formatter: impl InputFormatter + 'static) {
        self.formatters.push(Arc::new(formatter));
    }

    /// Insert at `index`, clamped to the end of the list
    pub fn insert(&mut self, index: usize, formatter: impl InputFormatter + 'static) {
        let index = index.min(self.formatters.len());
        self.formatters.insert(index, Arc::new(formatter));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formatters.iter().any(|f| f.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn InputFormatter>> {
        self.formatters.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.formatters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }

    /// The first formatter that can read the parameter in `ctx`
    pub fn select(&self, ctx: &InputFormatterContext<'_>) -> Option<Arc<dyn InputFormatter>> {
        self.formatters.iter().find(|f| f.can_read(ctx)).cloned()
    }
}

impl std::fmt::Debug for FormatterCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
