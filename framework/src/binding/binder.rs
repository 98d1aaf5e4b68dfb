//! The model binder for body-bound parameters

use super::{
    BindingOptions, BindingSource, FormatterCollection, InputFormatterContext, InputFormatterResult,
    ModelState, ParameterMetadata,
};
use crate::http::Request;
use serde_json::Value;
use std::any::Any;

/// Result of binding one parameter
pub enum ModelBindingResult {
    Success(Box<dyn Any + Send>),
    /// The reason is in model state
    Failed,
}

impl ModelBindingResult {
    pub fn is_model_set(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl std::fmt::Debug for ModelBindingResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success(_) => f.write_str("Success(..)"),
            Self::Failed => f.write_str("Failed"),
        }
    }
}

/// Binds parameters whose data comes from the request body
///
/// Formatters are asked in order; the first one that can read the parameter
/// produces its value.
#[derive(Debug, Clone)]
pub struct BodyModelBinder {
    formatters: FormatterCollection,
    treat_empty_input_as_default: bool,
    max_model_errors: usize,
}

impl BodyModelBinder {
    pub fn new(options: &BindingOptions) -> Self {
        Self {
            formatters: options.formatters.clone(),
            treat_empty_input_as_default: options.treat_empty_input_as_default,
            max_model_errors: options.max_model_errors,
        }
    }

    pub fn formatters(&self) -> &FormatterCollection {
        &self.formatters
    }

    /// A fresh model state for one request
    pub fn model_state(&self) -> ModelState {
        ModelState::with_max_errors(self.max_model_errors)
    }

    pub async fn bind(
        &self,
        request: &mut Request,
        metadata: &ParameterMetadata,
        model_state: &mut ModelState,
    ) -> ModelBindingResult {
        if let Some(source) = metadata.binding_source() {
            if !source.can_accept_data_from(&BindingSource::BODY) {
                model_state.try_add_model_error(
                    metadata.name(),
                    format!("No model binder can read the '{}' binding source.", source),
                );
                return ModelBindingResult::Failed;
            }
        }

        let mut ctx = InputFormatterContext::new(
            request,
            metadata,
            model_state,
            self.treat_empty_input_as_default,
        );

        let Some(formatter) = self.formatters.select(&ctx) else {
            let content_type = ctx.content_type().unwrap_or_default().to_string();
            ctx.model_state.try_add_model_error(
                metadata.name(),
                format!("Unsupported content type '{}'.", content_type),
            );
            ctx.model_state.set_unsupported_content_type(content_type);
            return ModelBindingResult::Failed;
        };

        tracing::trace!(formatter = formatter.name(), parameter = %metadata.key(), "selected input formatter");

        match formatter.read(&mut ctx).await {
            InputFormatterResult::Success(value) => ModelBindingResult::Success(value),
            InputFormatterResult::Failure => ModelBindingResult::Failed,
            InputFormatterResult::NoValue => Self::default_value(metadata, ctx.model_state),
        }
    }

    /// Bind and downcast to the declared parameter type
    pub async fn bind_as<T: Any>(
        &self,
        request: &mut Request,
        metadata: &ParameterMetadata,
        model_state: &mut ModelState,
    ) -> Option<T> {
        match self.bind(request, metadata, model_state).await {
            ModelBindingResult::Success(value) => match value.downcast::<T>() {
                Ok(value) => Some(*value),
                Err(_) => {
                    model_state.try_add_model_error(
                        "",
                        format!(
                            "Parameter {} was bound as {}, not {}.",
                            metadata.key(),
                            metadata.type_name(),
                            std::any::type_name::<T>()
                        ),
                    );
                    None
                }
            },
            ModelBindingResult::Failed => None,
        }
    }

    /// Optional parameters bind JSON `null`; required ones are an error
    fn default_value(metadata: &ParameterMetadata, model_state: &mut ModelState) -> ModelBindingResult {
        if !metadata.is_required() {
            if let Ok(value) = metadata.convert(&Value::Null) {
                return ModelBindingResult::Success(value);
            }
        }
        model_state.try_add_model_error(
            metadata.name(),
            format!(
                "A value for the '{}' parameter or property was not provided.",
                metadata.name()
            ),
        );
        ModelBindingResult::Failed
    }
}

/// Bind one parameter with the global binder
///
/// Used by the code `#[handler]` generates. Returns `None` when binding
/// failed; the reason is recorded in `model_state`.
pub async fn bind_parameter<T: Any>(
    request: &mut Request,
    metadata: &ParameterMetadata,
    model_state: &mut ModelState,
) -> Option<T> {
    super::Binding::binder()
        .bind_as::<T>(request, metadata, model_state)
        .await
}
