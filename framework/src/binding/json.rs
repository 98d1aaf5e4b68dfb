//! Whole-body JSON input formatter and the JSON helpers shared with the
//! property formatter

use super::metadata::ConversionError;
use super::{
    BindingSource, InputFormatter, InputFormatterContext, InputFormatterResult, ModelState,
};
use crate::error::FrameworkError;
use async_trait::async_trait;
use serde_json::Value;
use std::io::Read;

/// Whether a `Content-Type` names a JSON document this crate can read
///
/// Accepts `application/json`, `text/json` and any `application/*+json`
/// type. A `charset` parameter, when present, must be UTF-8.
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let Ok(mime) = content_type.parse::<mime::Mime>() else {
        return false;
    };

    let is_json = (mime.type_() == "application"
        && (mime.subtype() == "json" || mime.suffix().map_or(false, |name| name == "json")))
        || (mime.type_() == "text" && mime.subtype() == "json");
    let is_utf8 = mime
        .get_param(mime::CHARSET)
        .map_or(true, |charset| charset == "utf-8");

    is_json && is_utf8
}

/// Parse a complete JSON document from a reader
///
/// Syntax errors carry the path of the value being read when they occurred.
pub(crate) fn parse_document<R: Read>(reader: R) -> Result<Value, ConversionError> {
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let document: Value = serde_path_to_error::deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(document)
}

/// Record a document or conversion error under its document path
pub(crate) fn record_conversion_error(model_state: &mut ModelState, prefix: &str, err: &ConversionError) {
    model_state.try_add_model_error(err.model_key(prefix), err.to_string());
}

/// Record an error that is not tied to a field
pub(crate) fn record_error(model_state: &mut ModelState, err: &FrameworkError) {
    model_state.add_request_error(err);
}

/// The result for input that carried no value
///
/// With treat-empty-as-default the declared type gets a chance to bind
/// JSON `null` (e.g. `Option<T>` binds `None`).
pub(crate) fn empty_input(ctx: &InputFormatterContext<'_>) -> InputFormatterResult {
    if !ctx.treat_empty_input_as_default {
        return InputFormatterResult::no_value();
    }
    match ctx.metadata.convert(&Value::Null) {
        Ok(value) => InputFormatterResult::Success(value),
        Err(_) => InputFormatterResult::no_value(),
    }
}

/// Reads the entire request body as one JSON value
#[derive(Debug, Clone, Default)]
pub struct JsonInputFormatter;

impl JsonInputFormatter {
    pub fn new() -> Self {
        Self
    }

    /// The content-type half of [`InputFormatter::can_read`]
    pub fn can_read_content_type(&self, ctx: &InputFormatterContext<'_>) -> bool {
        is_json_content_type(ctx.content_type())
    }
}

#[async_trait]
impl InputFormatter for JsonInputFormatter {
    fn name(&self) -> &'static str {
        "JsonInputFormatter"
    }

    fn can_read(&self, ctx: &InputFormatterContext<'_>) -> bool {
        let reads_whole_body = ctx
            .metadata
            .binding_source()
            .map_or(true, |source| source == BindingSource::BODY);
        reads_whole_body && self.can_read_content_type(ctx)
    }

    async fn read(&self, ctx: &mut InputFormatterContext<'_>) -> InputFormatterResult {
        let Some(request) = ctx.request.as_deref_mut() else {
            tracing::error!(event_id = 4, event_name = "HttpRequestMissing", "Could not find HTTP request.");
            return InputFormatterResult::failure();
        };

        let bytes = match request.enable_buffering().await {
            Ok(body) => body.as_bytes().clone(),
            Err(err) => {
                record_error(ctx.model_state, &err);
                return InputFormatterResult::failure();
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return empty_input(ctx);
        }

        match parse_document(bytes.as_ref()).and_then(|document| ctx.metadata.convert(&document)) {
            Ok(value) => InputFormatterResult::Success(value),
            Err(err) => {
                tracing::debug!(
                    event_id = 2,
                    event_name = "JsonInputException",
                    error = %err,
                    "JSON input formatter threw an exception"
                );
                record_conversion_error(ctx.model_state, "", &err);
                InputFormatterResult::failure()
            }
        }
    }
}
