//! Input formatter that binds one parameter to one property of a JSON body
//!
//! The body is parsed once per request. The parsed document is kept in the
//! request items so every `#[from_json_property]` parameter of the request
//! reads its section from the same tree.

use super::json::{empty_input, parse_document, record_conversion_error, record_error};
use super::{InputFormatter, InputFormatterContext, InputFormatterResult, JsonInputFormatter};
use crate::error::FrameworkError;
use crate::http::Request;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Request item key of the parsed body document
pub const PARSED_BODY_KEY: &str = "JsonPropertyInputFormatter";

/// Request item key marking a body that could not be parsed
const PARSE_FAILED_KEY: &str = "JsonPropertyInputFormatter.Failed";

/// The body of this request failed to parse and the error is recorded
struct ParseFailed;

/// Reads `#[from_json_property]` parameters from a shared parsed body
#[derive(Debug, Clone, Default)]
pub struct JsonPropertyInputFormatter {
    json: JsonInputFormatter,
}

impl JsonPropertyInputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The parsed body of `request`, parsing and caching it on first use
    ///
    /// The body is buffered, read synchronously and rewound, so other
    /// consumers can still read it from the start. A failure is cached too:
    /// only the first parameter of the request reports it.
    async fn document(request: &mut Request) -> Result<Arc<Value>, DocumentError> {
        if let Some(document) = request.items().get::<Arc<Value>>(PARSED_BODY_KEY) {
            return Ok(document.clone());
        }
        if request.items().contains(PARSE_FAILED_KEY) {
            return Err(DocumentError::Reported);
        }

        let parsed = Self::parse(request).await;
        match parsed {
            Ok(document) => {
                let document = Arc::new(document);
                request.items_mut().insert(PARSED_BODY_KEY, document.clone());
                Ok(document)
            }
            Err(err) => {
                request.items_mut().insert(PARSE_FAILED_KEY, ParseFailed);
                Err(err)
            }
        }
    }

    async fn parse(request: &mut Request) -> Result<Value, DocumentError> {
        request.enable_buffering().await?;
        let body = request.sync_body()?;
        let parsed = if body.as_bytes().iter().all(u8::is_ascii_whitespace) {
            Ok(Value::Object(Default::default()))
        } else {
            parse_document(&mut *body)
        };
        body.rewind();
        parsed.map_err(DocumentError::Json)
    }
}

enum DocumentError {
    Json(super::metadata::ConversionError),
    Request(FrameworkError),
    /// An earlier parameter of the same request already recorded the failure
    Reported,
}

impl From<FrameworkError> for DocumentError {
    fn from(err: FrameworkError) -> Self {
        Self::Request(err)
    }
}

/// Find the section addressed by `key`
///
/// An exact top-level key wins; otherwise `key` is read as a dotted path,
/// with numeric segments indexing arrays. Property names match exactly
/// first, then ignoring case. `null` counts as absent.
pub fn section<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    let found = match property(document, key) {
        Some(value) => Some(value),
        None if key.contains('.') => key.split('.').try_fold(document, |node, segment| match node {
            Value::Object(_) => property(node, segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }),
        None => None,
    };
    found.filter(|value| !value.is_null())
}

/// Look up one property of an object, ignoring case when no key matches exactly
fn property<'a>(node: &'a Value, name: &str) -> Option<&'a Value> {
    let Value::Object(map) = node else {
        return None;
    };
    map.get(name).or_else(|| {
        map.iter()
            .find(|(key, _)| eq_ignore_case(key, name))
            .map(|(_, value)| value)
    })
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

#[async_trait]
impl InputFormatter for JsonPropertyInputFormatter {
    fn name(&self) -> &'static str {
        "JsonPropertyInputFormatter"
    }

    fn can_read(&self, ctx: &InputFormatterContext<'_>) -> bool {
        if !self.json.can_read_content_type(ctx) {
            return false;
        }
        match ctx.metadata.json_property() {
            Ok(attribute) => attribute.is_some(),
            Err(err) => {
                tracing::error!(parameter = %ctx.metadata.key(), error = %err, "ambiguous binding configuration");
                false
            }
        }
    }

    async fn read(&self, ctx: &mut InputFormatterContext<'_>) -> InputFormatterResult {
        let Some(request) = ctx.request.as_deref_mut() else {
            tracing::error!(event_id = 4, event_name = "HttpRequestMissing", "Could not find HTTP request.");
            return InputFormatterResult::failure();
        };

        let document = match Self::document(request).await {
            Ok(document) => document,
            Err(DocumentError::Json(err)) => {
                tracing::debug!(
                    event_id = 2,
                    event_name = "JsonInputException",
                    error = %err,
                    "JSON input formatter threw an exception"
                );
                record_conversion_error(ctx.model_state, "", &err);
                return InputFormatterResult::failure();
            }
            Err(DocumentError::Request(err)) => {
                tracing::debug!(
                    event_id = 2,
                    event_name = "JsonInputException",
                    error = %err,
                    "JSON input formatter threw an exception"
                );
                record_error(ctx.model_state, &err);
                return InputFormatterResult::failure();
            }
            Err(DocumentError::Reported) => return InputFormatterResult::failure(),
        };

        let attribute = match ctx.metadata.json_property() {
            Ok(Some(attribute)) => attribute,
            Ok(None) | Err(_) => {
                tracing::error!(
                    event_id = 3,
                    event_name = "FromJsonPropertyAttributeMissing",
                    attribute = "FromJsonProperty",
                    parameter = ctx.metadata.name(),
                    "Could not find attribute FromJsonProperty on parameter {}.",
                    ctx.metadata.name()
                );
                return InputFormatterResult::failure();
            }
        };
        let key = attribute.resolve_name(ctx.metadata.name());

        let Some(value) = section(&document, key) else {
            return empty_input(ctx);
        };

        match ctx.metadata.convert(value) {
            Ok(converted) => {
                tracing::debug!(
                    event_id = 1,
                    event_name = "FromJsonPropertyInputSuccess",
                    type_name = ctx.metadata.type_name(),
                    "JSON input formatter succeeded, deserializing to type '{}'",
                    ctx.metadata.type_name()
                );
                InputFormatterResult::Success(converted)
            }
            Err(err) => {
                tracing::debug!(
                    event_id = 2,
                    event_name = "JsonInputException",
                    error = %err,
                    "JSON input formatter threw an exception"
                );
                record_conversion_error(ctx.model_state, key, &err);
                InputFormatterResult::failure()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{FromJsonProperty, ModelState, ParameterAttribute, ParameterMetadata};
    use crate::config::ServerConfig;
    use http_body_util::Full;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;
    use std::io::Read;

    const BODY: &str = r#"{"user": {"name": "Ann"}, "count": 3}"#;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
    }

    fn sync_io() -> ServerConfig {
        ServerConfig::builder()
            .allow_synchronous_io(true)
            .max_body_size(1024)
            .build()
    }

    fn request(body: &'static str) -> Request {
        Request::from_bytes(
            http::Request::post("/")
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .with_server_config(&sync_io())
    }

    fn param<T: serde::de::DeserializeOwned + Send + 'static>(
        name: &'static str,
        key: Option<&str>,
    ) -> ParameterMetadata {
        ParameterMetadata::new::<T>("orders::store", name).attribute(FromJsonProperty::new(key))
    }

    async fn read(
        req: &mut Request,
        meta: &ParameterMetadata,
        state: &mut ModelState,
        treat_empty_input_as_default: bool,
    ) -> InputFormatterResult {
        let mut ctx = InputFormatterContext::new(req, meta, state, treat_empty_input_as_default);
        JsonPropertyInputFormatter::new().read(&mut ctx).await
    }

    fn value<T: 'static>(result: InputFormatterResult) -> T {
        match result {
            InputFormatterResult::Success(value) => *value.downcast::<T>().unwrap(),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_binds_parameter_name_as_key() {
        let mut req = request(BODY);
        let mut state = ModelState::new();

        let result = read(&mut req, &param::<i32>("count", None), &mut state, false).await;
        assert_eq!(value::<i32>(result), 3);
        assert!(state.is_valid());
    }

    #[tokio::test]
    async fn test_binds_explicit_key_to_record() {
        let mut req = request(BODY);
        let mut state = ModelState::new();

        let result = read(&mut req, &param::<User>("owner", Some("user")), &mut state, false).await;
        assert_eq!(value::<User>(result), User { name: "Ann".into() });
    }

    #[tokio::test]
    async fn test_missing_key_is_no_value() {
        let mut req = request(BODY);
        let mut state = ModelState::new();

        let result = read(&mut req, &param::<i32>("total", Some("missing")), &mut state, false).await;
        assert!(matches!(result, InputFormatterResult::NoValue));
        assert!(state.is_valid());
    }

    #[tokio::test]
    async fn test_missing_key_with_empty_as_default() {
        let mut req = request(BODY);
        let mut state = ModelState::new();

        let optional = read(&mut req, &param::<Option<i32>>("missing", None), &mut state, true).await;
        assert_eq!(value::<Option<i32>>(optional), None);

        // `i32` cannot bind null, so it still has no value.
        let required = read(&mut req, &param::<i32>("missing", None), &mut state, true).await;
        assert!(matches!(required, InputFormatterResult::NoValue));
    }

    #[tokio::test]
    async fn test_invalid_value_records_path() {
        let mut req = request(r#"{"user": {"name": 7}, "count": "three"}"#);
        let mut state = ModelState::new();

        let count = read(&mut req, &param::<i32>("count", None), &mut state, false).await;
        assert!(count.has_error());
        assert!(state.errors_for("count").is_some());

        let user = read(&mut req, &param::<User>("user", None), &mut state, false).await;
        assert!(user.has_error());
        assert!(state.errors_for("user.name").is_some());
    }

    #[tokio::test]
    async fn test_malformed_body_fails_every_parameter() {
        let mut req = request(r#"{"count": 3"#);
        let mut state = ModelState::new();

        let count = read(&mut req, &param::<i32>("count", None), &mut state, false).await;
        let user = read(&mut req, &param::<User>("user", None), &mut state, false).await;
        let note = read(&mut req, &param::<Option<String>>("note", None), &mut state, true).await;

        assert!(count.has_error());
        assert!(user.has_error());
        assert!(note.has_error());
        assert!(!req.items().contains(PARSED_BODY_KEY));

        // Reported once, not under the parser's placeholder path.
        assert_eq!(state.error_count(), 1);
        assert_eq!(state.errors_for("").map(|e| e.len()), Some(1));
    }

    #[tokio::test]
    async fn test_oversized_body_fails_every_parameter() {
        let mut req = Request::from_body(
            http::Request::post("/")
                .header("content-type", "application/json")
                .body(Full::new(bytes::Bytes::from_static(br#"{"count": 3, "note": "hi"}"#)))
                .unwrap(),
        )
        .with_server_config(&ServerConfig::builder().allow_synchronous_io(true).max_body_size(4).build());
        let mut state = ModelState::new();

        let count = read(&mut req, &param::<i32>("count", None), &mut state, false).await;
        let note = read(&mut req, &param::<Option<String>>("note", None), &mut state, true).await;

        assert!(count.has_error());
        assert!(note.has_error(), "a lost body must not bind as empty");
        assert_eq!(
            state.errors_for(""),
            Some(&["Request body exceeds the limit of 4 bytes".to_string()][..])
        );
        assert_eq!(state.into_result().unwrap_err().status_code(), 413);
    }

    #[tokio::test]
    async fn test_property_names_ignore_case() {
        let mut req = request(r#"{"User": {"Name": "Ann"}, "Count": 3, "count2": 5, "COUNT2": 6}"#);
        let mut state = ModelState::new();

        let count = read(&mut req, &param::<i32>("count", None), &mut state, false).await;
        assert_eq!(value::<i32>(count), 3);

        let name = read(&mut req, &param::<String>("name", Some("user.name")), &mut state, false).await;
        assert_eq!(value::<String>(name), "Ann");

        // An exact match wins over a case-insensitive one.
        let exact = read(&mut req, &param::<i32>("COUNT2", None), &mut state, false).await;
        assert_eq!(value::<i32>(exact), 6);
        assert!(state.is_valid());
    }

    #[tokio::test]
    async fn test_body_parsed_once_per_request() {
        let mut req = request(BODY);
        let mut state = ModelState::new();

        read(&mut req, &param::<i32>("count", None), &mut state, false).await;
        let first = req.items().get::<Arc<Value>>(PARSED_BODY_KEY).unwrap().clone();

        read(&mut req, &param::<User>("user", None), &mut state, false).await;
        let second = req.items().get::<Arc<Value>>(PARSED_BODY_KEY).unwrap().clone();

        assert!(Arc::ptr_eq(&first, &second));
        // Held by the request items plus the two clones above.
        assert_eq!(Arc::strong_count(&first), 3);
    }

    #[tokio::test]
    async fn test_cached_document_is_reused() {
        let mut req = request(r#"{"count": 1}"#);
        req.items_mut()
            .insert(PARSED_BODY_KEY, Arc::new(json!({"count": 42})));
        let mut state = ModelState::new();

        let result = read(&mut req, &param::<i32>("count", None), &mut state, false).await;
        assert_eq!(value::<i32>(result), 42);
    }

    #[tokio::test]
    async fn test_body_rewound_after_parse() {
        let mut req = Request::from_body(
            http::Request::post("/")
                .header("content-type", "application/json")
                .body(Full::new(bytes::Bytes::from_static(BODY.as_bytes())))
                .unwrap(),
        )
        .with_server_config(&sync_io());
        let mut state = ModelState::new();

        read(&mut req, &param::<i32>("count", None), &mut state, false).await;

        let body = req.sync_body().unwrap();
        assert_eq!(body.position(), 0);
        let mut again = String::new();
        body.read_to_string(&mut again).unwrap();
        assert_eq!(again, BODY);
    }

    #[tokio::test]
    async fn test_sync_io_disallowed_is_request_level_error() {
        let mut req = request(BODY)
            .with_server_config(&ServerConfig::builder().allow_synchronous_io(false).build());
        let mut state = ModelState::new();

        let result = read(&mut req, &param::<i32>("count", None), &mut state, false).await;
        assert!(result.has_error());
        assert!(state.errors_for("").is_some());
    }

    #[tokio::test]
    async fn test_missing_request_fails() {
        let meta = param::<i32>("count", None);
        let mut state = ModelState::new();
        let mut ctx = InputFormatterContext {
            request: None,
            metadata: &meta,
            model_state: &mut state,
            treat_empty_input_as_default: false,
        };

        let result = JsonPropertyInputFormatter::new().read(&mut ctx).await;
        assert!(result.has_error());
    }

    #[tokio::test]
    async fn test_missing_annotation_fails_at_read() {
        let mut req = request(BODY);
        let meta = ParameterMetadata::new::<i32>("orders::store", "count");
        let mut state = ModelState::new();

        let result = read(&mut req, &meta, &mut state, false).await;
        assert!(result.has_error());
    }

    #[test]
    fn test_can_read_requires_annotation_and_json() {
        let formatter = JsonPropertyInputFormatter::new();
        let mut state = ModelState::new();

        let mut json = request(BODY);
        let annotated = param::<i32>("count", None);
        let ctx = InputFormatterContext::new(&mut json, &annotated, &mut state, false);
        assert!(formatter.can_read(&ctx));

        let plain = ParameterMetadata::new::<i32>("orders::store", "count");
        let ctx = InputFormatterContext::new(&mut json, &plain, &mut state, false);
        assert!(!formatter.can_read(&ctx));

        let mut xml = Request::from_bytes(
            http::Request::post("/")
                .header("content-type", "application/xml")
                .body(BODY)
                .unwrap(),
        );
        let ctx = InputFormatterContext::new(&mut xml, &annotated, &mut state, false);
        assert!(!formatter.can_read(&ctx));

        let duplicated = param::<i32>("count", None).attribute(ParameterAttribute::FromJsonProperty(
            FromJsonProperty::named("total"),
        ));
        let ctx = InputFormatterContext::new(&mut json, &duplicated, &mut state, false);
        assert!(!formatter.can_read(&ctx));
    }

    #[test]
    fn test_section_lookup() {
        let document = json!({
            "user": {"name": "Ann", "tags": ["a", "b"]},
            "a.b": 1,
            "empty": null
        });

        assert_eq!(section(&document, "user.name"), Some(&json!("Ann")));
        assert_eq!(section(&document, "user.tags.1"), Some(&json!("b")));
        assert_eq!(section(&document, "a.b"), Some(&json!(1)));
        assert_eq!(section(&document, "empty"), None);
        assert_eq!(section(&document, "user.missing"), None);
        assert_eq!(section(&document, "user.tags.x"), None);
        assert_eq!(section(&document, "USER.Name"), Some(&json!("Ann")));
        assert_eq!(section(&document, "A.B"), Some(&json!(1)));
    }
}
