//! Parameter binding from the request body
//!
//! Handler parameters are bound by input formatters. The default pipeline
//! binds one parameter from the whole JSON body; with
//! [`Binding::enable_json_properties`] parameters annotated with
//! `#[from_json_property]` are each bound to one property of the body
//! instead:
//!
//! ```rust,ignore
//! use jsonprop::{handler, json, Response};
//! use serde_json::json;
//!
//! // POST {"user": {"name": "Ann"}, "count": 3}
//! #[handler]
//! pub async fn store(
//!     #[from_json_property] count: i32,
//!     #[from_json_property("user")] owner: User,
//! ) -> Response {
//!     json(json!({ "owner": owner.name, "count": count }))
//! }
//! ```
//!
//! The body is parsed once per request and shared by every annotated
//! parameter. Conversion errors are collected in [`ModelState`] and turned
//! into a 422 response.

mod attribute;
mod binder;
mod formatter;
mod json;
mod json_property;
mod metadata;
mod model_state;
mod options;
mod registry;
mod source;

pub use attribute::{BindingSourceMetadata, FromJsonProperty};
pub use binder::{bind_parameter, BodyModelBinder, ModelBindingResult};
pub use formatter::{FormatterCollection, InputFormatter, InputFormatterContext, InputFormatterResult};
pub use json::{is_json_content_type, JsonInputFormatter};
pub use json_property::{section, JsonPropertyInputFormatter, PARSED_BODY_KEY};
pub use metadata::{ConversionError, Converter, ParameterAttribute, ParameterKey, ParameterMetadata};
pub use model_state::{ModelState, DEFAULT_MAX_MODEL_ERRORS};
pub use options::{add_json_property_formatter, Binding, BindingOptions};
pub use registry::{
    lookup, register, register_handler_parameters, resolve_parameter, BindingRegistry,
    HandlerParameterEntry,
};
pub use source::BindingSource;
