//! Procedural macros for jsonprop
//!
//! This crate provides the `#[handler]` attribute, which turns an async
//! function with typed parameters into a route handler taking a `Request`.

use proc_macro::TokenStream;

mod handler;

/// Attribute macro for controller handler functions
///
/// Parameters annotated with `#[from_json_property]` are bound to one
/// property of the JSON request body. The annotation takes an optional
/// property name, otherwise the parameter name is used. Dotted names reach
/// nested properties. `Option<T>` parameters are optional.
///
/// At most one other parameter is allowed; it is extracted with
/// `FromRequest` after the body properties have been bound. A `Request`
/// parameter receives the request itself.
///
/// # Examples
///
/// ```rust,ignore
/// use jsonprop::{handler, json, Request, Response};
///
/// // POST {"user": {"name": "Ann"}, "count": 3}
/// #[handler]
/// pub async fn store(
///     #[from_json_property] count: i32,
///     #[from_json_property("user")] owner: User,
///     #[from_json_property(name = "note")] note: Option<String>,
///     req: Request,
/// ) -> Response {
///     json(serde_json::json!({ "owner": owner.name, "count": count }))
/// }
/// ```
///
/// When any property cannot be bound the handler body does not run and the
/// handler returns 422 with the collected errors.
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, input: TokenStream) -> TokenStream {
    handler::handler_impl(attr, input)
}
