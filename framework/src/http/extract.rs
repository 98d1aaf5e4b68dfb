//! Request extraction for handler parameters
//!
//! `#[handler]` binds `#[from_json_property]` parameters through the model
//! binder and hands every other parameter to [`FromRequest`].

use super::Request;
use crate::binding::is_json_content_type;
use crate::error::FrameworkError;
use async_trait::async_trait;

/// Trait for types that can be extracted from an HTTP request
///
/// Only one consuming extractor can run per request, so a handler can have
/// at most one non-annotated parameter and it is extracted after all the
/// body-section parameters have been bound.
///
/// # Example
///
/// ```rust,ignore
/// #[handler]
/// pub async fn store(
///     #[from_json_property] count: i32,
///     req: Request,
/// ) -> Response {
///     // ...
/// }
/// ```
#[async_trait]
pub trait FromRequest: Sized + Send {
    /// Extract Self from the incoming request
    ///
    /// Returns `Err(FrameworkError)` if extraction fails, which will be
    /// converted to an appropriate HTTP error response.
    async fn from_request(req: Request) -> Result<Self, FrameworkError>;
}

/// Request passes through unchanged
#[async_trait]
impl FromRequest for Request {
    async fn from_request(req: Request) -> Result<Self, FrameworkError> {
        Ok(req)
    }
}

/// Whole JSON body, deserialized into `T`
#[derive(Debug)]
pub struct Json<T>(pub T);

#[async_trait]
impl<T> FromRequest for Json<T>
where
    T: serde::de::DeserializeOwned + Send,
{
    async fn from_request(req: Request) -> Result<Self, FrameworkError> {
        if !is_json_content_type(req.content_type()) {
            return Err(FrameworkError::unsupported_media_type(
                req.content_type().unwrap_or_default(),
            ));
        }
        req.json().await.map(Json)
    }
}
