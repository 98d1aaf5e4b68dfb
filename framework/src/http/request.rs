use super::body::{collect_body, parse_form, parse_json, BoxError, BufferedBody, RequestBody};
use super::items::RequestItems;
use super::ParamError;
use crate::config::ServerConfig;
use crate::error::FrameworkError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// HTTP request wrapper used by handlers and input formatters
///
/// Besides the head and body it carries the matched route parameters, the
/// per-request [`RequestItems`] bag and the body handling limits that were
/// configured on the server.
#[derive(Debug)]
pub struct Request {
    head: http::request::Parts,
    body: RequestBody,
    params: HashMap<String, String>,
    items: RequestItems,
    max_body_size: usize,
    allow_synchronous_io: bool,
}

impl Request {
    /// Wrap an incoming hyper request
    pub fn new(inner: hyper::Request<hyper::body::Incoming>) -> Self {
        Self::from_body(inner)
    }

    /// Wrap a request with any streaming body
    pub fn from_body<B>(inner: hyper::Request<B>) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        let (head, body) = inner.into_parts();
        Self::with_body(head, RequestBody::streaming(body))
    }

    /// Wrap a request whose body is already in memory
    ///
    /// # Example
    ///
    /// ```rust
    /// use jsonprop::Request;
    ///
    /// let req = Request::from_bytes(
    ///     http::Request::post("/orders")
    ///         .header("content-type", "application/json")
    ///         .body(r#"{"count": 3}"#)
    ///         .unwrap(),
    /// );
    /// assert_eq!(req.content_type(), Some("application/json"));
    /// ```
    pub fn from_bytes<B: Into<Bytes>>(inner: hyper::Request<B>) -> Self {
        let (head, body) = inner.into_parts();
        Self::with_body(head, RequestBody::Buffered(BufferedBody::new(body)))
    }

    fn with_body(head: http::request::Parts, body: RequestBody) -> Self {
        let defaults = crate::config::Config::get::<ServerConfig>().unwrap_or_default();
        Self {
            head,
            body,
            params: HashMap::new(),
            items: RequestItems::new(),
            max_body_size: defaults.max_body_size,
            allow_synchronous_io: defaults.allow_synchronous_io,
        }
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    /// Apply the body limits of a server configuration
    pub fn with_server_config(mut self, config: &ServerConfig) -> Self {
        self.max_body_size = config.max_body_size;
        self.allow_synchronous_io = config.allow_synchronous_io;
        self
    }

    pub fn method(&self) -> &hyper::Method {
        &self.head.method
    }

    pub fn path(&self) -> &str {
        self.head.uri.path()
    }

    /// Get a route parameter by name (e.g., /users/{id})
    /// Returns Err(ParamError) if the parameter is missing, enabling use of `?` operator
    pub fn param(&self, name: &str) -> Result<&str, ParamError> {
        self.params
            .get(name)
            .map(|s| s.as_str())
            .ok_or_else(|| ParamError {
                param_name: name.to_string(),
            })
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn headers(&self) -> &http::HeaderMap {
        &self.head.headers
    }

    /// Get a header value by name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get the Content-Type header
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    fn content_length(&self) -> Option<usize> {
        self.header("content-length").and_then(|v| v.parse().ok())
    }

    /// Per-request shared state
    pub fn items(&self) -> &RequestItems {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut RequestItems {
        &mut self.items
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub fn allows_synchronous_io(&self) -> bool {
        self.allow_synchronous_io
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Make the body re-readable by collecting it into memory
    ///
    /// Calling it on an already buffered body does nothing. When collecting
    /// fails, the error is kept and returned by every later call, so no
    /// consumer mistakes the lost body for an empty one.
    pub async fn enable_buffering(&mut self) -> Result<&mut BufferedBody, FrameworkError> {
        if let RequestBody::Streaming(_) = self.body {
            let interrupted = RequestBody::Failed(FrameworkError::internal(
                "Request body was not read to the end",
            ));
            if let RequestBody::Streaming(stream) = std::mem::replace(&mut self.body, interrupted) {
                self.body = match collect_body(stream, self.content_length(), self.max_body_size).await {
                    Ok(bytes) => RequestBody::Buffered(BufferedBody::new(bytes)),
                    Err(err) => RequestBody::Failed(err),
                };
            }
        }

        match &mut self.body {
            RequestBody::Buffered(buffered) => Ok(buffered),
            RequestBody::Failed(err) => Err(err.clone()),
            RequestBody::Streaming(_) => Err(FrameworkError::internal("request body is not buffered")),
        }
    }

    /// Blocking access to a buffered body
    ///
    /// Fails unless the server allows synchronous IO and the body has been
    /// buffered with [`Request::enable_buffering`].
    pub fn sync_body(&mut self) -> Result<&mut BufferedBody, FrameworkError> {
        if !self.allow_synchronous_io {
            return Err(FrameworkError::internal(
                "Synchronous operations are disallowed. Enable `allow_synchronous_io` on the server configuration.",
            ));
        }
        match &mut self.body {
            RequestBody::Buffered(buffered) => Ok(buffered),
            RequestBody::Failed(err) => Err(err.clone()),
            RequestBody::Streaming(_) => Err(FrameworkError::internal(
                "Request body must be buffered before it is read synchronously",
            )),
        }
    }

    /// Consume the request and collect the body as bytes
    pub async fn body_bytes(mut self) -> Result<(RequestParts, Bytes), FrameworkError> {
        let bytes = self.enable_buffering().await?.as_bytes().clone();
        let content_type = self.content_type().map(|s| s.to_string());

        Ok((
            RequestParts {
                params: self.params,
                content_type,
            },
            bytes,
        ))
    }

    /// Parse the whole request body as JSON
    ///
    /// Consumes the request. Use `#[from_json_property]` parameters to bind
    /// several values out of one body instead.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, FrameworkError> {
        let (_, bytes) = self.body_bytes().await?;
        parse_json(&bytes)
    }

    /// Parse the request body as form-urlencoded
    pub async fn form<T: DeserializeOwned>(self) -> Result<T, FrameworkError> {
        let (_, bytes) = self.body_bytes().await?;
        parse_form(&bytes)
    }

    /// Parse the request body based on Content-Type header
    ///
    /// - `application/x-www-form-urlencoded` -> Form parsing
    /// - Otherwise -> JSON parsing (default)
    pub async fn input<T: DeserializeOwned>(self) -> Result<T, FrameworkError> {
        let (parts, bytes) = self.body_bytes().await?;

        match parts.content_type.as_deref() {
            Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => parse_form(&bytes),
            _ => parse_json(&bytes),
        }
    }
}

/// Request parts after body has been separated
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub params: HashMap<String, String>,
    pub content_type: Option<String>,
}
