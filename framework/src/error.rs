//! Framework-wide error types
//!
//! Provides a unified error type that can be used throughout the binding
//! pipeline and automatically converts to appropriate HTTP responses.

use std::collections::HashMap;
use thiserror::Error;

/// Field errors keyed by document path or parameter name
///
/// Contains a map of model keys to error messages, supporting multiple
/// errors per key. The empty key holds errors that belong to the request
/// or parameter as a whole rather than to a specific field.
///
/// # Response Format
///
/// ```json
/// {
///     "message": "The given data was invalid.",
///     "errors": {
///         "user.age": ["invalid type: string \"old\", expected u8"],
///         "count": ["A value for the 'count' parameter or property was not provided."]
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors {
    /// Map of field keys to their error messages
    pub errors: HashMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Create a new empty ValidationErrors
    pub fn new() -> Self {
        Self {
            errors: HashMap::new(),
        }
    }

    /// Add an error for a specific field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of messages across all fields
    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Messages recorded for a field, if any
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    /// Convert to JSON Value for response
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "message": "The given data was invalid.",
            "errors": self.errors
        })
    }
}

impl Default for ValidationErrors {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation failed: {:?}", self.errors)
    }
}

impl std::error::Error for ValidationErrors {}

/// Framework-wide error type
///
/// This enum represents all possible errors that can occur while reading,
/// binding and dispatching a request. It converts into an `HttpResponse`
/// so errors can be propagated using the `?` operator in handlers.
///
/// # Example
///
/// ```rust,ignore
/// use jsonprop::{FrameworkError, Request, Response};
///
/// pub async fn show(req: Request) -> Response {
///     let id = req.param("id")?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum FrameworkError {
    /// Parameter extraction failed (missing route parameter)
    #[error("Missing required parameter: {param_name}")]
    ParamError {
        /// The name of the parameter that failed extraction
        param_name: String,
    },

    /// Generic internal server error
    #[error("Internal server error: {message}")]
    Internal {
        /// The error message
        message: String,
    },

    /// Handler or binding configuration is invalid
    ///
    /// Raised while registering handler parameters, before any request is
    /// served.
    #[error("Invalid binding configuration: {message}")]
    Configuration {
        /// What is wrong with the configuration
        message: String,
    },

    /// Request body exceeds the configured limit (413 Payload Too Large)
    #[error("Request body exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// Maximum accepted body size in bytes
        limit: usize,
    },

    /// No input formatter can read the request (415 Unsupported Media Type)
    #[error("Unsupported content type '{content_type}'")]
    UnsupportedMediaType {
        /// The Content-Type the client sent (empty when missing)
        content_type: String,
    },

    /// Model binding errors (422 Unprocessable Entity)
    ///
    /// Contains the field errors recorded while binding handler parameters.
    #[error("Validation failed")]
    Validation(ValidationErrors),
}

impl FrameworkError {
    /// Create a ParamError for a missing parameter
    pub fn param(name: impl Into<String>) -> Self {
        Self::ParamError {
            param_name: name.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a PayloadTooLarge error
    pub fn payload_too_large(limit: usize) -> Self {
        Self::PayloadTooLarge { limit }
    }

    /// Create an UnsupportedMediaType error
    pub fn unsupported_media_type(content_type: impl Into<String>) -> Self {
        Self::UnsupportedMediaType {
            content_type: content_type.into(),
        }
    }

    /// Create a Validation error from ValidationErrors struct
    pub fn validation_errors(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ParamError { .. } => 400,
            Self::Internal { .. } => 500,
            Self::Configuration { .. } => 500,
            Self::PayloadTooLarge { .. } => 413,
            Self::UnsupportedMediaType { .. } => 415,
            Self::Validation(_) => 422,
        }
    }
}
