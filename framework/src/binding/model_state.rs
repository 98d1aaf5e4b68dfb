use crate::error::{FrameworkError, ValidationErrors};

/// Default cap on recorded model errors per request
pub const DEFAULT_MAX_MODEL_ERRORS: usize = 200;

/// Field errors recorded while binding the parameters of one request
///
/// Keys are document paths (`user.age`, `items[0]`), parameter names, or
/// the empty string for errors not tied to a field.
#[derive(Debug, Clone)]
pub struct ModelState {
    errors: ValidationErrors,
    max_errors: usize,
    limit_reached: bool,
    unsupported_content_type: Option<String>,
    body_limit: Option<usize>,
}

impl ModelState {
    pub fn new() -> Self {
        Self::with_max_errors(DEFAULT_MAX_MODEL_ERRORS)
    }

    pub fn with_max_errors(max_errors: usize) -> Self {
        Self {
            errors: ValidationErrors::new(),
            max_errors,
            limit_reached: false,
            unsupported_content_type: None,
            body_limit: None,
        }
    }

    /// Record an error, returning `false` once the cap has been reached
    ///
    /// The first rejected error leaves a single request-level note under the
    /// empty key.
    pub fn try_add_model_error(&mut self, key: impl Into<String>, message: impl Into<String>) -> bool {
        if self.errors.len() >= self.max_errors {
            if !self.limit_reached {
                self.limit_reached = true;
                self.errors.add(
                    "",
                    format!("The maximum number of allowed model errors ({}) has been reached.", self.max_errors),
                );
            }
            return false;
        }
        self.errors.add(key, message);
        true
    }

    /// Record an error that belongs to the request rather than a field
    ///
    /// The message goes under the empty key. A body over the size limit is
    /// also remembered so the request answers 413.
    pub fn add_request_error(&mut self, err: &FrameworkError) -> bool {
        if let FrameworkError::PayloadTooLarge { limit } = err {
            self.body_limit = Some(*limit);
        }
        self.try_add_model_error("", err.to_string())
    }

    /// Note that no formatter could read the request's content type
    pub fn set_unsupported_content_type(&mut self, content_type: impl Into<String>) {
        self.unsupported_content_type = Some(content_type.into());
    }

    pub fn unsupported_content_type(&self) -> Option<&str> {
        self.unsupported_content_type.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn errors_for(&self, key: &str) -> Option<&[String]> {
        self.errors.get(key)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }

    /// `Err` when any error was recorded
    ///
    /// An unreadable content type wins over field errors and maps to 415,
    /// then a body over the size limit (413). Everything else is a
    /// [`FrameworkError::Validation`].
    pub fn into_result(self) -> Result<(), FrameworkError> {
        if let Some(content_type) = self.unsupported_content_type {
            return Err(FrameworkError::unsupported_media_type(content_type));
        }
        if let Some(limit) = self.body_limit {
            return Err(FrameworkError::payload_too_large(limit));
        }
        if self.is_valid() {
            Ok(())
        } else {
            Err(FrameworkError::Validation(self.errors))
        }
    }
}

impl Default for ModelState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_records_until_limit() {
        let mut state = ModelState::with_max_errors(2);
        assert!(state.try_add_model_error("a", "one"));
        assert!(state.try_add_model_error("b", "two"));
        assert!(!state.try_add_model_error("c", "three"));
        assert!(!state.try_add_model_error("d", "four"));

        assert!(state.errors_for("c").is_none());
        assert_eq!(state.errors_for("").map(|e| e.len()), Some(1));
        assert_eq!(state.error_count(), 3);
    }

    #[test]
    fn test_into_result() {
        assert!(ModelState::new().into_result().is_ok());

        let mut state = ModelState::new();
        state.try_add_model_error("count", "bad");
        assert!(matches!(state.into_result(), Err(FrameworkError::Validation(_))));
    }

    #[test]
    fn test_unsupported_content_type_is_415() {
        let mut state = ModelState::new();
        state.try_add_model_error("count", "Unsupported content type 'text/plain'.");
        state.set_unsupported_content_type("text/plain");

        let err = state.into_result().unwrap_err();
        assert_eq!(err.status_code(), 415);
    }

    #[test]
    fn test_oversized_body_is_413() {
        let mut state = ModelState::new();
        state.add_request_error(&FrameworkError::payload_too_large(4));
        assert_eq!(
            state.errors_for(""),
            Some(&["Request body exceeds the limit of 4 bytes".to_string()][..])
        );
        assert_eq!(state.into_result().unwrap_err().status_code(), 413);

        let mut state = ModelState::new();
        state.add_request_error(&FrameworkError::internal("Synchronous operations are disallowed."));
        assert_eq!(state.into_result().unwrap_err().status_code(), 422);
    }
}
