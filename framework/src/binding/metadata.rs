//! Model metadata for handler parameters
//!
//! Metadata is built once per parameter when its handler is registered and
//! then only read, so binding never inspects types at request time. The
//! target type is captured as a converter function when the metadata is
//! created.

use super::{BindingSource, BindingSourceMetadata, FromJsonProperty};
use crate::error::FrameworkError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use thiserror::Error;

/// Type-erased conversion from a JSON section to the parameter type
pub type Converter = fn(&Value) -> Result<Box<dyn Any + Send>, ConversionError>;

/// A JSON value could not be converted into the parameter type
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ConversionError {
    path: Option<String>,
    #[source]
    source: serde_json::Error,
}

impl ConversionError {
    /// Path of the failing value inside the converted section, `None` when
    /// the section itself has the wrong shape
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The model-state key of the failing value, given the section's key
    pub fn model_key(&self, prefix: &str) -> String {
        join_path(prefix, self.path.as_deref())
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for ConversionError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        // Syntax errors before any key was read have no usable path.
        let known = err
            .path()
            .iter()
            .any(|segment| !matches!(segment, serde_path_to_error::Segment::Unknown));
        let path = known.then(|| err.path().to_string());
        Self {
            path,
            source: err.into_inner(),
        }
    }
}

impl From<serde_json::Error> for ConversionError {
    fn from(source: serde_json::Error) -> Self {
        Self { path: None, source }
    }
}

/// Join a document key with a path reported by `serde_path_to_error`
pub(crate) fn join_path(prefix: &str, path: Option<&str>) -> String {
    match path {
        None => prefix.to_string(),
        Some(path) if prefix.is_empty() => path.to_string(),
        Some(path) if path.starts_with('[') => format!("{}{}", prefix, path),
        Some(path) => format!("{}.{}", prefix, path),
    }
}

fn convert<T: DeserializeOwned + Send + 'static>(
    value: &Value,
) -> Result<Box<dyn Any + Send>, ConversionError> {
    let converted: T = serde_path_to_error::deserialize(value)?;
    Ok(Box::new(converted))
}

/// An annotation attached to a handler parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterAttribute {
    /// Bind from one property of the JSON body
    FromJsonProperty(FromJsonProperty),
    /// Bind from the whole body
    FromBody,
}

impl BindingSourceMetadata for ParameterAttribute {
    fn binding_source(&self) -> BindingSource {
        match self {
            Self::FromJsonProperty(attr) => attr.binding_source(),
            Self::FromBody => BindingSource::BODY,
        }
    }
}

impl From<FromJsonProperty> for ParameterAttribute {
    fn from(attr: FromJsonProperty) -> Self {
        Self::FromJsonProperty(attr)
    }
}

/// Identity of a parameter: the handler path plus the parameter name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterKey {
    pub handler: &'static str,
    pub parameter: &'static str,
}

impl std::fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.handler, self.parameter)
    }
}

/// Everything the binding pipeline knows about one handler parameter
#[derive(Clone)]
pub struct ParameterMetadata {
    handler: &'static str,
    name: &'static str,
    type_name: &'static str,
    is_required: bool,
    attributes: Vec<ParameterAttribute>,
    converter: Converter,
}

impl ParameterMetadata {
    /// Describe parameter `name` of `handler`, declared with type `T`
    ///
    /// # Example
    ///
    /// ```rust
    /// use jsonprop::binding::{FromJsonProperty, ParameterMetadata};
    ///
    /// let count = ParameterMetadata::new::<i32>("orders::store", "count")
    ///     .attribute(FromJsonProperty::default());
    /// assert_eq!(count.type_name(), "i32");
    /// ```
    pub fn new<T: DeserializeOwned + Send + 'static>(
        handler: &'static str,
        name: &'static str,
    ) -> Self {
        Self {
            handler,
            name,
            type_name: std::any::type_name::<T>(),
            is_required: true,
            attributes: Vec::new(),
            converter: convert::<T>,
        }
    }

    pub fn attribute(mut self, attribute: impl Into<ParameterAttribute>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    /// Mark the parameter as optional: a missing value binds as JSON `null`
    pub fn optional(mut self) -> Self {
        self.is_required = false;
        self
    }

    pub fn handler(&self) -> &'static str {
        self.handler
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn attributes(&self) -> &[ParameterAttribute] {
        &self.attributes
    }

    pub fn key(&self) -> ParameterKey {
        ParameterKey {
            handler: self.handler,
            parameter: self.name,
        }
    }

    /// The declared binding source, if any annotation carries one
    pub fn binding_source(&self) -> Option<BindingSource> {
        self.attributes.first().map(|a| a.binding_source())
    }

    /// The single `FromJsonProperty` annotation of this parameter
    ///
    /// More than one is a configuration error.
    pub fn json_property(&self) -> Result<Option<&FromJsonProperty>, FrameworkError> {
        let mut found = self.attributes.iter().filter_map(|a| match a {
            ParameterAttribute::FromJsonProperty(attr) => Some(attr),
            _ => None,
        });
        let first = found.next();
        if found.next().is_some() {
            return Err(FrameworkError::configuration(format!(
                "parameter {} has more than one #[from_json_property] annotation",
                self.key()
            )));
        }
        Ok(first)
    }

    /// Check the annotations: at most one, so the binding source is unambiguous
    pub fn validate(&self) -> Result<(), FrameworkError> {
        self.json_property()?;
        if self.attributes.len() > 1 {
            let sources: Vec<_> = self
                .attributes
                .iter()
                .map(|a| a.binding_source().display_name())
                .collect();
            return Err(FrameworkError::configuration(format!(
                "parameter {} has conflicting binding sources: {}",
                self.key(),
                sources.join(", ")
            )));
        }
        Ok(())
    }

    /// Whether two declarations of the same parameter bind identically
    pub fn same_binding(&self, other: &ParameterMetadata) -> bool {
        self.key() == other.key()
            && self.type_name == other.type_name
            && self.is_required == other.is_required
            && self.attributes == other.attributes
    }

    /// Convert a JSON section into the declared type
    pub fn convert(&self, value: &Value) -> Result<Box<dyn Any + Send>, ConversionError> {
        (self.converter)(value)
    }
}

impl std::fmt::Debug for ParameterMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterMetadata")
            .field("handler", &self.handler)
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("is_required", &self.is_required)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
        age: u8,
    }

    #[test]
    fn test_convert_to_declared_type() {
        let meta = ParameterMetadata::new::<User>("users::store", "user");
        let value = meta.convert(&json!({"name": "Ann", "age": 30})).unwrap();

        assert_eq!(
            *value.downcast::<User>().unwrap(),
            User {
                name: "Ann".into(),
                age: 30
            }
        );
    }

    #[test]
    fn test_conversion_error_reports_inner_path() {
        let meta = ParameterMetadata::new::<User>("users::store", "user");
        let err = meta.convert(&json!({"name": "Ann", "age": "old"})).unwrap_err();

        assert_eq!(err.path(), Some("age"));
        assert_eq!(err.model_key("user"), "user.age");
    }

    #[test]
    fn test_conversion_error_at_root_uses_prefix() {
        let meta = ParameterMetadata::new::<i32>("orders::store", "count");
        let err = meta.convert(&json!("three")).unwrap_err();

        assert_eq!(err.path(), None);
        assert_eq!(err.model_key("count"), "count");
    }

    #[test]
    fn test_join_path_for_sequences() {
        assert_eq!(join_path("items", Some("[2].sku")), "items[2].sku");
        assert_eq!(join_path("", Some("user.name")), "user.name");
    }

    #[test]
    fn test_duplicate_json_property_is_configuration_error() {
        let meta = ParameterMetadata::new::<i32>("orders::store", "count")
            .attribute(FromJsonProperty::default())
            .attribute(FromJsonProperty::named("total"));

        assert!(matches!(
            meta.json_property(),
            Err(FrameworkError::Configuration { .. })
        ));
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_conflicting_sources_rejected() {
        let meta = ParameterMetadata::new::<i32>("orders::store", "count")
            .attribute(FromJsonProperty::default())
            .attribute(ParameterAttribute::FromBody);

        let err = meta.validate().unwrap_err();
        assert!(err.to_string().contains("JsonProperty, Body"));
    }

    #[test]
    fn test_binding_source_from_annotation() {
        let plain = ParameterMetadata::new::<i32>("h", "p");
        assert_eq!(plain.binding_source(), None);
        assert!(plain.json_property().unwrap().is_none());

        let annotated = plain.clone().attribute(FromJsonProperty::default());
        assert_eq!(annotated.binding_source(), Some(BindingSource::JSON_PROPERTY));
        assert!(!annotated.same_binding(&plain));
    }
}
