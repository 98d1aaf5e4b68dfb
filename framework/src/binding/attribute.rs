//! The `#[from_json_property]` parameter annotation

use super::BindingSource;

/// Associates a parameter annotation with the source its data comes from
pub trait BindingSourceMetadata {
    fn binding_source(&self) -> BindingSource;
}

/// Binds a handler parameter to one property of the JSON request body
///
/// Without an explicit name the parameter's own name is the lookup key.
/// Nothing is checked when the annotation is created; the name is resolved
/// when the formatter runs.
///
/// # Example
///
/// ```rust,ignore
/// #[handler]
/// pub async fn store(
///     #[from_json_property] count: i32,
///     #[from_json_property("user")] owner: User,
/// ) -> Response {
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FromJsonProperty {
    property_name: Option<String>,
}

impl FromJsonProperty {
    pub fn new(property_name: Option<&str>) -> Self {
        Self {
            property_name: property_name.map(str::to_string),
        }
    }

    /// Bind to an explicitly named property
    pub fn named(property_name: impl Into<String>) -> Self {
        Self {
            property_name: Some(property_name.into()),
        }
    }

    /// The explicit property name, `None` when the parameter name is used
    pub fn property_name(&self) -> Option<&str> {
        self.property_name.as_deref()
    }

    /// The key to look up for a parameter called `parameter_name`
    pub fn resolve_name<'a>(&'a self, parameter_name: &'a str) -> &'a str {
        self.property_name.as_deref().unwrap_or(parameter_name)
    }
}

impl BindingSourceMetadata for FromJsonProperty {
    fn binding_source(&self) -> BindingSource {
        BindingSource::JSON_PROPERTY
    }
}
