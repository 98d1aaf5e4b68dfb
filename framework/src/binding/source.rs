//! Binding sources: where the value of a handler parameter comes from

/// A tagged origin of input data for parameter binding
///
/// Sources compare by `id` only. The canonical sources are associated
/// constants, so there is exactly one value per origin in the program.
#[derive(Debug, Clone, Copy)]
pub struct BindingSource {
    id: &'static str,
    display_name: &'static str,
    is_greedy: bool,
    is_from_request: bool,
    is_composite: bool,
}

impl BindingSource {
    /// The whole request body
    pub const BODY: BindingSource = BindingSource::new("Body", "Body", true, true);

    /// The query string
    pub const QUERY: BindingSource = BindingSource::new("Query", "Query", false, true);

    /// Matched route parameters
    pub const PATH: BindingSource = BindingSource::new("Path", "Path", false, true);

    /// Request headers
    pub const HEADER: BindingSource = BindingSource::new("Header", "Header", true, true);

    /// Application state, not the request
    pub const SERVICES: BindingSource = BindingSource::new("Services", "Services", true, false);

    /// A named property inside a JSON request body
    ///
    /// Composite: it reads its data from [`BindingSource::BODY`] and is never
    /// itself a source a binder can serve.
    pub const JSON_PROPERTY: BindingSource = BindingSource {
        id: "JsonPropertyBindingSource",
        display_name: "JsonProperty",
        is_greedy: true,
        is_from_request: true,
        is_composite: true,
    };

    pub const fn new(
        id: &'static str,
        display_name: &'static str,
        is_greedy: bool,
        is_from_request: bool,
    ) -> Self {
        Self {
            id,
            display_name,
            is_greedy,
            is_from_request,
            is_composite: false,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    /// Whether a single binding consumes the whole source (e.g. the body)
    pub fn is_greedy(&self) -> bool {
        self.is_greedy
    }

    pub fn is_from_request(&self) -> bool {
        self.is_from_request
    }

    pub fn is_composite(&self) -> bool {
        self.is_composite
    }

    /// Whether a parameter declared with `self` can be served by a
    /// binder or formatter reading from `other`
    ///
    /// `self` is the parameter's declared source and may be composite;
    /// `other` is the source a consumer reads and never is.
    pub fn can_accept_data_from(&self, other: &BindingSource) -> bool {
        if other.is_composite {
            return false;
        }
        if *self == Self::JSON_PROPERTY {
            return *other == Self::BODY;
        }
        self == other
    }
}

impl PartialEq for BindingSource {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BindingSource {}

impl std::hash::Hash for BindingSource {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for BindingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_property_accepts_only_body() {
        let marker = BindingSource::JSON_PROPERTY;
        assert!(marker.can_accept_data_from(&BindingSource::BODY));
        assert!(!marker.can_accept_data_from(&BindingSource::QUERY));
        assert!(!marker.can_accept_data_from(&BindingSource::HEADER));
        assert!(!marker.can_accept_data_from(&BindingSource::JSON_PROPERTY));
    }

    #[test]
    fn test_composite_source_is_never_accepted() {
        assert!(!BindingSource::BODY.can_accept_data_from(&BindingSource::JSON_PROPERTY));
        assert!(!BindingSource::QUERY.can_accept_data_from(&BindingSource::JSON_PROPERTY));
    }

    #[test]
    fn test_plain_sources_accept_themselves() {
        assert!(BindingSource::BODY.can_accept_data_from(&BindingSource::BODY));
        assert!(!BindingSource::BODY.can_accept_data_from(&BindingSource::QUERY));
    }

    #[test]
    fn test_identity_is_by_id() {
        let copy = BindingSource::JSON_PROPERTY;
        assert_eq!(copy, BindingSource::JSON_PROPERTY);
        assert_eq!(copy.to_string(), "JsonProperty");
        assert!(copy.is_greedy() && copy.is_composite());
        assert!(!BindingSource::BODY.is_composite());
    }
}
