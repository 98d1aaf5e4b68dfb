//! Per-request shared state

use std::any::Any;
use std::collections::HashMap;

/// Key-value bag that lives as long as one request
///
/// Binding components use it to share work between the parameters of a
/// single request, e.g. a body parsed once and read by several formatters.
#[derive(Default)]
pub struct RequestItems {
    items: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl RequestItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an item by key, if it exists and has type `T`
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.items.get(key).and_then(|item| item.downcast_ref::<T>())
    }

    /// Store an item, returning the previous value under that key
    pub fn insert<T: Any + Send + Sync>(
        &mut self,
        key: &'static str,
        value: T,
    ) -> Option<Box<dyn Any + Send + Sync>> {
        self.items.insert(key, Box::new(value))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Box<dyn Any + Send + Sync>> {
        self.items.remove(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl std::fmt::Debug for RequestItems {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.items.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_typed_get() {
        let mut items = RequestItems::new();
        items.insert("doc", Arc::new(serde_json::json!({"a": 1})));

        assert!(items.contains("doc"));
        assert!(items.get::<Arc<serde_json::Value>>("doc").is_some());
        assert!(items.get::<String>("doc").is_none());
        assert!(items.get::<Arc<serde_json::Value>>("other").is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let mut items = RequestItems::new();
        assert!(items.insert("n", 1u32).is_none());
        assert!(items.insert("n", 2u32).is_some());
        assert_eq!(items.get::<u32>("n"), Some(&2));
        assert_eq!(items.len(), 1);
    }
}
