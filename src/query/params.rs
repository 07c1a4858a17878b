//! Multi-valued request parameters.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Request parameters, each name mapping to one or more values in the order
/// they were given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestParams {
    values: AHashMap<String, Vec<String>>,
}

impl RequestParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for `name`.
    pub fn add<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.values
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// Builder-style [`RequestParams::add`].
    pub fn with<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.add(name, value);
        self
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value of `name`; empty when absent.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether `name` has at least one value.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_valued() {
        let params = RequestParams::new()
            .with("fq", "id:1")
            .with("fq", "id:2")
            .with("q", "*:*");

        assert_eq!(params.get("fq"), Some("id:1"));
        assert_eq!(params.get_all("fq"), &["id:1".to_string(), "id:2".to_string()]);
        assert!(params.contains("q"));
        assert!(params.get_all("missing").is_empty());
        assert_eq!(params.get("missing"), None);
    }
}
