//! Search request options.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options merged into every search request issued by
/// [`AggregationNode::search`](crate::AggregationNode::search).
///
/// Defaults to an aggregation-only search: `result_window` is `0`, so the
/// engine returns no document hits. Unknown engine parameters go in `extra`
/// and are passed through unchanged.
///
/// # Example
///
/// ```rust
/// use aggtree::SearchOptions;
/// use serde_json::json;
///
/// let options = SearchOptions::builder()
///     .with_index("orders")
///     .with_param("timeout", json!("5s"))
///     .build();
///
/// assert_eq!(
///     serde_json::to_value(&options).unwrap(),
///     json!({ "index": "orders", "resultWindow": 0, "timeout": "5s" })
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    /// Index (or index pattern) to search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Number of document hits to return alongside the aggregations.
    #[serde(default)]
    pub result_window: u64,
    /// Additional engine parameters.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchOptions {
    /// Creates a new builder for SearchOptions.
    pub fn builder() -> SearchOptionsBuilder {
        SearchOptionsBuilder::default()
    }

    /// Overlays `other` on top of these options.
    ///
    /// Fields set in `other` win; `extra` maps are merged key by key.
    pub fn merged_with(mut self, other: SearchOptions) -> SearchOptions {
        if other.index.is_some() {
            self.index = other.index;
        }
        if other.result_window != 0 {
            self.result_window = other.result_window;
        }
        for (key, value) in other.extra {
            self.extra.insert(key, value);
        }
        self
    }
}

/// Builder for SearchOptions.
#[derive(Debug, Clone, Default)]
pub struct SearchOptionsBuilder {
    index: Option<String>,
    result_window: u64,
    extra: Map<String, Value>,
}

impl SearchOptionsBuilder {
    /// Sets the index to search.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Sets the number of document hits to return.
    pub fn with_result_window(mut self, result_window: u64) -> Self {
        self.result_window = result_window;
        self
    }

    /// Adds an engine parameter passed through verbatim.
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Builds the SearchOptions.
    pub fn build(self) -> SearchOptions {
        SearchOptions {
            index: self.index,
            result_window: self.result_window,
            extra: self.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_aggregation_only() {
        let options = SearchOptions::default();
        assert_eq!(options.result_window, 0);
        assert_eq!(serde_json::to_value(&options).unwrap(), json!({ "resultWindow": 0 }));
    }

    #[test]
    fn test_builder() {
        let options = SearchOptions::builder()
            .with_index("orders")
            .with_result_window(10)
            .with_param("preference", json!("_local"))
            .build();
        assert_eq!(options.index.as_deref(), Some("orders"));
        assert_eq!(options.result_window, 10);
        assert_eq!(options.extra["preference"], json!("_local"));
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let base = SearchOptions::builder()
            .with_index("orders")
            .with_param("timeout", json!("1s"))
            .build();
        let overlay = SearchOptions::builder()
            .with_result_window(5)
            .with_param("timeout", json!("5s"))
            .build();
        let merged = base.merged_with(overlay);
        assert_eq!(merged.index.as_deref(), Some("orders"));
        assert_eq!(merged.result_window, 5);
        assert_eq!(merged.extra["timeout"], json!("5s"));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let options: SearchOptions =
            serde_json::from_value(json!({ "index": "sales", "resultWindow": 3, "routing": "a" }))
                .unwrap();
        assert_eq!(options.result_window, 3);
        assert_eq!(options.extra["routing"], json!("a"));
    }
}
