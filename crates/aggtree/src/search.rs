//! Issuing a tree as a search and transforming the response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::SearchOptions;
use crate::node::AggregationNode;
use crate::traits::SearchClient;

/// Payload handed to a [`SearchClient`]: the merged options plus the
/// serialized aggregation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Effective options (defaults overlaid with the caller's).
    #[serde(flatten)]
    pub options: SearchOptions,
    /// The aggregation tree's wire payload.
    pub query: Value,
}

impl SearchRequest {
    /// Renders the request as one JSON object, options and `query` side by
    /// side.
    pub fn body(&self) -> Value {
        let mut body = match serde_json::to_value(&self.options) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        body.insert("query".to_string(), self.query.clone());
        Value::Object(body)
    }
}

impl AggregationNode {
    /// Sends this tree to the engine and transforms the response.
    ///
    /// The request starts from aggregation-only defaults (no document hits),
    /// overlaid with `options`, with the tree's payload as `query`. Errors
    /// from the client are returned as-is.
    ///
    /// ```rust
    /// use aggtree::{sum, AggregationNode, SearchClient, SearchOptions, SearchRequest};
    /// use serde_json::{json, Value};
    ///
    /// struct Canned;
    ///
    /// #[async_trait::async_trait]
    /// impl SearchClient for Canned {
    ///     type Error = std::convert::Infallible;
    ///
    ///     async fn execute(&self, _request: SearchRequest) -> Result<Value, Self::Error> {
    ///         Ok(json!({ "aggregations": { "total": { "value": 42 } } }))
    ///     }
    /// }
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let tree = AggregationNode::empty().agg(sum("amount").with_id("total"));
    /// let result = tree.search(&Canned, SearchOptions::default()).await.unwrap();
    /// assert_eq!(result, json!({ "total": 42 }));
    /// # }
    /// ```
    pub async fn search<C>(&self, client: &C, options: SearchOptions) -> Result<Value, C::Error>
    where
        C: SearchClient + ?Sized,
    {
        let request = SearchRequest {
            options: SearchOptions::default().merged_with(options),
            query: self.to_json(),
        };
        debug!(
            target: "aggtree::search",
            root = %self.id(),
            index = request.options.index.as_deref().unwrap_or("*"),
            result_window = request.options.result_window,
            "issuing aggregation search"
        );

        let response = client.execute(request).await?;

        debug!(target: "aggtree::search", root = %self.id(), "transforming search response");
        Ok(self.transform(&response))
    }
}
