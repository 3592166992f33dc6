//! The remote search boundary.
//!
//! This crate does not talk to a search engine itself. Callers implement
//! [`SearchClient`] over whatever transport they use, and
//! [`AggregationNode::search`](crate::AggregationNode::search) drives it.
//!
//! # Example: Implementing SearchClient over an HTTP client
//!
//! ```ignore
//! use aggtree::{SearchClient, SearchRequest};
//! use serde_json::Value;
//!
//! struct HttpSearch {
//!     http: reqwest::Client,
//!     base_url: String,
//! }
//!
//! #[async_trait::async_trait]
//! impl SearchClient for HttpSearch {
//!     type Error = reqwest::Error;
//!
//!     async fn execute(&self, request: SearchRequest) -> Result<Value, Self::Error> {
//!         let index = request.options.index.as_deref().unwrap_or("_all");
//!         self.http
//!             .post(format!("{}/{}/_search", self.base_url, index))
//!             .json(&request.body())
//!             .send()
//!             .await?
//!             .json()
//!             .await
//!     }
//! }
//! ```

use serde_json::Value;

use crate::search::SearchRequest;

/// A client able to run one search request against the engine.
///
/// Implementations own transport, authentication and retries. Whatever
/// error they return is handed back to the caller of
/// [`AggregationNode::search`](crate::AggregationNode::search) unchanged.
#[async_trait::async_trait]
pub trait SearchClient: Send + Sync {
    /// Error returned by the transport.
    type Error: Send;

    /// Runs the request and returns the raw engine response.
    async fn execute(&self, request: SearchRequest) -> Result<Value, Self::Error>;
}
