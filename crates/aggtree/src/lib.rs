//! # aggtree
//!
//! Builder, serializer and response transformer for search-engine
//! aggregation trees.
//!
//! An [`AggregationNode`] describes one aggregation (its engine type and
//! configuration) and its ordered children. A tree of nodes serializes to the
//! engine's `aggs` wire format with [`AggregationNode::to_json`], and the
//! engine's nested, heterogeneous response is turned back into a plain result
//! with [`AggregationNode::transform`].
//!
//! ## Key Features
//!
//! - **Fluent construction** - builders for the common aggregation types,
//!   shorthand string configuration, recursive [`nest`](AggregationNode::nest)
//! - **Virtual nodes** - client-side values such as [`doc_count`] that take
//!   part in transformation but are never sent to the engine
//! - **Shape-driven transformation** - containers, bucket lists, metric
//!   values and single-bucket objects are each recognized and unwrapped
//! - **Chainable post-transforms** - [`mapper`](AggregationNode::mapper),
//!   [`reducer`](AggregationNode::reducer), [`keyed`](AggregationNode::keyed),
//!   [`round`](AggregationNode::round), [`thru`](AggregationNode::thru), ...
//! - **Transport agnostic** - searches go through the [`SearchClient`] trait
//!
//! ## Quick Start
//!
//! ```rust
//! use aggtree::{doc_count, sum, terms, AggregationNode};
//! use serde_json::json;
//!
//! let tree = AggregationNode::empty().agg(
//!     terms("state")
//!         .with_id("states")
//!         .agg(doc_count().with_id("count"))
//!         .agg(sum("amount").with_id("total"))
//!         .mapper(|b| json!([b["key"], b["count"], b["total"]])),
//! );
//!
//! // Wire payload: the virtual `count` node is not sent.
//! assert_eq!(
//!     tree.to_json(),
//!     json!({
//!         "aggs": {
//!             "states": {
//!                 "terms": { "field": "state" },
//!                 "aggs": { "total": { "sum": { "field": "amount" } } }
//!             }
//!         }
//!     })
//! );
//!
//! let response = json!({
//!     "aggregations": {
//!         "states": {
//!             "buckets": [
//!                 { "key": "CA", "doc_count": 31, "total": { "value": 1200 } },
//!                 { "key": "TX", "doc_count": 16, "total": { "value": 640 } }
//!             ]
//!         }
//!     }
//! });
//! assert_eq!(
//!     tree.transform(&response),
//!     json!({ "states": [["CA", 31, 1200], ["TX", 16, 640]] })
//! );
//! ```
//!
//! ## Response Shapes
//!
//! | Raw sub-result | Result |
//! |----------------|--------|
//! | `{ "aggregations": { id: .. } }` | `{ id: child result }` |
//! | `{ "buckets": [ .. ] }` | enriched buckets, mapped or reduced |
//! | `{ "value": x }` | `x` |
//! | other object, node has children | `{ id: child result }` |
//! | anything else | returned unchanged |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           aggtree                             │
//! │                                                               │
//! │  AggregationNode                                              │
//! │  ├── build: builders / create / from_body, agg, nest          │
//! │  ├── to_json → wire payload (virtual nodes hoisted away)      │
//! │  ├── search → SearchClient::execute (async, caller transport) │
//! │  └── transform → shape dispatch → post-transform chain        │
//! │                                                               │
//! │  Supporting:                                                  │
//! │  ├── kind      - aggregation type registry, shorthand config  │
//! │  ├── ids       - injectable id generation                     │
//! │  └── config    - SearchOptions                                │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod builders;
mod config;
mod error;
mod ids;
mod kind;
mod node;
mod search;
mod traits;
mod transform;

// Public re-exports
pub use builders::{
    avg, avg_bucket, bucket_script, bucket_selector, cardinality, cumulative_sum, date_histogram,
    date_range, derivative, doc_count, extended_stats, filter, filters, histogram, max,
    max_bucket, min, min_bucket, missing, nested, percentiles, range, significant_terms, stats,
    sum, sum_bucket, terms, top_hits, value_count, NodeFactory,
};
pub use config::{SearchOptions, SearchOptionsBuilder};
pub use error::{AggError, AggResult};
pub use ids::{default_ids, IdGenerator, SequentialIds};
pub use kind::{
    AggConfig, AggregationFamily, BUCKET_AGGREGATIONS, MATRIX_AGGREGATIONS, METRIC_AGGREGATIONS,
    PIPELINE_AGGREGATIONS,
};
pub use node::{AggregationBody, AggregationNode, NestGroup};
pub use search::SearchRequest;
pub use traits::SearchClient;
pub use transform::bucket_key;
