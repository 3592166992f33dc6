//! Convenience constructors, one per commonly used aggregation type.
//!
//! Each builder takes either a shorthand string or a full configuration map
//! (see [`AggConfig`]) and returns a node with a fresh id. Types without a
//! dedicated builder are reachable through [`AggregationNode::create`].
//!
//! The free functions draw ids from [`default_ids`]; the same builders are
//! available as methods on [`NodeFactory`], which draws them from a caller's
//! [`IdGenerator`].

use std::fmt;

use serde_json::Value;

use crate::ids::{default_ids, IdGenerator};
use crate::kind::AggConfig;
use crate::node::AggregationNode;

/// Typed builders bound to an id generator.
///
/// ```rust
/// use aggtree::{NodeFactory, SequentialIds};
///
/// let ids = SequentialIds::with_prefix("q_");
/// let nodes = NodeFactory::new(&ids);
/// let tree = nodes.empty().agg(nodes.terms("state").agg(nodes.sum("amount")));
///
/// assert_eq!(tree.id(), "q_0");
/// assert_eq!(tree.children()[0].id(), "q_1");
/// assert_eq!(tree.children()[0].children()[0].id(), "q_2");
/// ```
#[derive(Clone, Copy)]
pub struct NodeFactory<'a> {
    ids: &'a dyn IdGenerator,
}

impl<'a> NodeFactory<'a> {
    /// Creates a factory drawing ids from `ids`.
    pub fn new(ids: &'a dyn IdGenerator) -> Self {
        Self { ids }
    }

    /// Virtual node, see [`AggregationNode::empty`].
    pub fn empty(&self) -> AggregationNode {
        AggregationNode::empty_with(self.ids)
    }

    /// Virtual doc-count node, see [`doc_count`].
    pub fn doc_count(&self) -> AggregationNode {
        read_doc_count(AggregationNode::empty_with(self.ids))
    }
}

impl Default for NodeFactory<'static> {
    fn default() -> Self {
        Self::new(default_ids())
    }
}

impl fmt::Debug for NodeFactory<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeFactory").finish_non_exhaustive()
    }
}

macro_rules! builders {
    ($key:literal => $($(#[$doc:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(config: impl Into<AggConfig>) -> AggregationNode {
                AggregationNode::typed(default_ids(), stringify!($name), $key, config.into())
            }
        )+

        impl NodeFactory<'_> {
            $(
                #[doc = concat!("`", stringify!($name), "` with an id from this factory's generator.")]
                pub fn $name(&self, config: impl Into<AggConfig>) -> AggregationNode {
                    AggregationNode::typed(self.ids, stringify!($name), $key, config.into())
                }
            )+
        }
    };
}

// =============================================================================
// Metric aggregations (shorthand: field)
// =============================================================================

builders! { "field" =>
    /// `avg` of a numeric field.
    avg,
    /// Approximate number of distinct values of a field.
    cardinality,
    /// `extended_stats` of a numeric field.
    extended_stats,
    /// Maximum of a numeric or date field.
    max,
    /// Minimum of a numeric or date field.
    min,
    /// `percentiles` of a numeric field.
    percentiles,
    /// `stats` (count, min, max, avg, sum) of a numeric field.
    stats,
    /// Sum of a numeric field.
    ///
    /// ```rust
    /// use serde_json::json;
    ///
    /// assert_eq!(aggtree::sum("amount").to_json(), json!({ "sum": { "field": "amount" } }));
    /// ```
    sum,
    /// Top matching documents per bucket.
    top_hits,
    /// Number of values of a field.
    value_count,
}

// =============================================================================
// Bucket aggregations (shorthand: field)
// =============================================================================

builders! { "field" =>
    /// Buckets documents by date interval.
    date_histogram,
    /// Buckets documents by date ranges.
    date_range,
    /// Single bucket of documents matching a query.
    filter,
    /// One bucket per named query.
    filters,
    /// Buckets documents by numeric interval.
    histogram,
    /// Single bucket of documents missing a field.
    missing,
    /// Buckets documents by numeric ranges.
    range,
    /// Buckets of unusually frequent terms.
    significant_terms,
    /// One bucket per distinct value of a field.
    ///
    /// ```rust
    /// use serde_json::json;
    ///
    /// assert_eq!(aggtree::terms("state").to_json(), json!({ "terms": { "field": "state" } }));
    /// ```
    terms,
    /// Single bucket over nested documents.
    nested,
}

// =============================================================================
// Pipeline aggregations (shorthand: buckets_path)
// =============================================================================

builders! { "buckets_path" =>
    /// Average of a sibling metric across buckets.
    avg_bucket,
    /// Per-bucket script over other metrics of the bucket.
    bucket_script,
    /// Drops buckets for which a script is false.
    bucket_selector,
    /// Running total of a metric across buckets.
    cumulative_sum,
    /// Difference of a metric between consecutive buckets.
    derivative,
    /// Maximum of a sibling metric across buckets.
    max_bucket,
    /// Minimum of a sibling metric across buckets.
    min_bucket,
    /// Sum of a sibling metric across buckets.
    sum_bucket,
}

/// Virtual node yielding the `doc_count` of the enclosing bucket.
///
/// Nothing is sent to the engine for it; during transformation it reads the
/// count from the nearest ancestor bucket, or `null` at the root.
///
/// ```rust
/// use aggtree::{doc_count, terms, AggregationNode};
/// use serde_json::json;
///
/// let tree = AggregationNode::empty()
///     .agg(terms("state").with_id("states").agg(doc_count().with_id("count")));
/// assert_eq!(
///     tree.to_json(),
///     json!({ "aggs": { "states": { "terms": { "field": "state" } } } })
/// );
/// ```
pub fn doc_count() -> AggregationNode {
    read_doc_count(AggregationNode::empty())
}

fn read_doc_count(node: AggregationNode) -> AggregationNode {
    node.transformer(|_, ancestors| {
        ancestors
            .last()
            .and_then(|bucket| bucket.get("doc_count"))
            .cloned()
            .unwrap_or(Value::Null)
    })
}
