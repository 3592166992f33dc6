//! Response transformation.
//!
//! An engine response is walked alongside the aggregation tree that produced
//! it. Each node picks what to do from the shape of its raw sub-result, in a
//! fixed priority order:
//!
//! 1. `{ "aggregations": { id: ... } }` - a container keyed by child id
//!    (the response root); children are transformed into a mapping.
//! 2. `{ "buckets": [ ... ] }` - a multi-bucket aggregation; every bucket is
//!    enriched with its children's results, then the node's bucket step runs
//!    (default: keep the sequence, or a [`mapper`](AggregationNode::mapper) /
//!    [`reducer`](AggregationNode::reducer)).
//! 3. `{ "value": x }` - a metric; `x` is returned.
//! 4. any other object, on a node with children - a single implicit bucket
//!    (e.g. a `filter` aggregation); children are transformed into a mapping.
//! 5. anything else is returned unchanged.
//!
//! The result then runs through the node's post-transform chain. Nothing in
//! here fails: missing sub-results come out as `null`, and `null` child
//! results are left out of the enclosing object.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Number, Value};

use crate::node::AggregationNode;

/// Whole-node transform: `(raw, ancestor buckets) -> result`.
pub(crate) type TransformFn = Arc<dyn Fn(&Value, &[&Value]) -> Value + Send + Sync>;
/// Post-transform step: `result -> result`.
pub(crate) type PostTransformFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;
type BucketMapFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;
type BucketFoldFn = Arc<dyn Fn(Value, Value) -> Value + Send + Sync>;

static NULL: Value = Value::Null;

/// Beyond this many places an `f64` has nothing left to round.
const MAX_DECIMALS: u32 = 15;

/// What a multi-bucket node does with its enriched buckets.
#[derive(Clone)]
pub(crate) enum BucketStep {
    /// Keep the enriched buckets as a sequence.
    Enrich,
    /// Map each enriched bucket to a value.
    Map(BucketMapFn),
    /// Fold the enriched buckets, left to right.
    Fold { step: BucketFoldFn, initial: Value },
}

impl fmt::Debug for BucketStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketStep::Enrich => write!(f, "Enrich"),
            BucketStep::Map(_) => write!(f, "Map"),
            BucketStep::Fold { initial, .. } => write!(f, "Fold({})", initial),
        }
    }
}

/// The observed shape of a raw sub-result.
enum ResponseShape<'a> {
    Container(&'a Value),
    Buckets(&'a [Value]),
    Metric(&'a Value),
    Object,
    Other,
}

impl<'a> ResponseShape<'a> {
    fn of(raw: &'a Value) -> Self {
        let Value::Object(map) = raw else {
            return ResponseShape::Other;
        };
        if let Some(container @ Value::Object(_)) = map.get("aggregations") {
            ResponseShape::Container(container)
        } else if let Some(Value::Array(buckets)) = map.get("buckets") {
            ResponseShape::Buckets(buckets)
        } else if let Some(value) = map.get("value") {
            ResponseShape::Metric(value)
        } else {
            ResponseShape::Object
        }
    }
}

impl AggregationNode {
    // =========================================================================
    // Transformation
    // =========================================================================

    /// Transforms a raw engine response for this (root) node.
    pub fn transform(&self, raw: &Value) -> Value {
        self.transform_within(raw, &[])
    }

    /// Transforms a raw sub-result, given the stack of enclosing buckets.
    ///
    /// The last element of `ancestors` is the bucket this sub-result was
    /// read from.
    pub fn transform_within(&self, raw: &Value, ancestors: &[&Value]) -> Value {
        let base = match &self.transformer {
            Some(transform) => transform(raw, ancestors),
            None => self.dispatch(raw, ancestors),
        };
        self.post_transforms
            .iter()
            .fold(base, |value, step| step(value))
    }

    fn dispatch(&self, raw: &Value, ancestors: &[&Value]) -> Value {
        match ResponseShape::of(raw) {
            ResponseShape::Container(container) => self.transform_children(container, ancestors),
            ResponseShape::Buckets(buckets) => self.transform_buckets(buckets, ancestors),
            ResponseShape::Metric(value) => value.clone(),
            ResponseShape::Object if !self.children.is_empty() => {
                let stack = push_ancestor(ancestors, raw);
                self.transform_children(raw, &stack)
            }
            ResponseShape::Object | ResponseShape::Other => raw.clone(),
        }
    }

    /// Builds `{ child id: child result }` from a container keyed by id.
    fn transform_children(&self, container: &Value, ancestors: &[&Value]) -> Value {
        let mut out = Map::new();
        for child in &self.children {
            let result = child.transform_within(child_input(child, container), ancestors);
            set_or_omit(&mut out, child.id(), result);
        }
        Value::Object(out)
    }

    fn transform_buckets(&self, buckets: &[Value], ancestors: &[&Value]) -> Value {
        let enriched = buckets
            .iter()
            .map(|bucket| self.enrich_bucket(bucket, ancestors));
        match &self.bucket_step {
            BucketStep::Enrich => Value::Array(enriched.collect()),
            BucketStep::Map(map) => Value::Array(enriched.map(|bucket| map(bucket)).collect()),
            BucketStep::Fold { step, initial } => {
                enriched.fold(initial.clone(), |acc, bucket| step(acc, bucket))
            }
        }
    }

    /// Replaces each child's raw entry in the bucket with its transformed
    /// result.
    fn enrich_bucket(&self, bucket: &Value, ancestors: &[&Value]) -> Value {
        let Value::Object(fields) = bucket else {
            return bucket.clone();
        };
        let stack = push_ancestor(ancestors, bucket);

        let mut enriched = fields.clone();
        for child in &self.children {
            let result = child.transform_within(child_input(child, bucket), &stack);
            set_or_omit(&mut enriched, child.id(), result);
        }
        Value::Object(enriched)
    }

    // =========================================================================
    // Transform configuration
    // =========================================================================

    /// Replaces the whole transform of this node.
    ///
    /// The function receives the raw sub-result and the ancestor bucket
    /// stack. Post-transforms still run afterwards.
    pub fn transformer<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Value, &[&Value]) -> Value + Send + Sync + 'static,
    {
        self.transformer = Some(Arc::new(transform));
        self
    }

    /// Maps every enriched bucket through `map`, yielding one value per
    /// bucket in response order.
    pub fn mapper<F>(mut self, map: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.bucket_step = BucketStep::Map(Arc::new(map));
        self
    }

    /// Folds the enriched buckets left to right, starting from `initial`.
    pub fn reducer<F>(mut self, step: F, initial: Value) -> Self
    where
        F: Fn(Value, Value) -> Value + Send + Sync + 'static,
    {
        self.bucket_step = BucketStep::Fold {
            step: Arc::new(step),
            initial,
        };
        self
    }

    /// Appends a step to the post-transform chain.
    ///
    /// ```rust
    /// use aggtree::sum;
    /// use serde_json::json;
    ///
    /// let node = sum("amount")
    ///     .thru(|_| json!(100))
    ///     .thru(|v| json!(format!("${}", v)));
    /// assert_eq!(node.transform(&json!({ "value": 1 })), json!("$100"));
    /// ```
    pub fn thru<F>(mut self, step: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.post_transforms.push(Arc::new(step));
        self
    }

    // =========================================================================
    // Conveniences
    // =========================================================================

    /// Rounds a numeric result to `decimals` places (at most 15).
    pub fn round(self, decimals: u32) -> Self {
        let exponent = i32::try_from(decimals.min(MAX_DECIMALS)).unwrap_or(0);
        let factor = 10f64.powi(exponent);
        self.thru(move |value| match value.as_f64() {
            Some(n) => number_value((n * factor).round() / factor),
            None => value,
        })
    }

    /// Multiplies a numeric result by `factor`, e.g. for unit conversion.
    pub fn scale(self, factor: f64) -> Self {
        self.thru(move |value| match value.as_f64() {
            Some(n) => number_value(n * factor),
            None => value,
        })
    }

    /// Keeps only the listed keys of an object result.
    ///
    /// Applied element-wise when the result is a sequence.
    pub fn pick<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        self.thru(move |value| {
            filter_keys(value, &|key: &str| keys.iter().any(|k| k == key))
        })
    }

    /// Removes the listed keys from an object result.
    ///
    /// Applied element-wise when the result is a sequence.
    pub fn omit<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        self.thru(move |value| {
            filter_keys(value, &|key: &str| !keys.iter().any(|k| k == key))
        })
    }

    /// Replaces an object result by one of its entries (`null` if absent).
    pub fn get(self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.thru(move |value| match value {
            Value::Object(mut map) => map.shift_remove(&key).unwrap_or(Value::Null),
            _ => Value::Null,
        })
    }

    /// Replaces a sequence result by its first element (`null` if empty).
    pub fn first(self) -> Self {
        self.thru(|value| match value {
            Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
            _ => Value::Null,
        })
    }

    /// Re-keys the buckets into an object, using `key_fn` on each enriched
    /// bucket. Later buckets win on key collisions.
    pub fn index_by_key<F>(self, key_fn: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.reducer(
            move |acc, bucket| insert_entry(acc, key_fn(&bucket), bucket),
            Value::Object(Map::new()),
        )
    }

    /// Re-keys the buckets by bucket key into
    /// `{ <key>: { count: <doc_count>, <child id>: <child result>, ... } }`.
    pub fn keyed(self) -> Self {
        self.reducer(
            |acc, bucket| {
                let key = bucket_key(&bucket);
                insert_entry(acc, key, keyed_entry(bucket))
            },
            Value::Object(Map::new()),
        )
    }
}

/// Extends the ancestor stack by one bucket. Only references are copied.
fn push_ancestor<'v>(ancestors: &[&'v Value], bucket: &'v Value) -> Vec<&'v Value> {
    let mut stack = Vec::with_capacity(ancestors.len() + 1);
    stack.extend_from_slice(ancestors);
    stack.push(bucket);
    stack
}

/// Sub-result a child reads from its parent's container.
///
/// Virtual children have no entry of their own; they see the whole container
/// so that their hoisted descendants can still be found.
fn child_input<'v>(child: &AggregationNode, container: &'v Value) -> &'v Value {
    if child.is_virtual() {
        container
    } else {
        container.get(child.id()).unwrap_or(&NULL)
    }
}

fn set_or_omit(map: &mut Map<String, Value>, key: &str, value: Value) {
    if value.is_null() {
        map.shift_remove(key);
    } else {
        map.insert(key.to_string(), value);
    }
}

fn filter_keys(value: Value, keep: &dyn Fn(&str) -> bool) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(k, _)| keep(k)).collect()),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| filter_keys(item, keep))
                .collect(),
        ),
        other => other,
    }
}

fn insert_entry(acc: Value, key: String, entry: Value) -> Value {
    let mut map = match acc {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.insert(key, entry);
    Value::Object(map)
}

fn keyed_entry(bucket: Value) -> Value {
    let Value::Object(fields) = bucket else {
        return bucket;
    };
    let mut entry = Map::new();
    if let Some(count) = fields.get("doc_count") {
        entry.insert("count".to_string(), count.clone());
    }
    for (key, value) in fields {
        if !matches!(key.as_str(), "key" | "key_as_string" | "doc_count") {
            entry.insert(key, value);
        }
    }
    Value::Object(entry)
}

/// Returns the display key of a bucket: `key_as_string` when present,
/// otherwise `key` rendered as a string.
pub fn bucket_key(bucket: &Value) -> String {
    match bucket.get("key_as_string").or_else(|| bucket.get("key")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Converts a float to a JSON number, using an integer representation when
/// the value is whole.
pub(crate) fn number_value(n: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() < MAX_EXACT {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{cardinality, doc_count, filter, sum, terms};
    use serde_json::json;

    fn states_response() -> Value {
        json!({
            "aggregations": {
                "states": {
                    "buckets": [
                        { "key": "CA", "doc_count": 31, "total": { "value": 100 } },
                        { "key": "TX", "doc_count": 16, "total": { "value": 100 } }
                    ]
                }
            }
        })
    }

    fn states_tree(states: AggregationNode) -> AggregationNode {
        AggregationNode::empty().agg(states.agg(sum("amount").with_id("total")))
    }

    #[test]
    fn test_single_metric() {
        let tree = AggregationNode::empty().agg(sum("orderAmount").with_id("total"));
        let result = tree.transform(&json!({
            "aggregations": { "total": { "value": 1343871.39 } }
        }));
        assert_eq!(result, json!({ "total": 1343871.39 }));
    }

    #[test]
    fn test_metric_zero_value_is_kept() {
        let node = sum("amount");
        assert_eq!(node.transform(&json!({ "value": 0 })), json!(0));
    }

    #[test]
    fn test_default_bucket_enrichment() {
        let tree = states_tree(terms("state").with_id("states"));
        assert_eq!(
            tree.transform(&states_response()),
            json!({
                "states": [
                    { "key": "CA", "doc_count": 31, "total": 100 },
                    { "key": "TX", "doc_count": 16, "total": 100 }
                ]
            })
        );
    }

    #[test]
    fn test_keyed_buckets() {
        let tree = states_tree(terms("state").with_id("states").keyed());
        assert_eq!(
            tree.transform(&states_response()),
            json!({
                "states": {
                    "CA": { "count": 31, "total": 100 },
                    "TX": { "count": 16, "total": 100 }
                }
            })
        );
    }

    #[test]
    fn test_mapper_preserves_order() {
        let tree = states_tree(
            terms("state")
                .with_id("states")
                .mapper(|b| json!([b["key"], b["total"], b["doc_count"]])),
        );
        assert_eq!(
            tree.transform(&states_response()),
            json!({ "states": [["CA", 100, 31], ["TX", 100, 16]] })
        );
    }

    #[test]
    fn test_reducer_folds_left_to_right() {
        let tree = states_tree(terms("state").with_id("states").reducer(
            |acc, b| {
                let mut keys = acc.as_str().unwrap_or_default().to_string();
                keys.push_str(b["key"].as_str().unwrap_or_default());
                json!(keys)
            },
            json!(""),
        ));
        assert_eq!(tree.transform(&states_response()), json!({ "states": "CATX" }));
    }

    #[test]
    fn test_doc_count_reads_parent_bucket() {
        let tree = AggregationNode::empty().agg(
            terms("state")
                .with_id("states")
                .agg(doc_count().with_id("count"))
                .agg(sum("amount").with_id("total").round(0))
                .reducer(
                    |mut acc, b| {
                        acc[b["key"].as_str().unwrap_or_default()] = json!([b["count"], b["total"]]);
                        acc
                    },
                    json!({}),
                ),
        );
        let response = json!({
            "aggregations": {
                "states": {
                    "buckets": [
                        { "key": "CA", "doc_count": 31, "total": { "value": 100.4 } },
                        { "key": "TX", "doc_count": 16, "total": { "value": 99.6 } }
                    ]
                }
            }
        });
        assert_eq!(
            tree.transform(&response),
            json!({ "states": { "CA": [31, 100], "TX": [16, 100] } })
        );
        assert_eq!(tree.to_json()["aggs"]["states"]["aggs"], json!({ "total": { "sum": { "field": "amount" } } }));
    }

    #[test]
    fn test_single_bucket_filter() {
        let mut term = Map::new();
        term.insert("term".to_string(), json!({ "ShipCountry": "Switzerland" }));
        let tree = AggregationNode::empty().agg(
            filter(term)
                .with_id("swiss")
                .agg(sum("orderAmount").with_id("sales"))
                .agg(doc_count().with_id("orders")),
        );
        let response = json!({
            "aggregations": {
                "swiss": { "doc_count": 18, "sales": { "value": 2490.5 } }
            }
        });
        assert_eq!(
            tree.transform(&response),
            json!({ "swiss": { "sales": 2490.5, "orders": 18 } })
        );
    }

    #[test]
    fn test_missing_sub_results_are_omitted() {
        let tree = AggregationNode::empty()
            .agg(sum("amount").with_id("total"))
            .agg(cardinality("city").with_id("cities"));
        let result = tree.transform(&json!({ "aggregations": { "total": { "value": 5 } } }));
        assert_eq!(result, json!({ "total": 5 }));
    }

    #[test]
    fn test_unrecognized_shape_returned_unchanged() {
        let node = sum("amount");
        assert_eq!(node.transform(&json!("odd")), json!("odd"));
        assert_eq!(
            node.transform(&json!({ "hits": { "total": 3 } })),
            json!({ "hits": { "total": 3 } })
        );
        assert_eq!(node.transform(&Value::Null), Value::Null);
    }

    #[test]
    fn test_thru_chain_composes() {
        let node = sum("amount")
            .thru(|_| json!(100))
            .thru(|v| json!(format!("${}", v)));
        assert_eq!(node.transform(&json!({ "value": 3 })), json!("$100"));
    }

    #[test]
    fn test_round_and_scale() {
        assert_eq!(sum("a").round(2).transform(&json!({ "value": 19604.904 })), json!(19604.9));
        assert_eq!(sum("a").round(0).transform(&json!({ "value": 139497.3 })), json!(139497));
        assert_eq!(sum("a").scale(0.001).round(1).transform(&json!({ "value": 2500 })), json!(2.5));
        assert_eq!(sum("a").round(2).transform(&json!({ "value": null })), Value::Null);
    }

    #[test]
    fn test_round_clamps_large_precision() {
        assert_eq!(sum("a").round(400).transform(&json!({ "value": 2.5 })), json!(2.5));
        assert_eq!(sum("a").round(u32::MAX).transform(&json!({ "value": 7 })), json!(7));
    }

    #[test]
    fn test_virtual_node_reads_hoisted_descendants() {
        let hidden = AggregationNode::empty()
            .with_id("hidden")
            .agg(sum("amount").with_id("total"))
            .agg(doc_count().with_id("orders"));
        let tree = AggregationNode::empty().agg(
            terms("state")
                .with_id("states")
                .agg(hidden)
                .mapper(|b| json!([b["key"], b["hidden"]])),
        );
        let response = json!({
            "aggregations": {
                "states": {
                    "buckets": [
                        { "key": "CA", "doc_count": 31, "total": { "value": 100 } },
                        { "key": "TX", "doc_count": 16 }
                    ]
                }
            }
        });
        assert_eq!(
            tree.transform(&response),
            json!({
                "states": [
                    ["CA", { "total": 100, "orders": 31 }],
                    ["TX", { "orders": 16 }]
                ]
            })
        );
    }

    #[test]
    fn test_ancestors_reach_every_enclosing_bucket() {
        let inner: Vec<Value> = (0..2000)
            .map(|i| json!({ "key": i, "doc_count": i }))
            .collect();
        let response = json!({
            "aggregations": {
                "outer": { "buckets": [{ "key": "all", "doc_count": 1, "inner": { "buckets": inner } }] }
            }
        });
        let depths = AggregationNode::empty().transformer(|_, ancestors| {
            json!([ancestors.len(), ancestors[0]["key"], ancestors[1]["key"]])
        });
        let tree = AggregationNode::empty().agg(
            terms("a").with_id("outer").agg(
                terms("b")
                    .with_id("inner")
                    .agg(depths.with_id("path"))
                    .mapper(|b| b["path"].clone()),
            ),
        );
        let result = tree.transform(&response);
        let paths = result["outer"][0]["inner"].as_array().unwrap();
        assert_eq!(paths.len(), 2000);
        assert_eq!(paths[1999], json!([2, "all", 1999]));
    }

    #[test]
    fn test_pick_and_omit() {
        let tree = states_tree(terms("state").with_id("states").pick(["key", "total"]));
        assert_eq!(
            tree.transform(&states_response())["states"],
            json!([{ "key": "CA", "total": 100 }, { "key": "TX", "total": 100 }])
        );

        let tree = states_tree(terms("state").with_id("states").omit(["doc_count"]));
        assert_eq!(
            tree.transform(&states_response())["states"][0],
            json!({ "key": "CA", "total": 100 })
        );
    }

    #[test]
    fn test_get_and_first() {
        let tree = states_tree(terms("state").with_id("states"))
            .get("states")
            .first();
        assert_eq!(
            tree.transform(&states_response()),
            json!({ "key": "CA", "doc_count": 31, "total": 100 })
        );
    }

    #[test]
    fn test_index_by_key() {
        let tree = states_tree(
            terms("state")
                .with_id("states")
                .index_by_key(|b| b["key"].as_str().unwrap_or_default().to_lowercase()),
        );
        let result = tree.transform(&states_response());
        assert_eq!(result["states"]["ca"]["doc_count"], json!(31));
        assert_eq!(result["states"]["tx"]["total"], json!(100));
    }

    #[test]
    fn test_custom_transformer() {
        let node = terms("state").transformer(|raw, ancestors| {
            json!({ "depth": ancestors.len(), "buckets": raw["buckets"].as_array().map(Vec::len) })
        });
        assert_eq!(
            node.transform(&json!({ "buckets": [{}, {}] })),
            json!({ "depth": 0, "buckets": 2 })
        );
    }

    #[test]
    fn test_bucket_key() {
        assert_eq!(bucket_key(&json!({ "key": "CA" })), "CA");
        assert_eq!(bucket_key(&json!({ "key": 1467331200000u64, "key_as_string": "1996-07-01" })), "1996-07-01");
        assert_eq!(bucket_key(&json!({ "key": 42 })), "42");
        assert_eq!(bucket_key(&json!({})), "");
    }

    #[test]
    fn test_number_value() {
        assert_eq!(number_value(3.0), json!(3));
        assert_eq!(number_value(2.5), json!(2.5));
        assert_eq!(number_value(f64::NAN), Value::Null);
    }
}
