//! Compiling expressions onto aggregation trees.
//!
//! [`Expression::apply`] attaches the aggregations an expression needs under
//! a target node (usually a bucketing aggregation such as `terms`) and
//! installs a bucket mapper on the target that reads the expression's value
//! back out of each bucket.
//!
//! Aggregations are keyed by [`Expression::agg_name`]. Since names are
//! deterministic, a calculation can reference its operands by name, and an
//! operand shared by several calculations is only requested once.

use std::sync::Arc;

use aggtree::{
    avg, bucket_script, cardinality, doc_count, max, min, sum, value_count, AggregationNode,
};
use serde_json::{json, Map, Value};
use tracing::trace;

use crate::ast::{AggFunction, Calculation, Expression, FieldAggregate};

/// Builds the per-bucket result from `(bucket key, expression value)`.
pub type ResultMapper = Arc<dyn Fn(Value, Value) -> Value + Send + Sync>;

/// Script parameter names bound to a calculation's operands.
const PARAMS: [&str; 2] = ["arg1", "arg2"];

/// Engine path that reads a bucket's document count.
const COUNT_PATH: &str = "_count";

/// Sort direction for [`Expression::sort`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl SortDirection {
    fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// The default result mapper: `{ "label": <bucket key>, "value": <value> }`.
pub fn label_value_mapper() -> ResultMapper {
    Arc::new(|label: Value, value: Value| json!({ "label": label, "value": value }))
}

impl Expression {
    /// Attaches this expression to `target` with the default
    /// `{ label, value }` result mapper.
    ///
    /// ```rust
    /// use aggtree::{terms, AggregationNode};
    /// use aggtree_expr::{parse, Field, FieldCatalog, FieldType};
    /// use serde_json::json;
    ///
    /// let catalog = FieldCatalog::new([Field::new("cost", "Cost", FieldType::Number)]);
    /// let expr = parse(&catalog, "ratio(sum:cost, count)").unwrap();
    ///
    /// let tree = AggregationNode::empty().agg(expr.apply(terms("region").with_id("regions")));
    /// assert_eq!(
    ///     tree.to_json()["aggs"]["regions"]["aggs"],
    ///     json!({
    ///         "sum-cost": { "sum": { "field": "cost" } },
    ///         "ratio-sum-cost-count": {
    ///             "bucket_script": {
    ///                 "buckets_path": { "arg1": "sum-cost", "arg2": "_count" },
    ///                 "script": "params.arg1 / params.arg2"
    ///             }
    ///         }
    ///     })
    /// );
    /// ```
    pub fn apply(&self, target: AggregationNode) -> AggregationNode {
        self.apply_with(target, label_value_mapper())
    }

    /// Attaches this expression to `target`, building each bucket's result
    /// with `mapper`.
    ///
    /// Constants need no aggregation and leave `target` unchanged.
    pub fn apply_with(&self, target: AggregationNode, mapper: ResultMapper) -> AggregationNode {
        match self {
            Expression::Field(agg) => agg.apply_with(target, mapper),
            Expression::Constant(_) => target,
            Expression::Calculation(calc) => calc.apply_with(target, mapper),
        }
    }

    /// Orders `target`'s buckets by this expression's value.
    ///
    /// Only non-count field aggregates can be sorted on by the engine; for
    /// anything else `target` is returned unchanged and
    /// [`needs_value_sort`](Expression::needs_value_sort) tells the caller
    /// to sort after transformation.
    pub fn sort(&self, target: AggregationNode, direction: SortDirection) -> AggregationNode {
        match self {
            Expression::Field(agg) if !agg.is_count() => {
                let mut order = Map::new();
                order.insert(agg.agg_name(), json!(direction.as_str()));
                let mut settings = Map::new();
                settings.insert("order".to_string(), Value::Object(order));
                target.configure(settings)
            }
            _ => target,
        }
    }
}

impl FieldAggregate {
    /// The aggregation computing this aggregate; `count` needs no engine
    /// aggregation and reads the bucket's document count instead.
    fn leaf(&self) -> AggregationNode {
        let Some(field) = self.field() else {
            return doc_count();
        };
        let field = field.name.as_str();
        match self.function() {
            AggFunction::Count => doc_count(),
            AggFunction::Sum => sum(field),
            AggFunction::Avg => avg(field),
            AggFunction::Max => max(field),
            AggFunction::Min => min(field),
            AggFunction::ValueCount => value_count(field),
            AggFunction::Cardinality => cardinality(field),
        }
    }

    fn apply_with(&self, target: AggregationNode, mapper: ResultMapper) -> AggregationNode {
        let id = self.agg_name();
        trace!(target: "aggtree_expr::compile", parent = target.id(), agg = %id, "attaching field aggregate");
        let target = target.agg(self.leaf().with_id(id.as_str()));
        bind_result(target, id, self.is_count(), mapper)
    }
}

impl Calculation {
    fn apply_with(&self, target: AggregationNode, mapper: ResultMapper) -> AggregationNode {
        let target = self.left().apply_with(target, mapper.clone());
        let target = self.right().apply_with(target, mapper.clone());

        let mut buckets_path = Map::new();
        let mut args = Vec::with_capacity(2);
        for (param, operand) in PARAMS.into_iter().zip([self.left(), self.right()]) {
            match script_reference(operand) {
                Some(path) => {
                    buckets_path.insert(param.to_string(), Value::String(path));
                    args.push(format!("params.{}", param));
                }
                None => args.push(operand.to_string()),
            }
        }

        let mut config = Map::new();
        if !buckets_path.is_empty() {
            config.insert("buckets_path".to_string(), Value::Object(buckets_path));
        }
        config.insert(
            "script".to_string(),
            Value::String(self.operator().script(&args[0], &args[1])),
        );

        let id = self.agg_name();
        trace!(target: "aggtree_expr::compile", parent = target.id(), agg = %id, "attaching bucket script");
        let target = target.agg(bucket_script(config).with_id(id.as_str()));
        bind_result(target, id, false, mapper)
    }
}

/// How a scripted aggregation refers to an operand: `_count` for the
/// document count, the operand's aggregation name otherwise, and nothing for
/// constants, which are inlined into the script.
fn script_reference(operand: &Expression) -> Option<String> {
    match operand {
        Expression::Constant(_) => None,
        Expression::Field(agg) if agg.is_count() => Some(COUNT_PATH.to_string()),
        other => Some(other.agg_name()),
    }
}

/// Makes `target` report the value stored under `id` in each of its buckets.
///
/// A `missing` aggregation answers with a single bucket rather than a list,
/// so it reports `{ count, value }` for that bucket instead.
fn bind_result(
    target: AggregationNode,
    id: String,
    is_count: bool,
    mapper: ResultMapper,
) -> AggregationNode {
    let is_missing = target.body().is_some_and(|body| body.kind() == "missing");
    if is_missing {
        target.transformer(move |raw, _| {
            let count = raw.get("doc_count").cloned().unwrap_or(Value::Null);
            let value = if is_count {
                count.clone()
            } else {
                raw[id.as_str()]["value"].clone()
            };
            json!({ "count": count, "value": value })
        })
    } else {
        target.mapper(move |bucket| {
            let key = bucket.get("key").cloned().unwrap_or(Value::Null);
            let value = bucket.get(id.as_str()).cloned().unwrap_or(Value::Null);
            mapper(key, value)
        })
    }
}
