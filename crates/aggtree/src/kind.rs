//! Aggregation type registry.
//!
//! The engine groups its aggregation types into four families. The family
//! decides how a shorthand string configuration is expanded: metric and
//! bucket aggregations read it as the target `field`, pipeline aggregations
//! as their `buckets_path`. Matrix aggregations take no shorthand.

use serde_json::{Map, Value};

use crate::error::{json_type_name, AggError, AggResult};

/// Metric aggregations: compute a value over the documents of a bucket.
pub const METRIC_AGGREGATIONS: &[&str] = &[
    "avg",
    "cardinality",
    "extended_stats",
    "geo_bounds",
    "geo_centroid",
    "max",
    "min",
    "percentiles",
    "percentile_ranks",
    "scripted_metric",
    "stats",
    "sum",
    "top_hits",
    "value_count",
];

/// Bucket aggregations: split documents into one or more buckets.
pub const BUCKET_AGGREGATIONS: &[&str] = &[
    "adjacency_matrix",
    "children",
    "date_histogram",
    "date_range",
    "diversified_sampler",
    "filter",
    "filters",
    "geo_distance",
    "geohash_grid",
    "global",
    "histogram",
    "ip_range",
    "missing",
    "nested",
    "range",
    "reverse_nested",
    "sampler",
    "significant_terms",
    "terms",
];

/// Pipeline aggregations: compute over the output of sibling or parent
/// aggregations.
pub const PIPELINE_AGGREGATIONS: &[&str] = &[
    "avg_bucket",
    "derivative",
    "max_bucket",
    "min_bucket",
    "sum_bucket",
    "stats_bucket",
    "extended_stats_bucket",
    "percentiles_bucket",
    "moving_avg",
    "cumulative_sum",
    "bucket_script",
    "bucket_selector",
    "serial_diff",
];

/// Matrix aggregations: operate on several fields at once.
pub const MATRIX_AGGREGATIONS: &[&str] = &["matrix_stats"];

/// Family an aggregation type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationFamily {
    /// Single or multi-value metric.
    Metric,
    /// Bucketing aggregation.
    Bucket,
    /// Pipeline aggregation over other aggregations' results.
    Pipeline,
    /// Multi-field matrix aggregation.
    Matrix,
}

impl AggregationFamily {
    /// Looks up the family of an aggregation type name.
    ///
    /// Returns `None` for names the engine does not know.
    pub fn of(kind: &str) -> Option<Self> {
        if METRIC_AGGREGATIONS.contains(&kind) {
            Some(AggregationFamily::Metric)
        } else if BUCKET_AGGREGATIONS.contains(&kind) {
            Some(AggregationFamily::Bucket)
        } else if PIPELINE_AGGREGATIONS.contains(&kind) {
            Some(AggregationFamily::Pipeline)
        } else if MATRIX_AGGREGATIONS.contains(&kind) {
            Some(AggregationFamily::Matrix)
        } else {
            None
        }
    }

    /// Key a shorthand string configuration is stored under, if any.
    pub fn shorthand_key(self) -> Option<&'static str> {
        match self {
            AggregationFamily::Metric | AggregationFamily::Bucket => Some("field"),
            AggregationFamily::Pipeline => Some("buckets_path"),
            AggregationFamily::Matrix => None,
        }
    }
}

/// Configuration accepted by the aggregation builders.
///
/// A plain string is shorthand for the family's default key (see
/// [`AggregationFamily::shorthand_key`]); a map is used verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum AggConfig {
    /// Shorthand value, e.g. the field name for `terms("state")`.
    Shorthand(String),
    /// Fully formed configuration object.
    Object(Map<String, Value>),
}

impl AggConfig {
    /// Converts a JSON value into a configuration for the given type.
    ///
    /// Strings become shorthand, objects are kept as-is; anything else is
    /// rejected.
    pub fn from_value(kind: &str, value: Value) -> AggResult<Self> {
        match value {
            Value::String(s) => Ok(AggConfig::Shorthand(s)),
            Value::Object(map) => Ok(AggConfig::Object(map)),
            other => Err(AggError::InvalidConfig {
                kind: kind.to_string(),
                found: json_type_name(&other),
            }),
        }
    }

    /// Expands the configuration into the JSON object sent on the wire.
    pub(crate) fn expand(self, kind: &str, family: AggregationFamily) -> AggResult<Value> {
        match (self, family.shorthand_key()) {
            (AggConfig::Object(map), _) => Ok(Value::Object(map)),
            (config, Some(key)) => Ok(config.expand_with_key(key)),
            (AggConfig::Shorthand(_), None) => Err(AggError::InvalidConfig {
                kind: kind.to_string(),
                found: "string",
            }),
        }
    }

    /// Expands the configuration, storing shorthand under `key`.
    pub(crate) fn expand_with_key(self, key: &str) -> Value {
        match self {
            AggConfig::Object(map) => Value::Object(map),
            AggConfig::Shorthand(s) => {
                let mut map = Map::new();
                map.insert(key.to_string(), Value::String(s));
                Value::Object(map)
            }
        }
    }
}

impl From<&str> for AggConfig {
    fn from(s: &str) -> Self {
        AggConfig::Shorthand(s.to_string())
    }
}

impl From<String> for AggConfig {
    fn from(s: String) -> Self {
        AggConfig::Shorthand(s)
    }
}

impl From<Map<String, Value>> for AggConfig {
    fn from(map: Map<String, Value>) -> Self {
        AggConfig::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_family_lookup() {
        assert_eq!(AggregationFamily::of("sum"), Some(AggregationFamily::Metric));
        assert_eq!(AggregationFamily::of("terms"), Some(AggregationFamily::Bucket));
        assert_eq!(
            AggregationFamily::of("bucket_script"),
            Some(AggregationFamily::Pipeline)
        );
        assert_eq!(
            AggregationFamily::of("matrix_stats"),
            Some(AggregationFamily::Matrix)
        );
        assert_eq!(AggregationFamily::of("totals"), None);
    }

    #[test]
    fn test_shorthand_expands_to_field() {
        let config = AggConfig::from("amount")
            .expand("sum", AggregationFamily::Metric)
            .unwrap();
        assert_eq!(config, json!({ "field": "amount" }));
    }

    #[test]
    fn test_pipeline_shorthand_expands_to_buckets_path() {
        let config = AggConfig::from("sales>total")
            .expand("max_bucket", AggregationFamily::Pipeline)
            .unwrap();
        assert_eq!(config, json!({ "buckets_path": "sales>total" }));
    }

    #[test]
    fn test_matrix_rejects_shorthand() {
        let err = AggConfig::from("price")
            .expand("matrix_stats", AggregationFamily::Matrix)
            .unwrap_err();
        assert!(matches!(err, AggError::InvalidConfig { found: "string", .. }));
    }

    #[test]
    fn test_from_value_rejects_scalars() {
        let err = AggConfig::from_value("terms", json!(42)).unwrap_err();
        assert_eq!(
            err,
            AggError::InvalidConfig {
                kind: "terms".to_string(),
                found: "number",
            }
        );
    }

    #[test]
    fn test_object_config_kept_verbatim() {
        let config = AggConfig::from_value("terms", json!({ "field": "ShipCountry", "size": 100 }))
            .unwrap()
            .expand("terms", AggregationFamily::Bucket)
            .unwrap();
        assert_eq!(config, json!({ "field": "ShipCountry", "size": 100 }));
    }
}
