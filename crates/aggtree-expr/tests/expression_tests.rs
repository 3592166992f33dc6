//! Integration tests for parsing aggregate expressions and compiling them
//! onto aggregation trees.

use std::sync::Arc;

use aggtree::{missing, terms, AggregationNode};
use aggtree_expr::{
    parse, AggFunction, Expression, ExprError, Field, FieldCatalog, FieldType, SortDirection,
};
use serde_json::{json, Value};

fn catalog() -> FieldCatalog {
    FieldCatalog::new([
        Field::new("revenue", "Revenue", FieldType::Number),
        Field::new("cost", "Cost", FieldType::Number),
        Field::new("ordered", "Order Date", FieldType::Date),
        Field::new("region", "Region", FieldType::Discrete),
    ])
}

fn regions() -> AggregationNode {
    terms("region").with_id("regions")
}

// ============================================================================
// Parsing Tests
// ============================================================================

#[test]
fn test_lexicon_round_trips() {
    let catalog = catalog();
    for shorthand in catalog.lexicon() {
        let expr = parse(&catalog, &shorthand).unwrap();
        assert_eq!(expr.to_string(), shorthand);
        assert_eq!(parse(&catalog, &expr.to_string()).unwrap(), expr);
    }
}

#[test]
fn test_catalog_expressions_are_parseable() {
    let catalog = catalog();
    for expr in catalog.expressions(&AggFunction::ALL) {
        assert_eq!(parse(&catalog, &expr.to_string()).unwrap(), expr);
    }
}

#[test]
fn test_independent_parses_share_agg_name() {
    let catalog = catalog();
    let input = "add(ratio(count,2),ratio(count,2))";
    let a = parse(&catalog, input).unwrap();
    let b = parse(&catalog, input).unwrap();
    assert_eq!(a.agg_name(), b.agg_name());
    assert_eq!(a.agg_name(), "add-ratio-count-2-ratio-count-2");
}

#[test]
fn test_labels_parenthesize_calculations() {
    let catalog = catalog();
    assert_eq!(
        parse(&catalog, "add(ratio(sum:cost,avg:revenue), mult(count,4))")
            .unwrap()
            .label(),
        "(Total Cost / Average Revenue) + (Count * 4)"
    );
    assert_eq!(
        parse(&catalog, "mult(sub(sum:cost,avg:revenue), ratio(count,4))")
            .unwrap()
            .label(),
        "(Total Cost - Average Revenue) * (Count / 4)"
    );
}

#[test]
fn test_user_friendly_error() {
    let err = parse(&catalog(), "foo").unwrap_err();
    assert_eq!(err.to_string(), "\"foo\" is not a valid aggregate expression.");

    let err = parse(&catalog(), "ratio(sum:region,count)").unwrap_err();
    assert!(matches!(err, ExprError::InvalidExpression { .. }));
}

// ============================================================================
// Compilation Tests
// ============================================================================

#[test]
fn test_apply_field_aggregate() {
    let expr = parse(&catalog(), "sum:revenue").unwrap();
    let tree = AggregationNode::empty().agg(expr.apply(regions()));
    assert_eq!(
        tree.to_json(),
        json!({
            "aggs": {
                "regions": {
                    "terms": { "field": "region" },
                    "aggs": { "sum-revenue": { "sum": { "field": "revenue" } } }
                }
            }
        })
    );

    let response = json!({
        "aggregations": {
            "regions": {
                "buckets": [
                    { "key": "West", "doc_count": 12, "sum-revenue": { "value": 640.5 } },
                    { "key": "East", "doc_count": 9, "sum-revenue": { "value": 210 } }
                ]
            }
        }
    });
    assert_eq!(
        tree.transform(&response),
        json!({
            "regions": [
                { "label": "West", "value": 640.5 },
                { "label": "East", "value": 210 }
            ]
        })
    );
}

#[test]
fn test_apply_count_reads_doc_count() {
    let expr = parse(&catalog(), "count").unwrap();
    let tree = AggregationNode::empty().agg(expr.apply(regions()));
    assert_eq!(
        tree.to_json(),
        json!({ "aggs": { "regions": { "terms": { "field": "region" } } } })
    );

    let response = json!({
        "aggregations": {
            "regions": { "buckets": [{ "key": "West", "doc_count": 12 }] }
        }
    });
    assert_eq!(
        tree.transform(&response),
        json!({ "regions": [{ "label": "West", "value": 12 }] })
    );
}

#[test]
fn test_apply_constant_is_noop() {
    let target = regions();
    let applied = Expression::constant(3.0).apply(target.clone());
    assert_eq!(applied.to_json(), target.to_json());
    assert!(applied.children().is_empty());
}

#[test]
fn test_apply_calculation_with_constant() {
    let expr = parse(&catalog(), "ratio(max:cost,35)").unwrap();
    let node = expr.apply(regions());
    assert_eq!(
        node.to_json()["aggs"],
        json!({
            "max-cost": { "max": { "field": "cost" } },
            "ratio-max-cost-35": {
                "bucket_script": {
                    "buckets_path": { "arg1": "max-cost" },
                    "script": "params.arg1 / 35"
                }
            }
        })
    );
}

#[test]
fn test_apply_calculation_with_leading_constant() {
    let expr = parse(&catalog(), "sub(1000.25, max:cost)").unwrap();
    let node = expr.apply(regions());
    assert_eq!(
        node.to_json()["aggs"]["sub-1000-25-max-cost"],
        json!({
            "bucket_script": {
                "buckets_path": { "arg2": "max-cost" },
                "script": "1000.25 - params.arg2"
            }
        })
    );
}

#[test]
fn test_apply_constants_of_opposite_sign_stay_distinct() {
    let plus = parse(&catalog(), "sub(sum:cost,2)").unwrap();
    let minus = parse(&catalog(), "sub(sum:cost,-2)").unwrap();
    assert_ne!(plus.agg_name(), minus.agg_name());

    let node = minus.apply(plus.apply(regions()));
    let aggs = node.to_json()["aggs"].clone();
    assert_eq!(
        aggs["sub-sum-cost-2"]["bucket_script"]["script"],
        json!("params.arg1 - 2")
    );
    assert_eq!(
        aggs["sub-sum-cost-neg-2"]["bucket_script"]["script"],
        json!("params.arg1 - -2")
    );
    assert_eq!(node.children().len(), 3);
}

#[test]
fn test_apply_nested_calculation_shares_operands() {
    let expr = parse(&catalog(), "ratio(sub(sum:revenue,sum:cost),sum:revenue)").unwrap();
    let node = expr.apply(regions());
    let ids: Vec<&str> = node.children().iter().map(|c| c.id()).collect();
    assert_eq!(
        ids,
        vec![
            "sum-revenue",
            "sum-cost",
            "sub-sum-revenue-sum-cost",
            "ratio-sub-sum-revenue-sum-cost-sum-revenue",
        ]
    );
    assert_eq!(
        node.to_json()["aggs"]["ratio-sub-sum-revenue-sum-cost-sum-revenue"]["bucket_script"]
            ["buckets_path"],
        json!({ "arg1": "sub-sum-revenue-sum-cost", "arg2": "sum-revenue" })
    );
}

#[test]
fn test_apply_calculation_reads_script_result() {
    let expr = parse(&catalog(), "mult(count,avg:revenue)").unwrap();
    let tree = AggregationNode::empty().agg(expr.apply(regions()));
    let response = json!({
        "aggregations": {
            "regions": {
                "buckets": [{
                    "key": "West",
                    "doc_count": 4,
                    "avg-revenue": { "value": 25 },
                    "mult-count-avg-revenue": { "value": 100 }
                }]
            }
        }
    });
    assert_eq!(
        tree.transform(&response),
        json!({ "regions": [{ "label": "West", "value": 100 }] })
    );
}

#[test]
fn test_apply_with_custom_mapper() {
    let expr = parse(&catalog(), "avg:revenue").unwrap();
    let mapper = Arc::new(|key: Value, value: Value| json!([key, value]));
    let tree = AggregationNode::empty().agg(expr.apply_with(regions(), mapper));
    let response = json!({
        "aggregations": {
            "regions": {
                "buckets": [{ "key": "West", "doc_count": 4, "avg-revenue": { "value": 25 } }]
            }
        }
    });
    assert_eq!(
        tree.transform(&response),
        json!({ "regions": [["West", 25]] })
    );
}

#[test]
fn test_apply_to_missing_bucket() {
    let expr = parse(&catalog(), "sum:revenue").unwrap();
    let tree = AggregationNode::empty().agg(expr.apply(missing("region").with_id("no_region")));
    let response = json!({
        "aggregations": {
            "no_region": { "doc_count": 3, "sum-revenue": { "value": 75 } }
        }
    });
    assert_eq!(
        tree.transform(&response),
        json!({ "no_region": { "count": 3, "value": 75 } })
    );

    let count = parse(&catalog(), "count").unwrap();
    let tree = AggregationNode::empty().agg(count.apply(missing("region").with_id("no_region")));
    assert_eq!(
        tree.transform(&response),
        json!({ "no_region": { "count": 3, "value": 3 } })
    );
}

// ============================================================================
// Sorting Tests
// ============================================================================

#[test]
fn test_sort_by_field_aggregate() {
    let expr = parse(&catalog(), "max:ordered").unwrap();
    let node = expr.sort(expr.apply(regions()), SortDirection::default());
    assert_eq!(
        node.to_json()["terms"],
        json!({ "field": "region", "order": { "max-ordered": "desc" } })
    );

    let node = expr.sort(regions(), SortDirection::Asc);
    assert_eq!(node.to_json()["terms"]["order"], json!({ "max-ordered": "asc" }));
}

#[test]
fn test_sort_unavailable_for_count_and_calculations() {
    for shorthand in ["count", "ratio(sum:cost,count)", "12"] {
        let expr = parse(&catalog(), shorthand).unwrap();
        let node = expr.sort(regions(), SortDirection::Desc);
        assert_eq!(node.to_json(), regions().to_json(), "{}", shorthand);
    }
    assert!(parse(&catalog(), "ratio(sum:cost,count)").unwrap().needs_value_sort());
    assert!(!parse(&catalog(), "sum:cost").unwrap().needs_value_sort());
}
