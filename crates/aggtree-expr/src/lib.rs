//! # aggtree-expr
//!
//! A small shorthand language for aggregate metrics, compiled onto
//! [`aggtree`] aggregation trees.
//!
//! This crate provides:
//! - **Parser**: `sum:cost`, `count`, `ratio(sum:cost, count)` and nested
//!   calculations, validated against a [`FieldCatalog`]
//! - **Compiler**: [`Expression::apply`] attaches the needed aggregations,
//!   including one `bucket_script` per calculation, to a bucketing node
//! - **Evaluator**: [`Expression::calculate`] computes the same values
//!   client-side for buckets the engine never produces
//!
//! ## Usage
//!
//! ```rust
//! use aggtree::{terms, AggregationNode};
//! use aggtree_expr::{parse, Field, FieldCatalog, FieldType};
//! use serde_json::json;
//!
//! let catalog = FieldCatalog::new([
//!     Field::new("cost", "Cost", FieldType::Number),
//!     Field::new("revenue", "Revenue", FieldType::Number),
//! ]);
//!
//! let margin = parse(&catalog, "ratio(sub(sum:revenue, sum:cost), sum:revenue)").unwrap();
//! assert_eq!(margin.label(), "(Total Revenue - Total Cost) / Total Revenue");
//!
//! let tree = AggregationNode::empty().agg(margin.apply(terms("region").with_id("regions")));
//! let response = json!({
//!     "aggregations": {
//!         "regions": {
//!             "buckets": [{
//!                 "key": "West",
//!                 "doc_count": 10,
//!                 "sum-revenue": { "value": 200.0 },
//!                 "sum-cost": { "value": 150.0 },
//!                 "sub-sum-revenue-sum-cost": { "value": 50.0 },
//!                 "ratio-sub-sum-revenue-sum-cost-sum-revenue": { "value": 0.25 }
//!             }]
//!         }
//!     }
//! });
//! assert_eq!(
//!     tree.transform(&response),
//!     json!({ "regions": [{ "label": "West", "value": 0.25 }] })
//! );
//! ```
//!
//! ## Shorthand Quick Reference
//!
//! | Form | Meaning | Fields |
//! |------|---------|--------|
//! | `count` | Document count | - |
//! | `sum:f` / `avg:f` | Total / average | number |
//! | `max:f` / `min:f` | Extremes | number, date |
//! | `value_count:f` / `cardinality:f` | Values / distinct values | any |
//! | `ratio(a, b)` | `a / b` | - |
//! | `mult(a, b)` | `a * b` | - |
//! | `add(a, b)` | `a + b` | - |
//! | `sub(a, b)` | `a - b` | - |
//! | `3.5`, `-2` | Constant | - |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod ast;
mod catalog;
mod compile;
mod config;
mod error;
mod evaluate;
mod parser;

pub use ast::{AggFunction, Calculation, Constant, Expression, FieldAggregate, Operator};
pub use catalog::{Field, FieldCatalog, FieldType};
pub use compile::{label_value_mapper, ResultMapper, SortDirection};
pub use config::{ParserConfig, ParserConfigBuilder};
pub use error::{ExprError, ExprResult};
pub use parser::{parse, parse_with};
