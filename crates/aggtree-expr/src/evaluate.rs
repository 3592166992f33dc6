//! Client-side evaluation of expressions.
//!
//! Scripted aggregations only run inside buckets the engine produces. Values
//! for synthetic buckets (an "other" bucket summed up by the caller, say)
//! are computed here instead, from operand values the caller already has.

use crate::ast::Expression;

impl Expression {
    /// Evaluates the expression over already fetched results.
    ///
    /// `extractor` resolves each leaf (field aggregate or constant) to a
    /// number; a constant the extractor knows nothing about evaluates to its
    /// own value. Calculations combine their operands with the operator, and
    /// are `None` if either operand is, or on division by zero.
    ///
    /// ```rust
    /// use aggtree_expr::{parse, Expression, Field, FieldCatalog, FieldType};
    /// use std::collections::HashMap;
    ///
    /// let catalog = FieldCatalog::new([Field::new("cost", "Cost", FieldType::Number)]);
    /// let expr = parse(&catalog, "ratio(sum:cost, count)").unwrap();
    ///
    /// let other_bucket: HashMap<String, f64> =
    ///     [("sum-cost".to_string(), 1500.0), ("count".to_string(), 12.0)].into();
    /// let extract = |leaf: &Expression, results: &HashMap<String, f64>| {
    ///     results.get(&leaf.agg_name()).copied()
    /// };
    ///
    /// assert_eq!(expr.calculate(&other_bucket, extract), Some(125.0));
    /// ```
    pub fn calculate<T, F>(&self, results: &T, extractor: F) -> Option<f64>
    where
        T: ?Sized,
        F: Fn(&Expression, &T) -> Option<f64>,
    {
        self.evaluate_with(results, &extractor)
    }

    fn evaluate_with<T, F>(&self, results: &T, extractor: &F) -> Option<f64>
    where
        T: ?Sized,
        F: Fn(&Expression, &T) -> Option<f64>,
    {
        match self {
            Expression::Field(_) => extractor(self, results),
            Expression::Constant(c) => extractor(self, results).or(Some(c.value())),
            Expression::Calculation(calc) => {
                let left = calc.left().evaluate_with(results, extractor)?;
                let right = calc.right().evaluate_with(results, extractor)?;
                calc.operator().evaluate(left, right)
            }
        }
    }
}
