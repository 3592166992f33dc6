//! Expression tree types.
//!
//! An [`Expression`] is either a field aggregate (`sum:cost`, `count`), a
//! numeric constant, or a binary [`Calculation`] over two sub-expressions.
//! Every expression has a display label, a canonical shorthand form
//! (`Display`) and a deterministic aggregation name used as its node id.

use std::fmt;

use crate::catalog::Field;

// =============================================================================
// Aggregate Functions
// =============================================================================

/// Aggregate function of a [`FieldAggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AggFunction {
    /// Document count; takes no field.
    Count,
    /// Sum of a numeric field.
    Sum,
    /// Average of a numeric field.
    Avg,
    /// Maximum of a numeric or date field.
    Max,
    /// Minimum of a numeric or date field.
    Min,
    /// Number of values of any field.
    ValueCount,
    /// Number of distinct values of any field.
    Cardinality,
}

impl AggFunction {
    /// All functions, in shorthand precedence order.
    pub const ALL: [AggFunction; 7] = [
        AggFunction::Count,
        AggFunction::Sum,
        AggFunction::Avg,
        AggFunction::Max,
        AggFunction::Min,
        AggFunction::ValueCount,
        AggFunction::Cardinality,
    ];

    /// Shorthand name, which is also the engine aggregation type.
    pub fn name(self) -> &'static str {
        match self {
            AggFunction::Count => "count",
            AggFunction::Sum => "sum",
            AggFunction::Avg => "avg",
            AggFunction::Max => "max",
            AggFunction::Min => "min",
            AggFunction::ValueCount => "value_count",
            AggFunction::Cardinality => "cardinality",
        }
    }

    /// Looks a function up by shorthand name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    fn label_prefix(self) -> &'static str {
        match self {
            AggFunction::Count => "Count",
            AggFunction::Sum => "Total",
            AggFunction::Avg => "Average",
            AggFunction::Max => "Max",
            AggFunction::Min => "Min",
            AggFunction::ValueCount => "Value Count",
            AggFunction::Cardinality => "Distinct Count",
        }
    }
}

impl fmt::Display for AggFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Calculation Operators
// =============================================================================

/// Binary operator of a [`Calculation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Operator {
    /// Division: `ratio(a, b)`.
    Ratio,
    /// Multiplication: `mult(a, b)`.
    Mult,
    /// Addition: `add(a, b)`.
    Add,
    /// Subtraction: `sub(a, b)`.
    Sub,
}

impl Operator {
    /// All operators, in parse order.
    pub const ALL: [Operator; 4] = [Operator::Ratio, Operator::Mult, Operator::Add, Operator::Sub];

    /// Shorthand name, e.g. `ratio`.
    pub fn name(self) -> &'static str {
        match self {
            Operator::Ratio => "ratio",
            Operator::Mult => "mult",
            Operator::Add => "add",
            Operator::Sub => "sub",
        }
    }

    /// Infix symbol used in labels, shorthand and scripts.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Ratio => "/",
            Operator::Mult => "*",
            Operator::Add => "+",
            Operator::Sub => "-",
        }
    }

    /// Joins two operand labels, e.g. `Total Cost / Count`.
    pub fn label(self, left: &str, right: &str) -> String {
        format!("{} {} {}", left, self.symbol(), right)
    }

    /// Renders the shorthand form of a calculation over two operands.
    pub fn format(self, left: &Expression, right: &Expression) -> String {
        format!("{}({} {} {})", self.name(), left, self.symbol(), right)
    }

    /// Script body combining two script parameters or literals.
    pub fn script(self, left: &str, right: &str) -> String {
        format!("{} {} {}", left, self.symbol(), right)
    }

    /// Evaluates the operator client-side.
    ///
    /// Division by zero (or by a non-number) yields `None`.
    pub fn evaluate(self, left: f64, right: f64) -> Option<f64> {
        match self {
            Operator::Ratio if right == 0.0 || right.is_nan() => None,
            Operator::Ratio => Some(left / right),
            Operator::Mult => Some(left * right),
            Operator::Add => Some(left + right),
            Operator::Sub => Some(left - right),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Expression Nodes
// =============================================================================

/// An aggregate function over a field, or `count`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldAggregate {
    function: AggFunction,
    field: Option<Field>,
}

impl FieldAggregate {
    /// The document count aggregate.
    pub fn count() -> Self {
        Self {
            function: AggFunction::Count,
            field: None,
        }
    }

    /// `function` over `field`.
    ///
    /// No legality check is made here; the parser validates against a
    /// [`FieldCatalog`](crate::FieldCatalog).
    pub fn over(function: AggFunction, field: Field) -> Self {
        if function == AggFunction::Count {
            return Self::count();
        }
        Self {
            function,
            field: Some(field),
        }
    }

    /// The aggregate function.
    pub fn function(&self) -> AggFunction {
        self.function
    }

    /// The aggregated field; `None` for `count`.
    pub fn field(&self) -> Option<&Field> {
        self.field.as_ref()
    }

    /// Returns true for the `count` aggregate.
    pub fn is_count(&self) -> bool {
        self.function == AggFunction::Count
    }

    /// Human-readable label, e.g. `Total Cost`.
    pub fn label(&self) -> String {
        match &self.field {
            Some(field) => format!("{} {}", self.function.label_prefix(), field.label),
            None => self.function.label_prefix().to_string(),
        }
    }

    /// Engine aggregation name: `count` or `<fn>-<field>`.
    pub fn agg_name(&self) -> String {
        match &self.field {
            Some(field) => format!("{}-{}", self.function.name(), field.name),
            None => self.function.name().to_string(),
        }
    }
}

impl fmt::Display for FieldAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}:{}", self.function, field.name),
            None => write!(f, "{}", self.function),
        }
    }
}

/// A numeric literal operand.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constant(f64);

impl Constant {
    /// Wraps a number.
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// The literal value.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Slug of the numeral: `3.14` becomes `3-14` and `-2` becomes `neg-2`.
    pub fn agg_name(self) -> String {
        let digits = Constant(self.0.abs())
            .to_string()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        if self.0 < 0.0 {
            format!("neg-{}", digits)
        } else {
            digits
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A binary operator applied to two sub-expressions.
///
/// Immutable once built; operands are reachable through accessors only.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Calculation {
    operator: Operator,
    left: Box<Expression>,
    right: Box<Expression>,
}

impl Calculation {
    /// Builds `operator(left, right)`.
    pub fn new(operator: Operator, left: Expression, right: Expression) -> Self {
        Self {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// The operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The left operand.
    pub fn left(&self) -> &Expression {
        &self.left
    }

    /// The right operand.
    pub fn right(&self) -> &Expression {
        &self.right
    }

    /// Operator label over the operand labels, parenthesizing operands that
    /// are calculations themselves.
    pub fn label(&self) -> String {
        self.operator
            .label(&operand_label(&self.left), &operand_label(&self.right))
    }

    /// Engine aggregation name: `<op>-<left>-<right>`.
    pub fn agg_name(&self) -> String {
        format!(
            "{}-{}-{}",
            self.operator.name(),
            self.left.agg_name(),
            self.right.agg_name()
        )
    }
}

fn operand_label(operand: &Expression) -> String {
    match operand {
        Expression::Calculation(_) => format!("({})", operand.label()),
        _ => operand.label(),
    }
}

impl fmt::Display for Calculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.operator.format(&self.left, &self.right))
    }
}

/// A parsed or constructed aggregate expression.
///
/// ```rust
/// use aggtree_expr::{Expression, Field, FieldType};
///
/// let cost = Field::new("cost", "Cost", FieldType::Number);
/// let expr = Expression::ratio(Expression::sum(cost), Expression::count());
///
/// assert_eq!(expr.label(), "Total Cost / Count");
/// assert_eq!(expr.to_string(), "ratio(sum:cost / count)");
/// assert_eq!(expr.agg_name(), "ratio-sum-cost-count");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expression {
    /// `fn:field` or `count`.
    Field(FieldAggregate),
    /// Numeric literal.
    Constant(Constant),
    /// `op(left, right)`.
    Calculation(Calculation),
}

impl Expression {
    // -------------------------------------------------------------------------
    // Constructors
    // -------------------------------------------------------------------------

    /// `count`.
    pub fn count() -> Self {
        Expression::Field(FieldAggregate::count())
    }

    /// `sum:field`.
    pub fn sum(field: Field) -> Self {
        Expression::Field(FieldAggregate::over(AggFunction::Sum, field))
    }

    /// `avg:field`.
    pub fn avg(field: Field) -> Self {
        Expression::Field(FieldAggregate::over(AggFunction::Avg, field))
    }

    /// `max:field`.
    pub fn max(field: Field) -> Self {
        Expression::Field(FieldAggregate::over(AggFunction::Max, field))
    }

    /// `min:field`.
    pub fn min(field: Field) -> Self {
        Expression::Field(FieldAggregate::over(AggFunction::Min, field))
    }

    /// `value_count:field`.
    pub fn value_count(field: Field) -> Self {
        Expression::Field(FieldAggregate::over(AggFunction::ValueCount, field))
    }

    /// `cardinality:field`.
    pub fn cardinality(field: Field) -> Self {
        Expression::Field(FieldAggregate::over(AggFunction::Cardinality, field))
    }

    /// A numeric literal.
    pub fn constant(value: f64) -> Self {
        Expression::Constant(Constant::new(value))
    }

    /// `ratio(left, right)`.
    pub fn ratio(left: Expression, right: Expression) -> Self {
        Expression::Calculation(Calculation::new(Operator::Ratio, left, right))
    }

    /// `mult(left, right)`.
    pub fn mult(left: Expression, right: Expression) -> Self {
        Expression::Calculation(Calculation::new(Operator::Mult, left, right))
    }

    /// `add(left, right)`.
    pub fn add(left: Expression, right: Expression) -> Self {
        Expression::Calculation(Calculation::new(Operator::Add, left, right))
    }

    /// `sub(left, right)`.
    pub fn sub(left: Expression, right: Expression) -> Self {
        Expression::Calculation(Calculation::new(Operator::Sub, left, right))
    }

    // -------------------------------------------------------------------------
    // Naming
    // -------------------------------------------------------------------------

    /// Human-readable label for display, e.g. in chart axes.
    pub fn label(&self) -> String {
        match self {
            Expression::Field(agg) => agg.label(),
            Expression::Constant(c) => c.to_string(),
            Expression::Calculation(calc) => calc.label(),
        }
    }

    /// Deterministic engine aggregation name.
    ///
    /// Structurally equal expressions always share a name, which is what
    /// lets a calculation reference its operands' aggregations by id.
    pub fn agg_name(&self) -> String {
        match self {
            Expression::Field(agg) => agg.agg_name(),
            Expression::Constant(c) => c.agg_name(),
            Expression::Calculation(calc) => calc.agg_name(),
        }
    }

    /// Label of the aggregated field, for field aggregates over a field.
    pub fn field_label(&self) -> Option<&str> {
        match self {
            Expression::Field(agg) => agg.field().map(|f| f.label.as_str()),
            _ => None,
        }
    }

    /// Returns true for numeric literals.
    pub fn is_constant(&self) -> bool {
        matches!(self, Expression::Constant(_))
    }

    /// Returns true if engine-side ordering by this expression's value is
    /// unavailable, so results must be sorted after transformation.
    pub fn needs_value_sort(&self) -> bool {
        matches!(self, Expression::Calculation(_))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Field(agg) => fmt::Display::fmt(agg, f),
            Expression::Constant(c) => fmt::Display::fmt(c, f),
            Expression::Calculation(calc) => fmt::Display::fmt(calc, f),
        }
    }
}

impl From<FieldAggregate> for Expression {
    fn from(agg: FieldAggregate) -> Self {
        Expression::Field(agg)
    }
}

impl From<Constant> for Expression {
    fn from(c: Constant) -> Self {
        Expression::Constant(c)
    }
}

impl From<Calculation> for Expression {
    fn from(calc: Calculation) -> Self {
        Expression::Calculation(calc)
    }
}
