//! Field catalog: the queryable fields of a dataset.
//!
//! The catalog decides which `fn:field` combinations are legal. Every field
//! supports `value_count` and `cardinality`; number and date fields add `max`
//! and `min`; number fields add `sum` and `avg`. `count` takes no field and
//! is always legal.

use std::convert::Infallible;
use std::str::FromStr;

use crate::ast::{AggFunction, Expression, FieldAggregate};

/// Classification of a field's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FieldType {
    /// Numeric values.
    #[cfg_attr(
        feature = "serde",
        serde(alias = "double", alias = "float", alias = "long", alias = "integer")
    )]
    Number,
    /// Date or timestamp values.
    Date,
    /// Anything else: keywords, text, booleans.
    #[cfg_attr(feature = "serde", serde(other))]
    Discrete,
}

impl FieldType {
    /// Returns true for numeric fields.
    pub fn is_numeric(self) -> bool {
        self == FieldType::Number
    }

    /// Returns true if `max`/`min` apply to the field.
    pub fn is_ordered(self) -> bool {
        matches!(self, FieldType::Number | FieldType::Date)
    }

    /// Returns true if `function` may be applied to a field of this type.
    pub fn supports(self, function: AggFunction) -> bool {
        match function {
            AggFunction::Count => false,
            AggFunction::ValueCount | AggFunction::Cardinality => true,
            AggFunction::Max | AggFunction::Min => self.is_ordered(),
            AggFunction::Sum | AggFunction::Avg => self.is_numeric(),
        }
    }
}

impl FromStr for FieldType {
    type Err = Infallible;

    /// Classifies an engine or schema type name; unknown names are
    /// [`FieldType::Discrete`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "number" | "double" | "float" | "half_float" | "scaled_float" | "long"
            | "integer" | "short" | "byte" => FieldType::Number,
            "date" => FieldType::Date,
            _ => FieldType::Discrete,
        })
    }
}

/// A queryable field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    /// Field name as known to the engine.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Value classification.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub field_type: FieldType,
}

impl Field {
    /// Creates a field.
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
        }
    }
}

/// Ordered collection of the fields expressions may refer to.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FieldCatalog {
    fields: Vec<Field>,
}

impl FieldCatalog {
    /// Creates a catalog from fields, keeping their order.
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// The fields in catalog order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Finds a field by name.
    pub fn find(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns true if `function` over `field` (or over no field, for
    /// `count`) is a legal expression in this catalog.
    pub fn allows(&self, function: AggFunction, field: Option<&str>) -> bool {
        match (function, field) {
            (AggFunction::Count, None) => true,
            (AggFunction::Count, Some(_)) | (_, None) => false,
            (function, Some(name)) => self
                .find(name)
                .is_some_and(|f| f.field_type.supports(function)),
        }
    }

    /// Every legal simple expression string.
    ///
    /// Ordered as: `count`, then `value_count:` and `cardinality:` for every
    /// field, then `max:`/`min:` (and `sum:`/`avg:` for numbers) per ordered
    /// field.
    ///
    /// ```rust
    /// use aggtree_expr::{Field, FieldCatalog, FieldType};
    ///
    /// let catalog = FieldCatalog::new([
    ///     Field::new("cost", "Cost", FieldType::Number),
    ///     Field::new("city", "City", FieldType::Discrete),
    /// ]);
    /// assert_eq!(
    ///     catalog.lexicon(),
    ///     vec![
    ///         "count",
    ///         "value_count:cost",
    ///         "value_count:city",
    ///         "cardinality:cost",
    ///         "cardinality:city",
    ///         "max:cost",
    ///         "min:cost",
    ///         "sum:cost",
    ///         "avg:cost",
    ///     ]
    /// );
    /// ```
    pub fn lexicon(&self) -> Vec<String> {
        let mut lexicon = vec![AggFunction::Count.name().to_string()];
        for function in [AggFunction::ValueCount, AggFunction::Cardinality] {
            lexicon.extend(self.fields.iter().map(|f| format!("{}:{}", function.name(), f.name)));
        }
        for field in self.fields.iter().filter(|f| f.field_type.is_ordered()) {
            let functions: &[AggFunction] = if field.field_type.is_numeric() {
                &[AggFunction::Max, AggFunction::Min, AggFunction::Sum, AggFunction::Avg]
            } else {
                &[AggFunction::Max, AggFunction::Min]
            };
            lexicon.extend(functions.iter().map(|fun| format!("{}:{}", fun.name(), field.name)));
        }
        lexicon
    }

    /// Builds every legal field aggregate whose function is in `functions`.
    ///
    /// `count` (if requested) comes first, then the field aggregates in
    /// catalog order, each field's functions in the order given.
    pub fn expressions(&self, functions: &[AggFunction]) -> Vec<Expression> {
        let mut expressions = Vec::new();
        if functions.contains(&AggFunction::Count) {
            expressions.push(Expression::count());
        }
        for field in &self.fields {
            for &function in functions {
                if field.field_type.supports(function) {
                    expressions.push(Expression::Field(FieldAggregate::over(
                        function,
                        field.clone(),
                    )));
                }
            }
        }
        expressions
    }
}

impl FromIterator<Field> for FieldCatalog {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self::new(iter)
    }
}
