//! Aggregate expression parser implementation using nom.
//!
//! ```text
//! expr  := calc | agg | NUMBER
//! calc  := op '(' expr ',' expr ')'        op ∈ ratio | mult | add | sub
//! agg   := fn [ ':' field ]                checked against the field catalog
//! NUMBER:= '-'? DIGIT+ ( '.' DIGIT* )?
//! ```
//!
//! Alternatives are tried in that order and the first one that succeeds
//! wins. Whitespace around calculation arguments is ignored.

use std::cell::Cell;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit0, digit1, multispace0},
    combinator::{all_consuming, map_res, opt, recognize, value},
    error::{Error, ErrorKind},
    sequence::{delimited, pair, terminated, tuple},
    IResult,
};
use tracing::debug;

use crate::ast::{AggFunction, Calculation, Constant, Expression, FieldAggregate, Operator};
use crate::catalog::FieldCatalog;
use crate::config::ParserConfig;
use crate::error::{ExprError, ExprResult};

/// Parse an aggregate expression string against a field catalog.
///
/// # Examples
///
/// ```rust
/// use aggtree_expr::{parse, Field, FieldCatalog, FieldType};
///
/// let catalog = FieldCatalog::new([
///     Field::new("cost", "Cost", FieldType::Number),
///     Field::new("revenue", "Revenue", FieldType::Number),
/// ]);
///
/// // Simple aggregate
/// let expr = parse(&catalog, "sum:cost").unwrap();
/// assert_eq!(expr.label(), "Total Cost");
///
/// // Nested calculation with a constant
/// let expr = parse(&catalog, "mult(3, ratio(count, sum:revenue))").unwrap();
/// assert_eq!(expr.label(), "3 * (Count / Total Revenue)");
///
/// // Unknown shorthand
/// let err = parse(&catalog, "foo").unwrap_err();
/// assert_eq!(err.to_string(), "\"foo\" is not a valid aggregate expression.");
/// ```
pub fn parse(catalog: &FieldCatalog, input: &str) -> ExprResult<Expression> {
    parse_with(catalog, input, &ParserConfig::default())
}

/// Parse with an explicit [`ParserConfig`].
pub fn parse_with(
    catalog: &FieldCatalog,
    input: &str,
    config: &ParserConfig,
) -> ExprResult<Expression> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ExprError::EmptyExpression);
    }

    let parser = ExprParser {
        catalog,
        max_depth: config.max_depth,
        too_deep: Cell::new(false),
    };
    let result = all_consuming(|i| parser.expression(i, 0))(trimmed);

    match result {
        Ok((_, expr)) => Ok(expr),
        Err(_) if parser.too_deep.get() => {
            debug!(target: "aggtree_expr::parser", input, max_depth = config.max_depth, "expression too deep");
            Err(ExprError::TooDeep {
                max_depth: config.max_depth,
            })
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let position = trimmed.len() - e.input.len();
            debug!(target: "aggtree_expr::parser", input, position, "rejected aggregate expression");
            Err(ExprError::InvalidExpression {
                input: input.to_string(),
                position,
            })
        }
        Err(nom::Err::Incomplete(_)) => Err(ExprError::InvalidExpression {
            input: input.to_string(),
            position: trimmed.len(),
        }),
    }
}

struct ExprParser<'c> {
    catalog: &'c FieldCatalog,
    max_depth: usize,
    too_deep: Cell<bool>,
}

impl ExprParser<'_> {
    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression<'a>(&self, input: &'a str, depth: usize) -> IResult<&'a str, Expression> {
        alt((
            |i| self.calculation(i, depth),
            |i| self.field_aggregate(i),
            constant,
        ))(input)
    }

    fn calculation<'a>(&self, input: &'a str, depth: usize) -> IResult<&'a str, Expression> {
        let (input, operator) = terminated(operator, char('('))(input)?;
        if depth >= self.max_depth {
            self.too_deep.set(true);
            return Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge)));
        }
        let (input, left) = self.argument(input, depth)?;
        let (input, _) = char(',')(input)?;
        let (input, right) = self.argument(input, depth)?;
        let (input, _) = char(')')(input)?;
        Ok((
            input,
            Expression::Calculation(Calculation::new(operator, left, right)),
        ))
    }

    fn argument<'a>(&self, input: &'a str, depth: usize) -> IResult<&'a str, Expression> {
        delimited(multispace0, |i| self.expression(i, depth + 1), multispace0)(input)
    }

    // ========================================================================
    // Field aggregates
    // ========================================================================

    fn field_aggregate<'a>(&self, input: &'a str) -> IResult<&'a str, Expression> {
        let start = input;
        let (input, name) = take_while1(is_function_char)(input)?;
        let (input, field) = opt(pair(char(':'), take_while1(is_field_char)))(input)?;
        let field = field.map(|(_, name)| name);

        let function = AggFunction::from_name(name)
            .filter(|&function| self.catalog.allows(function, field))
            .ok_or_else(|| nom::Err::Error(Error::new(start, ErrorKind::Verify)))?;

        let aggregate = match field.and_then(|name| self.catalog.find(name)) {
            Some(field) => FieldAggregate::over(function, field.clone()),
            None => FieldAggregate::count(),
        };
        Ok((input, Expression::Field(aggregate)))
    }
}

fn operator(input: &str) -> IResult<&str, Operator> {
    alt((
        value(Operator::Ratio, tag("ratio")),
        value(Operator::Mult, tag("mult")),
        value(Operator::Add, tag("add")),
        value(Operator::Sub, tag("sub")),
    ))(input)
}

fn constant(input: &str) -> IResult<&str, Expression> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, opt(pair(char('.'), digit0))))),
        |numeral: &str| numeral.parse::<f64>().map(|n| Expression::Constant(Constant::new(n))),
    )(input)
}

fn is_function_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_field_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | '(' | ')')
}
