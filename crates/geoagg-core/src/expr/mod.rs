//! Module: expr
//! Responsibility: the expression language used by group-by keys and
//! aggregate fields. Lifecycle is parse, bind (calculator + units), prepare
//! against a schema, then evaluate any number of times.
//! Does not own: grouping or output policy (see `pipeline`).
//! Boundary: failures leave this module as `ExecutionError` carrying the
//! expression text.

mod ast;
mod context;
mod eval;
mod function;
mod lexer;
mod parser;


use crate::{
    error::ExecutionError,
    geometry::{AreaUnit, DistanceArea, DistanceUnit},
    value::Value,
};
use std::fmt;
use thiserror::Error as ThisError;

// re-exports
pub use ast::{BinaryOp, Expr, Special, UnaryOp};
pub use context::{ExpressionContext, Scope};
pub use eval::{EvalError, Measurement};
pub use function::{
    AggregateFunction, Arity, Function, ScalarFunction, aggregate::DEFAULT_DELIMITER,
};

///
/// ParseError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message} (position {offset})")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

///
/// Expression
///
/// One parsed expression plus the measurement settings it was bound to.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    text: String,
    root: Expr,
    measurement: Measurement,
}

impl Expression {
    /// Parse expression text.
    pub fn parse(text: impl Into<String>) -> Result<Self, ExecutionError> {
        let text = text.into();
        let root = parser::parse(&text).map_err(|err| ExecutionError::parser(&text, err))?;

        Ok(Self {
            text,
            root,
            measurement: Measurement::default(),
        })
    }

    /// Bind the calculator used by `$area`, `$length`, and `$perimeter`.
    #[must_use]
    pub fn with_calculator(mut self, calculator: DistanceArea) -> Self {
        self.measurement.calculator = calculator;
        self
    }

    #[must_use]
    pub const fn with_units(mut self, distance: DistanceUnit, area: AreaUnit) -> Self {
        self.measurement.distance_units = distance;
        self.measurement.area_units = area;
        self
    }

    /// Resolve column references against the context schema.
    ///
    /// Unknown columns are parser-class failures so that a bad expression is
    /// rejected before any feature is processed.
    pub fn prepare(&mut self, ctx: &ExpressionContext<'_>) -> Result<(), ExecutionError> {
        let fields = ctx.fields;
        self.root
            .walk_mut(&mut |node| {
                if let Expr::Column { name, index } = node {
                    let found = fields
                        .index_of(name)
                        .ok_or_else(|| format!("column '{name}' not found"))?;
                    *index = Some(found);
                }
                Ok(())
            })
            .map_err(|reason| ExecutionError::parser(&self.text, reason))
    }

    /// Evaluate against one context.
    pub fn evaluate(&self, ctx: &ExpressionContext<'_>) -> Result<Value, ExecutionError> {
        eval::evaluate(&self.root, *ctx, &self.measurement)
            .map_err(|err| ExecutionError::evaluation(&self.text, err))
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn root(&self) -> &Expr {
        &self.root
    }

    #[must_use]
    pub const fn measurement(&self) -> &Measurement {
        &self.measurement
    }

    /// True when the whole expression is the `NULL` literal.
    #[must_use]
    pub const fn is_null_literal(&self) -> bool {
        self.root.is_null_literal()
    }

    /// Names of every column the expression reads.
    #[must_use]
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.root.walk(&mut |node| {
            if let Expr::Column { name, .. } = node
                && !names.contains(&name.as_str())
            {
                names.push(name.as_str());
            }
        });

        names
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Quote `text` as an expression string literal.
#[must_use]
pub fn quote_string(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
