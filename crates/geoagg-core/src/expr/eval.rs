//! Module: expr::eval
//! Responsibility: tree-walking evaluation with SQL three-valued NULL logic.
//! Does not own: parsing or column resolution.
//!
//! Aggregate calls iterate over `ExpressionContext::layer`. A member takes
//! part when its `group_by` value matches the current feature's value under
//! grouping equality and its filter is true.

use crate::{
    expr::{
        ast::{BinaryOp, Expr, Special, UnaryOp},
        context::ExpressionContext,
        function::{
            AggregateFunction, Function, ScalarFunction,
            aggregate::{self, DEFAULT_DELIMITER},
            scalar,
        },
    },
    geometry::{AreaUnit, Crs, DistanceArea, DistanceUnit},
    value::{Value, strict_order_cmp},
};
use std::cmp::Ordering;
use thiserror::Error as ThisError;

///
/// EvalError
///
/// Reason an evaluation failed; wrapped with the expression text by
/// `Expression::evaluate`.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum EvalError {
    #[error("column '{0}' not found")]
    UnknownColumn(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in {0}")]
    Overflow(String),

    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("function '{function}' expects numeric values, got {found}")]
    NotNumeric {
        function: String,
        found: &'static str,
    },

    #[error("function '{function}' cannot take a {found} argument")]
    InvalidArgument {
        function: String,
        found: &'static str,
    },

    #[error("function '{function}' cannot convert {value}")]
    Conversion { function: String, value: String },

    #[error("{0}")]
    Internal(String),
}

impl EvalError {
    pub(crate) fn not_numeric(function: &str, value: &Value) -> Self {
        Self::NotNumeric {
            function: function.to_string(),
            found: value.type_label(),
        }
    }

    pub(crate) fn invalid_argument(function: &str, value: &Value) -> Self {
        Self::InvalidArgument {
            function: function.to_string(),
            found: value.type_label(),
        }
    }

    const fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> Self {
        Self::TypeMismatch {
            op: op.symbol(),
            left: left.type_label(),
            right: right.type_label(),
        }
    }
}

///
/// Measurement
///
/// Calculator and output units used by `$area`, `$length`, `$perimeter`.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    pub calculator: DistanceArea,
    pub distance_units: DistanceUnit,
    pub area_units: AreaUnit,
}

impl Default for Measurement {
    fn default() -> Self {
        Self {
            calculator: DistanceArea::new(Crs::default()),
            distance_units: DistanceUnit::default(),
            area_units: AreaUnit::default(),
        }
    }
}

/// Evaluate one tree against a context.
pub(crate) fn evaluate(
    expr: &Expr,
    ctx: ExpressionContext<'_>,
    measurement: &Measurement,
) -> Result<Value, EvalError> {
    Evaluator { measurement }.eval(expr, ctx)
}

struct Evaluator<'m> {
    measurement: &'m Measurement,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr, ctx: ExpressionContext<'_>) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Column { name, index } => column(name, *index, ctx),
            Expr::Variable(name) => Ok(ctx.variable(name)),
            Expr::Special(special) => Ok(self.special(*special, ctx)),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, ctx)?;
                unary(*op, value)
            }
            Expr::Binary { op, left, right } => self.binary(*op, left, right, ctx),
            Expr::Call { function, args } => match function {
                Function::Scalar(ScalarFunction::If) => self.if_call(args, ctx),
                Function::Scalar(function) => {
                    let values = args
                        .iter()
                        .map(|arg| self.eval(arg, ctx))
                        .collect::<Result<Vec<_>, _>>()?;
                    scalar::call(*function, values)
                }
                Function::Aggregate(function) => self.aggregate(*function, args, ctx),
            },
        }
    }

    fn special(&self, special: Special, ctx: ExpressionContext<'_>) -> Value {
        let Some(feature) = ctx.feature else {
            return Value::Null;
        };
        if special == Special::Id {
            return Value::Int(feature.id);
        }
        let Some(geometry) = feature.geometry.as_ref() else {
            return Value::Null;
        };

        let m = self.measurement;
        match special {
            Special::Geometry => Value::Geometry(geometry.clone()),
            Special::Area => Value::Float(
                m.area_units
                    .from_square_meters(m.calculator.measure_area(geometry)),
            ),
            Special::Length => Value::Float(
                m.distance_units
                    .from_meters(m.calculator.measure_length(geometry)),
            ),
            Special::Perimeter => Value::Float(
                m.distance_units
                    .from_meters(m.calculator.measure_perimeter(geometry)),
            ),
            Special::X => geometry.point_xy().map_or(Value::Null, |(x, _)| Value::Float(x)),
            Special::Y => geometry.point_xy().map_or(Value::Null, |(_, y)| Value::Float(y)),
            Special::Id => Value::Int(feature.id),
        }
    }

    fn binary(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        ctx: ExpressionContext<'_>,
    ) -> Result<Value, EvalError> {
        match op {
            BinaryOp::And => {
                let l = self.eval(left, ctx)?.truthiness();
                if l == Some(false) {
                    return Ok(Value::Bool(false));
                }
                let r = self.eval(right, ctx)?.truthiness();
                Ok(match (l, r) {
                    (_, Some(false)) => Value::Bool(false),
                    (Some(true), Some(true)) => Value::Bool(true),
                    _ => Value::Null,
                })
            }
            BinaryOp::Or => {
                let l = self.eval(left, ctx)?.truthiness();
                if l == Some(true) {
                    return Ok(Value::Bool(true));
                }
                let r = self.eval(right, ctx)?.truthiness();
                Ok(match (l, r) {
                    (_, Some(true)) => Value::Bool(true),
                    (Some(false), Some(false)) => Value::Bool(false),
                    _ => Value::Null,
                })
            }
            _ => {
                let l = self.eval(left, ctx)?;
                let r = self.eval(right, ctx)?;
                binary_values(op, &l, &r)
            }
        }
    }

    fn if_call(&self, args: &[Expr], ctx: ExpressionContext<'_>) -> Result<Value, EvalError> {
        let [condition, then, otherwise] = args else {
            return Err(EvalError::Internal("if() takes three arguments".to_string()));
        };

        if self.eval(condition, ctx)?.truthiness() == Some(true) {
            self.eval(then, ctx)
        } else {
            self.eval(otherwise, ctx)
        }
    }

    fn aggregate(
        &self,
        function: AggregateFunction,
        args: &[Expr],
        ctx: ExpressionContext<'_>,
    ) -> Result<Value, EvalError> {
        let Some(input) = args.first() else {
            return Err(EvalError::Internal(format!(
                "{}() requires an input expression",
                function.name()
            )));
        };
        let group_by = args.get(1).filter(|expr| !expr.is_null_literal());
        let filter = args.get(2).filter(|expr| !expr.is_null_literal());
        let delimiter = match args.get(3) {
            Some(expr) => match self.eval(expr, ctx)? {
                Value::Null => DEFAULT_DELIMITER.to_string(),
                value => value.render(),
            },
            None => DEFAULT_DELIMITER.to_string(),
        };

        let current_key = match (group_by, ctx.feature) {
            (Some(group_by), Some(_)) => Some(self.eval(group_by, ctx)?),
            _ => None,
        };

        let mut values = Vec::new();
        for member in ctx.layer {
            let member_ctx = ctx.with_feature(member);
            if let (Some(group_by), Some(key)) = (group_by, current_key.as_ref())
                && !self.eval(group_by, member_ctx)?.group_eq(key)
            {
                continue;
            }
            if let Some(filter) = filter
                && self.eval(filter, member_ctx)?.truthiness() != Some(true)
            {
                continue;
            }
            values.push(self.eval(input, member_ctx)?);
        }

        aggregate::reduce(function, values, &delimiter, ctx.engine)
    }
}

fn column(name: &str, index: Option<usize>, ctx: ExpressionContext<'_>) -> Result<Value, EvalError> {
    let index = match index {
        Some(index) => index,
        None => ctx
            .fields
            .index_of(name)
            .ok_or_else(|| EvalError::UnknownColumn(name.to_string()))?,
    };

    Ok(ctx
        .feature
        .map_or(Value::Null, |feature| feature.attribute(index).clone()))
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(value.truthiness().map_or(Value::Null, |b| Value::Bool(!b))),
        UnaryOp::Neg => match value {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => Ok(negate_int(i)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => match number(&other) {
                Some(Number::Int(i)) => Ok(negate_int(i)),
                Some(Number::Float(f)) => Ok(Value::Float(-f)),
                None => Err(EvalError::mismatch(BinaryOp::Sub, &Value::Int(0), &other)),
            },
        },
    }
}

fn negate_int(i: i64) -> Value {
    i.checked_neg()
        .map_or_else(|| Value::Float(-to_f64(i)), Value::Int)
}

fn binary_values(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Is | BinaryOp::IsNot => {
            let same = match (l.is_null(), r.is_null()) {
                (true, true) => true,
                (false, false) => compare(l, r) == Some(Ordering::Equal),
                _ => false,
            };
            Ok(Value::Bool(same == (op == BinaryOp::Is)))
        }
        _ if l.is_null() || r.is_null() => Ok(Value::Null),
        BinaryOp::Eq => Ok(Value::Bool(compare(l, r) == Some(Ordering::Equal))),
        BinaryOp::Ne => Ok(Value::Bool(compare(l, r) != Some(Ordering::Equal))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(l, r).ok_or_else(|| EvalError::mismatch(op, l, r))?;
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Concat => Ok(Value::Text(l.render() + &r.render())),
        BinaryOp::Add => match (l, r) {
            (Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{a}{b}"))),
            _ => arithmetic(op, l, r),
        },
        _ => arithmetic(op, l, r),
    }
}

// Operator comparison: strict typed order first, then numeric text, then
// the text renderings.
fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    if let Some(ordering) = strict_order_cmp(l, r) {
        return Some(ordering);
    }
    if (l.is_numeric() || r.is_numeric())
        && let (Some(a), Some(b)) = (l.as_f64(), r.as_f64())
    {
        return a.partial_cmp(&b);
    }
    if matches!(l, Value::Text(_)) || matches!(r, Value::Text(_)) {
        return Some(l.render().cmp(&r.render()));
    }

    None
}

///
/// Number
///

#[derive(Clone, Copy, Debug)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    const fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => to_f64(i),
            Self::Float(f) => f,
        }
    }
}

fn number(value: &Value) -> Option<Number> {
    match value {
        Value::Int(i) => Some(Number::Int(*i)),
        Value::Float(f) => Some(Number::Float(*f)),
        Value::Bool(b) => Some(Number::Int(i64::from(*b))),
        Value::Text(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .map(Number::Int)
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(Number::Float))
        }
        _ => None,
    }
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    let (Some(a), Some(b)) = (number(l), number(r)) else {
        return Err(EvalError::mismatch(op, l, r));
    };

    if let (Number::Int(a), Number::Int(b)) = (a, b) {
        let checked = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Mod => {
                if b == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                Some(a.wrapping_rem(b))
            }
            _ => None,
        };
        if let Some(result) = checked {
            return Ok(Value::Int(result));
        }
    }

    let (a, b) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a / b
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a % b
        }
        _ => return Err(EvalError::mismatch(op, l, r)),
    };

    Ok(Value::Float(result))
}

#[expect(clippy::cast_precision_loss)]
const fn to_f64(i: i64) -> f64 {
    i as f64
}
