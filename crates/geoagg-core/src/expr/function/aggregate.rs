//! Module: expr::function::aggregate
//! Responsibility: reduce the input values of one aggregate call to a result.
//! Does not own: member selection (group_by/filter) or input evaluation.

use crate::{
    expr::{eval::EvalError, function::AggregateFunction},
    geometry::{Geometry, GeometryEngine},
    value::{Value, canonical_cmp},
};
use std::cmp::Ordering;

/// Delimiter used by `concatenate` when none is given.
pub const DEFAULT_DELIMITER: &str = ",";

/// Reduce `values` (one per selected member, in member order).
pub(crate) fn reduce(
    function: AggregateFunction,
    values: Vec<Value>,
    delimiter: &str,
    engine: &dyn GeometryEngine,
) -> Result<Value, EvalError> {
    match function {
        AggregateFunction::Count => Ok(count(values.iter().filter(|v| !v.is_null()).count())),
        AggregateFunction::CountMissing => Ok(count(values.iter().filter(|v| v.is_null()).count())),
        AggregateFunction::CountDistinct => Ok(count(distinct(non_null(values)).len())),
        AggregateFunction::Sum => sum(function, values),
        AggregateFunction::Mean => {
            let numbers = numbers(function, values)?;
            Ok(mean(&numbers).map_or(Value::Null, Value::Float))
        }
        AggregateFunction::Median => {
            let mut numbers = numbers(function, values)?;
            numbers.sort_by(f64::total_cmp);
            Ok(median(&numbers).map_or(Value::Null, Value::Float))
        }
        AggregateFunction::Stdev => {
            let numbers = numbers(function, values)?;
            Ok(sample_stdev(&numbers).map_or(Value::Null, Value::Float))
        }
        AggregateFunction::Range => range(function, values),
        AggregateFunction::Minimum => Ok(extreme(values, Ordering::Less)),
        AggregateFunction::Maximum => Ok(extreme(values, Ordering::Greater)),
        AggregateFunction::MinLength => Ok(text_length(values, Iterator::min)),
        AggregateFunction::MaxLength => Ok(text_length(values, Iterator::max)),
        AggregateFunction::Concatenate => Ok(concatenate(non_null(values), delimiter)),
        AggregateFunction::ConcatenateUnique => {
            Ok(concatenate(distinct(non_null(values)), delimiter))
        }
        AggregateFunction::Collect => Ok(collect(&values, engine)),
        AggregateFunction::ArrayAgg => Ok(Value::List(values)),
        AggregateFunction::FirstValue => Ok(values.into_iter().next().unwrap_or(Value::Null)),
        AggregateFunction::LastValue => Ok(values.into_iter().next_back().unwrap_or(Value::Null)),
    }
}

fn count(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

fn non_null(values: Vec<Value>) -> Vec<Value> {
    values.into_iter().filter(|v| !v.is_null()).collect()
}

// First occurrence wins; equality is canonical so 1 and 1.0 are one value.
fn distinct(values: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !out.iter().any(|seen| seen.group_eq(&value)) {
            out.push(value);
        }
    }

    out
}

fn numbers(function: AggregateFunction, values: Vec<Value>) -> Result<Vec<f64>, EvalError> {
    values
        .into_iter()
        .filter(|v| !v.is_null())
        .map(|value| match value {
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => value
                .as_f64()
                .ok_or_else(|| EvalError::not_numeric(function.name(), &value)),
            other => Err(EvalError::not_numeric(function.name(), &other)),
        })
        .collect()
}

#[expect(clippy::cast_precision_loss)]
fn sum(function: AggregateFunction, values: Vec<Value>) -> Result<Value, EvalError> {
    let values = non_null(values);
    if values.is_empty() {
        return Ok(Value::Null);
    }

    // Integer sums stay integral until they overflow.
    let mut int_total: Option<i64> = Some(0);
    let mut float_total = 0.0;
    for value in &values {
        match value {
            Value::Int(i) => {
                int_total = int_total.and_then(|total| total.checked_add(*i));
                float_total += *i as f64;
            }
            Value::Float(f) => {
                int_total = None;
                float_total += f;
            }
            Value::Bool(b) => {
                int_total = int_total.and_then(|total| total.checked_add(i64::from(*b)));
                float_total += f64::from(u8::from(*b));
            }
            other => return Err(EvalError::not_numeric(function.name(), other)),
        }
    }

    Ok(int_total.map_or(Value::Float(float_total), Value::Int))
}

#[expect(clippy::cast_precision_loss)]
fn mean(numbers: &[f64]) -> Option<f64> {
    if numbers.is_empty() {
        return None;
    }

    Some(numbers.iter().sum::<f64>() / numbers.len() as f64)
}

fn median(sorted: &[f64]) -> Option<f64> {
    let len = sorted.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    if len % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some(f64::midpoint(sorted[mid - 1], sorted[mid]))
    }
}

#[expect(clippy::cast_precision_loss)]
fn sample_stdev(numbers: &[f64]) -> Option<f64> {
    if numbers.len() < 2 {
        return None;
    }
    let mean = mean(numbers)?;
    let squares = numbers.iter().map(|n| (n - mean).powi(2)).sum::<f64>();

    Some((squares / (numbers.len() - 1) as f64).sqrt())
}

fn range(function: AggregateFunction, values: Vec<Value>) -> Result<Value, EvalError> {
    let values = non_null(values);
    if values.iter().all(|v| matches!(v, Value::Int(_))) {
        let ints = values.iter().filter_map(Value::as_i64);
        let (Some(min), Some(max)) = (ints.clone().min(), ints.max()) else {
            return Ok(Value::Null);
        };
        return Ok(max.checked_sub(min).map_or(Value::Null, Value::Int));
    }

    let numbers = numbers(function, values)?;
    let min = numbers.iter().copied().reduce(f64::min);
    let max = numbers.iter().copied().reduce(f64::max);

    Ok(match (min, max) {
        (Some(min), Some(max)) => Value::Float(max - min),
        _ => Value::Null,
    })
}

// Minimum or maximum under the canonical order; the first extreme wins.
fn extreme(values: Vec<Value>, wanted: Ordering) -> Value {
    let mut best: Option<Value> = None;
    for value in non_null(values) {
        let replace = best
            .as_ref()
            .is_none_or(|current| canonical_cmp(&value, current) == wanted);
        if replace {
            best = Some(value);
        }
    }

    best.unwrap_or(Value::Null)
}

fn text_length(
    values: Vec<Value>,
    pick: impl FnOnce(std::vec::IntoIter<usize>) -> Option<usize>,
) -> Value {
    let lengths = non_null(values)
        .iter()
        .map(|value| value.render().chars().count())
        .collect::<Vec<_>>();

    pick(lengths.into_iter()).map_or(Value::Null, count)
}

fn concatenate(values: Vec<Value>, delimiter: &str) -> Value {
    let parts = values.iter().map(Value::render).collect::<Vec<_>>();

    Value::Text(parts.join(delimiter))
}

fn collect(values: &[Value], engine: &dyn GeometryEngine) -> Value {
    let geometries = values
        .iter()
        .filter_map(Value::as_geometry)
        .filter(|geometry| !geometry.is_empty())
        .cloned()
        .collect::<Vec<Geometry>>();

    Value::Geometry(engine.collect(&geometries))
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PlanarEngine;

    fn texts(items: &[&str]) -> Vec<Value> {
        items.iter().map(|s| Value::from(*s)).collect()
    }

    fn run(function: AggregateFunction, values: Vec<Value>, delimiter: &str) -> Result<Value, EvalError> {
        reduce(function, values, delimiter, &PlanarEngine)
    }

    #[test]
    fn concatenate_joins_non_null_values_with_delimiter() {
        let mut values = texts(&["a", "b"]);
        values.insert(1, Value::Null);

        let result = run(AggregateFunction::Concatenate, values, ";").expect("concatenate");

        assert_eq!(result, Value::from("a;b"));
    }

    #[test]
    fn concatenate_unique_keeps_first_occurrence_order() {
        let values = texts(&["b", "a", "b", "c", "a"]);

        let result = run(AggregateFunction::ConcatenateUnique, values, DEFAULT_DELIMITER)
            .expect("concatenate_unique");

        assert_eq!(result, Value::from("b,a,c"));
    }

    #[test]
    fn sum_stays_integral_for_integer_inputs() {
        let values = vec![Value::Int(2), Value::Null, Value::Int(40)];

        assert_eq!(
            run(AggregateFunction::Sum, values, ",").expect("sum"),
            Value::Int(42)
        );
    }

    #[test]
    fn sum_of_only_nulls_is_null() {
        let values = vec![Value::Null, Value::Null];

        assert_eq!(
            run(AggregateFunction::Sum, values, ",").expect("sum"),
            Value::Null
        );
    }

    #[test]
    fn numeric_aggregate_rejects_text_input() {
        let err = run(AggregateFunction::Mean, texts(&["x"]), ",")
            .expect_err("text input must be rejected");

        assert!(err.to_string().contains("mean"), "unexpected message: {err}");
    }

    #[test]
    fn stdev_is_sample_deviation_and_null_below_two_values() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .into_iter()
            .map(Value::Float)
            .collect();
        let Value::Float(stdev) = run(AggregateFunction::Stdev, values, ",").expect("stdev")
        else {
            panic!("stdev must be a double");
        };
        assert!((stdev - 2.138_089_935_299_395).abs() < 1e-12);

        assert_eq!(
            run(AggregateFunction::Stdev, vec![Value::Int(1)], ",").expect("stdev"),
            Value::Null
        );
    }

    #[test]
    fn median_averages_middle_pair() {
        let values = vec![Value::Int(4), Value::Int(1), Value::Int(3), Value::Int(2)];

        assert_eq!(
            run(AggregateFunction::Median, values, ",").expect("median"),
            Value::Float(2.5)
        );
    }

    #[test]
    fn count_distinct_treats_integral_doubles_as_integers() {
        let values = vec![Value::Int(1), Value::Float(1.0), Value::Int(2), Value::Null];

        assert_eq!(
            run(AggregateFunction::CountDistinct, values, ",").expect("count_distinct"),
            Value::Int(2)
        );
    }

    #[test]
    fn minimum_and_maximum_compare_across_numeric_variants() {
        let values = vec![Value::Float(2.5), Value::Int(7), Value::Null, Value::Int(-1)];

        assert_eq!(
            run(AggregateFunction::Minimum, values.clone(), ",").expect("minimum"),
            Value::Int(-1)
        );
        assert_eq!(
            run(AggregateFunction::Maximum, values, ",").expect("maximum"),
            Value::Int(7)
        );
    }

    #[test]
    fn first_and_last_value_follow_member_order() {
        let values = texts(&["first", "middle", "last"]);

        assert_eq!(
            run(AggregateFunction::FirstValue, values.clone(), ",").expect("first_value"),
            Value::from("first")
        );
        assert_eq!(
            run(AggregateFunction::LastValue, values, ",").expect("last_value"),
            Value::from("last")
        );
    }
}
