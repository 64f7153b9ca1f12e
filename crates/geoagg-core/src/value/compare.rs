use crate::value::Value;
use std::cmp::Ordering;

/// 2^63: every double in `[-2^63, 2^63)` with no fraction is exactly an `i64`.
pub(crate) const I64_EXCLUSIVE_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Total canonical comparator used by sorting aggregates and group keys.
///
/// Ordering rules:
/// 1. Canonical variant rank
/// 2. Variant-specific comparison for same-ranked values
///
/// Mixed-variant comparisons are rank-only and must remain deterministic.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    let rank = left.canonical_rank().cmp(&right.canonical_rank());
    if rank != Ordering::Equal {
        return rank;
    }

    canonical_cmp_same_rank(left, right)
}

/// Strict comparator for expression operators.
///
/// Numbers compare across integer/double; returns `None` for NULL operands,
/// mismatched variants, and unordered doubles.
#[must_use]
pub fn strict_order_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => int_float_cmp(*a, *b),
        (Value::Float(a), Value::Int(b)) => int_float_cmp(*b, *a).map(Ordering::reverse),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
        (Value::List(a), Value::List(b)) => strict_order_list(a, b),
        (Value::Geometry(a), Value::Geometry(b)) => (a == b).then_some(Ordering::Equal),
        _ => None,
    }
}

fn canonical_cmp_same_rank(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Int(a), Value::Float(b)) => int_float_total_cmp(*a, *b),
        (Value::Float(a), Value::Int(b)) => int_float_total_cmp(*b, *a).reverse(),
        (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
        (Value::Text(a), Value::Text(b)) => a.cmp(b),
        (Value::List(a), Value::List(b)) => canonical_cmp_value_list(a, b),
        (Value::Geometry(a), Value::Geometry(b)) => a.to_wkt().cmp(&b.to_wkt()),
        _ => Ordering::Equal,
    }
}

/// Exact integer/double comparison; `None` when the double is NaN.
///
/// Large integers are not rounded through `f64`, so `2^60 + 1` orders above
/// the double `2^60`.
#[expect(clippy::cast_possible_truncation)]
pub(crate) fn int_float_cmp(int: i64, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    if float >= I64_EXCLUSIVE_BOUND {
        return Some(Ordering::Less);
    }
    if float < -I64_EXCLUSIVE_BOUND {
        return Some(Ordering::Greater);
    }

    // In range, so the truncated part is exactly representable.
    let whole = float.trunc() as i64;
    let ordering = int.cmp(&whole).then_with(|| {
        let fract = float.fract();
        if fract > 0.0 {
            Ordering::Less
        } else if fract < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    });

    Some(ordering)
}

// NaN sorts by sign, matching `f64::total_cmp` against any finite value.
fn int_float_total_cmp(int: i64, float: f64) -> Ordering {
    int_float_cmp(int, float).unwrap_or_else(|| {
        if float.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    })
}

fn canonical_cmp_value_list(left: &[Value], right: &[Value]) -> Ordering {
    for (left, right) in left.iter().zip(right.iter()) {
        let cmp = canonical_cmp(left, right);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    left.len().cmp(&right.len())
}

// Element-wise strict comparison; any incomparable pair makes the lists
// incomparable.
fn strict_order_list(left: &[Value], right: &[Value]) -> Option<Ordering> {
    for (left, right) in left.iter().zip(right.iter()) {
        let cmp = strict_order_cmp(left, right)?;
        if cmp != Ordering::Equal {
            return Some(cmp);
        }
    }

    Some(left.len().cmp(&right.len()))
}
