mod compare;
mod hash;
mod tag;

#[cfg(test)]
mod tests;

use crate::geometry::Geometry;
use compare::I64_EXCLUSIVE_BOUND;
use serde::{Serialize, Serializer, ser::SerializeSeq};
use std::{cmp::Ordering, fmt};

// re-exports
pub use compare::{canonical_cmp, strict_order_cmp};
pub use hash::hash_value;
pub use tag::ValueTag;

#[cfg(test)]
pub(crate) use hash::with_test_hash_override;

///
/// CONSTANTS
///

/// Largest magnitude at which every integer is exactly representable as f64.
pub(crate) const F64_SAFE_I64: i64 = 1i64 << 53;

///
/// Value
///
/// Runtime attribute/expression value.
///
/// Null     → missing attribute or SQL NULL.
/// List     → ordered array; order is significant for equality and hashing.
/// Geometry → geometry-valued expression result (`$geometry`, `collect`).
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Self>),
    Geometry(Geometry),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    #[must_use]
    pub const fn canonical_tag(&self) -> ValueTag {
        tag::canonical_tag(self)
    }

    #[must_use]
    pub const fn canonical_rank(&self) -> u8 {
        tag::canonical_rank(self)
    }

    /// Human-readable type label for diagnostics.
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        self.canonical_tag().label()
    }

    #[must_use]
    pub fn canonical_cmp(left: &Self, right: &Self) -> Ordering {
        canonical_cmp(left, right)
    }

    /// Numeric view of this value; text is parsed leniently.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Integer view of this value; doubles are rounded half away from zero.
    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Float(f) if f.is_finite() && f.abs() < F64_SAFE_I64 as f64 => {
                Some(f.round() as i64)
            }
            Self::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| Self::Float(trimmed.parse::<f64>().ok()?).as_i64())
            }
            _ => None,
        }
    }

    /// Truthiness used by filters and boolean operators. `None` for NULL.
    #[must_use]
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Float(f) => Some(*f != 0.0),
            Self::Text(s) => Some(!s.is_empty()),
            Self::List(items) => Some(!items.is_empty()),
            Self::Geometry(geometry) => Some(!geometry.is_empty()),
        }
    }

    /// Text rendering used by string concatenation and `to_string`.
    /// NULL renders as the empty string.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Text(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .map(Self::render)
                .collect::<Vec<_>>()
                .join(","),
            Self::Geometry(geometry) => geometry.to_wkt(),
        }
    }

    /// Canonical form used for grouping.
    ///
    /// Integral doubles that fit in `i64` collapse to `Int` (so `-0.0`
    /// becomes `0` and `2.0^60` becomes `2^60`), every NaN becomes one canonical NaN, and lists
    /// canonicalize element-wise.
    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub fn canonicalize(self) -> Self {
        match self {
            Self::Float(f) if f.is_nan() => Self::Float(f64::NAN),
            Self::Float(f)
                if f.fract() == 0.0 && (-I64_EXCLUSIVE_BOUND..I64_EXCLUSIVE_BOUND).contains(&f) =>
            {
                Self::Int(f as i64)
            }
            Self::List(items) => Self::List(items.into_iter().map(Self::canonicalize).collect()),
            other => other,
        }
    }

    /// True when both values canonicalize to the same grouping key.
    #[must_use]
    pub fn group_eq(&self, other: &Self) -> bool {
        canonical_cmp(&self.clone().canonicalize(), &other.clone().canonicalize())
            == Ordering::Equal
    }

    #[must_use]
    pub const fn as_geometry(&self) -> Option<&Geometry> {
        match self {
            Self::Geometry(geometry) => Some(geometry),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Render a double without a trailing `.0` when it holds an integer.
#[must_use]
#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < F64_SAFE_I64 as f64 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            other => f.write_str(&other.render()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Text(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Geometry(geometry) => serializer.serialize_str(&geometry.to_wkt()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Geometry> for Value {
    fn from(value: Geometry) -> Self {
        Self::Geometry(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
