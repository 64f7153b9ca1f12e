//! Module: expr::function
//! Responsibility: the function registry (names, arities) plus scalar and
//! aggregate function bodies.
//! Does not own: argument evaluation order or member iteration (see `eval`).

pub(crate) mod aggregate;
pub(crate) mod scalar;

use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// Arity
///
/// Inclusive argument-count bounds; `max == None` means variadic.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    const fn exact(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

///
/// Function
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Function {
    Scalar(ScalarFunction),
    Aggregate(AggregateFunction),
}

impl Function {
    /// Resolve a function by case-insensitive name.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        let lowered = name.to_ascii_lowercase();
        ScalarFunction::from_name(&lowered)
            .map(Self::Scalar)
            .or_else(|| AggregateFunction::from_name(&lowered).map(Self::Aggregate))
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar(f) => f.name(),
            Self::Aggregate(f) => f.name(),
        }
    }

    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::Scalar(f) => f.arity(),
            Self::Aggregate(f) => f.arity(),
        }
    }
}

///
/// ScalarFunction
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScalarFunction {
    Abs,
    Area,
    Array,
    Coalesce,
    Concat,
    GeomFromWkt,
    GeomToWkt,
    If,
    Length,
    Lower,
    NumGeometries,
    Perimeter,
    Round,
    ToInt,
    ToReal,
    ToString,
    Upper,
    X,
    Y,
}

impl ScalarFunction {
    const ALL: [Self; 19] = [
        Self::Abs,
        Self::Area,
        Self::Array,
        Self::Coalesce,
        Self::Concat,
        Self::GeomFromWkt,
        Self::GeomToWkt,
        Self::If,
        Self::Length,
        Self::Lower,
        Self::NumGeometries,
        Self::Perimeter,
        Self::Round,
        Self::ToInt,
        Self::ToReal,
        Self::ToString,
        Self::Upper,
        Self::X,
        Self::Y,
    ];

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Area => "area",
            Self::Array => "array",
            Self::Coalesce => "coalesce",
            Self::Concat => "concat",
            Self::GeomFromWkt => "geom_from_wkt",
            Self::GeomToWkt => "geom_to_wkt",
            Self::If => "if",
            Self::Length => "length",
            Self::Lower => "lower",
            Self::NumGeometries => "num_geometries",
            Self::Perimeter => "perimeter",
            Self::Round => "round",
            Self::ToInt => "to_int",
            Self::ToReal => "to_real",
            Self::ToString => "to_string",
            Self::Upper => "upper",
            Self::X => "x",
            Self::Y => "y",
        }
    }

    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::Array => Arity::at_least(0),
            Self::Coalesce | Self::Concat => Arity::at_least(1),
            Self::If => Arity::exact(3),
            Self::Round => Arity::range(1, 2),
            _ => Arity::exact(1),
        }
    }
}

///
/// AggregateFunction
///
/// Aggregates over the members of the evaluation layer. Also the typed
/// aggregate selector of aggregate field specifications.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    #[display("array_agg")]
    ArrayAgg,
    #[display("collect")]
    Collect,
    #[display("concatenate")]
    Concatenate,
    #[display("concatenate_unique")]
    ConcatenateUnique,
    #[display("count")]
    Count,
    #[display("count_distinct")]
    CountDistinct,
    #[display("count_missing")]
    CountMissing,
    #[display("first_value")]
    FirstValue,
    #[display("last_value")]
    LastValue,
    #[display("max_length")]
    MaxLength,
    #[display("maximum")]
    Maximum,
    #[display("mean")]
    Mean,
    #[display("median")]
    Median,
    #[display("min_length")]
    MinLength,
    #[display("minimum")]
    Minimum,
    #[display("range")]
    Range,
    #[display("stdev")]
    Stdev,
    #[display("sum")]
    Sum,
}

impl AggregateFunction {
    pub const ALL: [Self; 18] = [
        Self::ArrayAgg,
        Self::Collect,
        Self::Concatenate,
        Self::ConcatenateUnique,
        Self::Count,
        Self::CountDistinct,
        Self::CountMissing,
        Self::FirstValue,
        Self::LastValue,
        Self::MaxLength,
        Self::Maximum,
        Self::Mean,
        Self::Median,
        Self::MinLength,
        Self::Minimum,
        Self::Range,
        Self::Stdev,
        Self::Sum,
    ];

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ArrayAgg => "array_agg",
            Self::Collect => "collect",
            Self::Concatenate => "concatenate",
            Self::ConcatenateUnique => "concatenate_unique",
            Self::Count => "count",
            Self::CountDistinct => "count_distinct",
            Self::CountMissing => "count_missing",
            Self::FirstValue => "first_value",
            Self::LastValue => "last_value",
            Self::MaxLength => "max_length",
            Self::Maximum => "maximum",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::MinLength => "min_length",
            Self::Minimum => "minimum",
            Self::Range => "range",
            Self::Stdev => "stdev",
            Self::Sum => "sum",
        }
    }

    /// `(input [, group_by [, filter]])`, plus a delimiter for concatenation.
    #[must_use]
    pub const fn arity(self) -> Arity {
        if self.takes_delimiter() {
            Arity::range(1, 4)
        } else {
            Arity::range(1, 3)
        }
    }

    #[must_use]
    pub const fn takes_delimiter(self) -> bool {
        matches!(self, Self::Concatenate | Self::ConcatenateUnique)
    }
}
