use crate::value::Value;
use derive_more::{Deref, Display, IntoIterator};
use serde::{Deserialize, Serialize};

///
/// FieldType
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[display("boolean")]
    Boolean,
    #[display("integer")]
    Integer,
    #[display("double")]
    Double,
    #[display("string")]
    String,
}

impl FieldType {
    /// Convert one value into this field type.
    ///
    /// Values that cannot be represented become NULL; doubles are rounded to
    /// `precision` decimals when a precision is set.
    #[must_use]
    pub fn convert(self, value: Value, precision: u32) -> Value {
        if value.is_null() {
            return Value::Null;
        }

        match self {
            Self::Boolean => value.truthiness().map_or(Value::Null, Value::Bool),
            Self::Integer => value.as_i64().map_or(Value::Null, Value::Int),
            Self::Double => value
                .as_f64()
                .map_or(Value::Null, |f| Value::Float(round_to_precision(f, precision))),
            Self::String => match value {
                Value::Text(s) => Value::Text(s),
                other => Value::Text(other.render()),
            },
        }
    }
}

fn round_to_precision(value: f64, precision: u32) -> f64 {
    if precision == 0 || !value.is_finite() {
        return value;
    }
    let Ok(exponent) = i32::try_from(precision.min(15)) else {
        return value;
    };
    let factor = 10f64.powi(exponent);

    (value * factor).round() / factor
}

///
/// FieldDef
///
/// One named, typed attribute slot of a layer schema.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub length: u32,
    #[serde(default)]
    pub precision: u32,
}

impl FieldDef {
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            length: 0,
            precision: 0,
        }
    }

    #[must_use]
    pub const fn with_length(mut self, length: u32, precision: u32) -> Self {
        self.length = length;
        self.precision = precision;
        self
    }

    /// Convert one value into this field's type.
    #[must_use]
    pub fn convert(&self, value: Value) -> Value {
        self.field_type.convert(value, self.precision)
    }
}

///
/// Fields
///
/// Ordered layer schema. Lookups are case-insensitive, first match wins.
///

#[derive(Clone, Debug, Default, Deref, Deserialize, Eq, IntoIterator, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Fields(#[into_iterator(owned, ref)] Vec<FieldDef>);

impl Fields {
    #[must_use]
    pub const fn new(fields: Vec<FieldDef>) -> Self {
        Self(fields)
    }

    /// Index of the field named `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0
            .iter()
            .position(|field| field.name == name)
            .or_else(|| {
                self.0
                    .iter()
                    .position(|field| field.name.eq_ignore_ascii_case(name))
            })
    }

    pub fn push(&mut self, field: FieldDef) {
        self.0.push(field);
    }
}

impl FromIterator<FieldDef> for Fields {
    fn from_iter<I: IntoIterator<Item = FieldDef>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
