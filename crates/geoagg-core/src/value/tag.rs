use crate::value::Value;

///
/// ValueTag
///
/// Stable canonical value-variant tag used by hashing and ordering surfaces.
///
/// IMPORTANT:
/// Tag values feed the stable group-key hash and must stay fixed.
///
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueTag {
    Null = 1,
    Bool = 2,
    Int = 3,
    Float = 4,
    Text = 5,
    List = 6,
    Geometry = 7,
}

impl ValueTag {
    /// Stable hash byte tag for this variant.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Stable human-readable value kind label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Float => "double",
            Self::Text => "string",
            Self::List => "array",
            Self::Geometry => "geometry",
        }
    }
}

/// Stable canonical variant tag used by hash encodings.
#[must_use]
pub(super) const fn canonical_tag(value: &Value) -> ValueTag {
    match value {
        Value::Null => ValueTag::Null,
        Value::Bool(_) => ValueTag::Bool,
        Value::Int(_) => ValueTag::Int,
        Value::Float(_) => ValueTag::Float,
        Value::Text(_) => ValueTag::Text,
        Value::List(_) => ValueTag::List,
        Value::Geometry(_) => ValueTag::Geometry,
    }
}

///
/// Canonical Value Rank
///
/// Stable rank used for cross-variant ordering. Integers and doubles share a
/// rank so numeric values order by magnitude.
///
#[must_use]
pub(super) const fn canonical_rank(value: &Value) -> u8 {
    match canonical_tag(value) {
        ValueTag::Null => 0,
        ValueTag::Bool => 1,
        ValueTag::Int | ValueTag::Float => 2,
        ValueTag::Text => 3,
        ValueTag::List => 4,
        ValueTag::Geometry => 5,
    }
}
