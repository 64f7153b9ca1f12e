use crate::{
    feature::{Feature, Fields},
    geometry::{GeometryEngine, PlanarEngine},
    value::Value,
};
use std::{collections::BTreeMap, fmt};

///
/// Scope
///
/// Named variables visible to `@name` references.
///

pub type Scope = BTreeMap<String, Value>;

static EMPTY_SCOPE: Scope = BTreeMap::new();
static EMPTY_FIELDS: Fields = Fields::new(Vec::new());

///
/// ExpressionContext
///
/// Borrowed evaluation environment: the schema column names resolve against,
/// the layer aggregates iterate over, the current feature, variables, and the
/// geometry engine behind `collect`.
///

#[derive(Clone, Copy)]
pub struct ExpressionContext<'a> {
    pub fields: &'a Fields,
    pub layer: &'a [Feature],
    pub feature: Option<&'a Feature>,
    pub scope: &'a Scope,
    pub engine: &'a dyn GeometryEngine,
}

impl fmt::Debug for ExpressionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionContext")
            .field("fields", self.fields)
            .field("layer", &self.layer.len())
            .field("feature", &self.feature.map(|feature| feature.id))
            .field("scope", self.scope)
            .finish_non_exhaustive()
    }
}

impl<'a> ExpressionContext<'a> {
    #[must_use]
    pub fn new(fields: &'a Fields) -> Self {
        Self {
            fields,
            layer: &[],
            feature: None,
            scope: &EMPTY_SCOPE,
            engine: &PlanarEngine,
        }
    }

    /// Context with no schema, layer, feature, or variables.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(&EMPTY_FIELDS)
    }

    #[must_use]
    pub const fn with_layer(mut self, layer: &'a [Feature]) -> Self {
        self.layer = layer;
        self
    }

    #[must_use]
    pub const fn with_feature(mut self, feature: &'a Feature) -> Self {
        self.feature = Some(feature);
        self
    }

    #[must_use]
    pub const fn with_scope(mut self, scope: &'a Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Engine used by the `collect` aggregate.
    #[must_use]
    pub const fn with_engine(mut self, engine: &'a dyn GeometryEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Variable value; unknown names read as NULL.
    #[must_use]
    pub fn variable(&self, name: &str) -> Value {
        self.scope.get(name).cloned().unwrap_or(Value::Null)
    }
}
