//! Module: config
//! Responsibility: typed run configuration for the aggregate and
//! refactor-fields pipelines, loaded from JSON and validated before use.
//! Does not own: expression parsing (expressions are checked by the
//! pipelines when they prepare).

use crate::{
    error::ExecutionError,
    expr::{AggregateFunction, DEFAULT_DELIMITER},
    feature::{FieldDef, FieldType},
    geometry::{AreaUnit, DistanceUnit},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{collections::BTreeSet, fs, path::Path};

/// Ellipsoid used when a project does not name one.
pub const DEFAULT_ELLIPSOID: &str = "WGS84";

/// Group-by expression used when none is configured (one group).
pub const DEFAULT_GROUP_BY: &str = "NULL";

///
/// ProjectSettings
///
/// Measurement settings that expressions are bound to.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSettings {
    pub ellipsoid: String,
    pub distance_units: DistanceUnit,
    pub area_units: AreaUnit,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            ellipsoid: DEFAULT_ELLIPSOID.to_string(),
            distance_units: DistanceUnit::default(),
            area_units: AreaUnit::default(),
        }
    }
}

///
/// AggregateFieldSpec
///
/// One output field of the aggregate pipeline.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateFieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub length: u32,
    #[serde(default)]
    pub precision: u32,
    pub aggregate: AggregateFunction,
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

impl AggregateFieldSpec {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        aggregate: AggregateFunction,
        input: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            length: 0,
            precision: 0,
            aggregate,
            input: input.into(),
            delimiter: None,
        }
    }

    #[must_use]
    pub const fn with_length(mut self, length: u32, precision: u32) -> Self {
        self.length = length;
        self.precision = precision;
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Delimiter for concatenation; `,` unless configured.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        self.delimiter.as_deref().unwrap_or(DEFAULT_DELIMITER)
    }

    /// Output field definition.
    #[must_use]
    pub fn field_def(&self) -> FieldDef {
        FieldDef::new(self.name.clone(), self.field_type).with_length(self.length, self.precision)
    }
}

///
/// FieldMapping
///
/// One output field of the refactor-fields pipeline.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMapping {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub length: u32,
    #[serde(default)]
    pub precision: u32,
    pub expression: String,
}

impl FieldMapping {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            length: 0,
            precision: 0,
            expression: expression.into(),
        }
    }

    #[must_use]
    pub fn field_def(&self) -> FieldDef {
        FieldDef::new(self.name.clone(), self.field_type).with_length(self.length, self.precision)
    }
}

///
/// AggregateConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateConfig {
    pub input: String,
    #[serde(default = "default_group_by")]
    pub group_by: String,
    pub aggregates: Vec<AggregateFieldSpec>,
    pub output: String,
    #[serde(default)]
    pub project: ProjectSettings,
}

impl AggregateConfig {
    /// Load and validate one JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExecutionError> {
        load_json(path.as_ref())
    }

    /// Parse and validate JSON configuration text.
    pub fn from_json(text: &str) -> Result<Self, ExecutionError> {
        let config: Self = parse_json(text)?;
        config.validate()?;

        Ok(config)
    }

    /// Reject configurations no run could honour.
    pub fn validate(&self) -> Result<(), ExecutionError> {
        if self.group_by.trim().is_empty() {
            return Err(ExecutionError::config("group_by expression is empty"));
        }
        validate_field_names(self.aggregates.iter().map(|spec| spec.name.as_str()))?;
        for spec in &self.aggregates {
            validate_expression(&spec.name, &spec.input)?;
        }

        Ok(())
    }
}

impl Validated for AggregateConfig {
    fn validate(&self) -> Result<(), ExecutionError> {
        Self::validate(self)
    }
}

///
/// RefactorConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RefactorConfig {
    pub input: String,
    pub mapping: Vec<FieldMapping>,
    pub output: String,
    #[serde(default)]
    pub project: ProjectSettings,
}

impl RefactorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExecutionError> {
        load_json(path.as_ref())
    }

    pub fn from_json(text: &str) -> Result<Self, ExecutionError> {
        let config: Self = parse_json(text)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExecutionError> {
        validate_field_names(self.mapping.iter().map(|mapping| mapping.name.as_str()))?;
        for mapping in &self.mapping {
            validate_expression(&mapping.name, &mapping.expression)?;
        }

        Ok(())
    }
}

impl Validated for RefactorConfig {
    fn validate(&self) -> Result<(), ExecutionError> {
        Self::validate(self)
    }
}

trait Validated: DeserializeOwned {
    fn validate(&self) -> Result<(), ExecutionError>;
}

fn default_group_by() -> String {
    DEFAULT_GROUP_BY.to_string()
}

fn load_json<T: Validated>(path: &Path) -> Result<T, ExecutionError> {
    let text = fs::read_to_string(path).map_err(|err| {
        ExecutionError::config(format!("cannot read config '{}': {err}", path.display()))
    })?;
    let config: T = parse_json(&text)?;
    config.validate()?;

    Ok(config)
}

fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, ExecutionError> {
    serde_json::from_str(text)
        .map_err(|err| ExecutionError::config(format!("invalid config: {err}")))
}

// Output field names must be non-empty and unique (case-insensitive, as
// field lookups are).
fn validate_field_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<(), ExecutionError> {
    let mut seen = BTreeSet::new();
    let mut any = false;
    for name in names {
        any = true;
        if name.trim().is_empty() {
            return Err(ExecutionError::config("field name is empty"));
        }
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(ExecutionError::config(format!(
                "field name '{name}' is duplicated"
            )));
        }
    }
    if !any {
        return Err(ExecutionError::config("no output fields configured"));
    }

    Ok(())
}

fn validate_expression(field: &str, expression: &str) -> Result<(), ExecutionError> {
    if expression.trim().is_empty() {
        return Err(ExecutionError::config(format!(
            "field '{field}' has an empty expression"
        )));
    }

    Ok(())
}

///
/// TESTS
///
