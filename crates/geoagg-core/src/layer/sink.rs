use crate::{
    error::ExecutionError,
    feature::{Feature, Fields},
    geometry::{Crs, GeometryType},
};

///
/// OutputSchema
///
/// Everything a sink needs to know before the first append.
///

#[derive(Clone, Debug, PartialEq)]
pub struct OutputSchema {
    pub fields: Fields,
    pub geometry_type: GeometryType,
    pub crs: Crs,
}

///
/// FeatureSink
///
/// Write side of a vector layer. Lifecycle: `open` once, `append` any number
/// of times, `finish` once. A sink that never sees `finish` must not publish
/// its output.
///

pub trait FeatureSink {
    fn open(&mut self, schema: OutputSchema) -> Result<(), ExecutionError>;

    fn append(&mut self, feature: Feature) -> Result<(), ExecutionError>;

    fn finish(&mut self) -> Result<(), ExecutionError>;
}

///
/// SinkState
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SinkState {
    #[default]
    Closed,
    Open,
    Finished,
}

impl SinkState {
    /// Guard one lifecycle transition.
    pub(crate) fn require(self, wanted: Self, action: &str) -> Result<(), ExecutionError> {
        if self == wanted {
            return Ok(());
        }

        Err(ExecutionError::sink_invariant(format!(
            "cannot {action} a sink in state {self:?}"
        )))
    }
}

///
/// MemorySink
///
/// Collects appended features in memory.
///

#[derive(Debug, Default)]
pub struct MemorySink {
    schema: Option<OutputSchema>,
    features: Vec<Feature>,
    state: SinkState,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn schema(&self) -> Option<&OutputSchema> {
        self.schema.as_ref()
    }

    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    #[must_use]
    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    #[must_use]
    pub const fn state(&self) -> SinkState {
        self.state
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == SinkState::Finished
    }
}

impl FeatureSink for MemorySink {
    fn open(&mut self, schema: OutputSchema) -> Result<(), ExecutionError> {
        self.state.require(SinkState::Closed, "open")?;
        self.schema = Some(schema);
        self.state = SinkState::Open;

        Ok(())
    }

    fn append(&mut self, feature: Feature) -> Result<(), ExecutionError> {
        self.state.require(SinkState::Open, "append to")?;
        self.features.push(feature);

        Ok(())
    }

    fn finish(&mut self) -> Result<(), ExecutionError> {
        self.state.require(SinkState::Open, "finish")?;
        self.state = SinkState::Finished;

        Ok(())
    }
}
