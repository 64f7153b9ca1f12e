use derive_more::Display;
use geoagg_core::error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, ExecutionError};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        let kind = match err.class {
            ErrorClass::Parse => ErrorKind::Expression(ExpressionErrorKind::Parse),
            ErrorClass::Evaluation => ErrorKind::Expression(ExpressionErrorKind::Evaluation),
            ErrorClass::Geometry => ErrorKind::Geometry,
            ErrorClass::Config => ErrorKind::Config,
            ErrorClass::Io => ErrorKind::Io,
            ErrorClass::InvariantViolation => ErrorKind::Internal,
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers and tooling.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Expression(ExpressionErrorKind),
    Geometry,
    Config,
    Io,

    /// The caller cannot remediate this.
    Internal,
}

///
/// ExpressionErrorKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionErrorKind {
    /// Text does not parse, or names an unknown column or function.
    Parse,

    /// Evaluation failed for one feature or group.
    Evaluation,
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorOrigin {
    Expression,
    Geometry,
    Pipeline,
    Config,
    Source,
    Sink,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Expression => Self::Expression,
            CoreErrorOrigin::Geometry => Self::Geometry,
            CoreErrorOrigin::Pipeline => Self::Pipeline,
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::Source => Self::Source,
            CoreErrorOrigin::Sink => Self::Sink,
        }
    }
}

///
/// TESTS
///
