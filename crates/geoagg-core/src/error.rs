use std::fmt;
use thiserror::Error as ThisError;

///
/// ExecutionError
///
/// The single failure kind raised by pipeline runs.
/// `message` is the user-facing text; class and origin exist for
/// diagnostics and must not be parsed out of the message.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct ExecutionError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl ExecutionError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct the canonical parser failure for one expression text.
    pub fn parser(expression: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorClass::Parse,
            ErrorOrigin::Expression,
            format!("Parser error in expression \"{expression}\": {reason}"),
        )
    }

    /// Construct the canonical evaluation failure for one expression text.
    pub fn evaluation(expression: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorClass::Evaluation,
            ErrorOrigin::Expression,
            format!("Evaluation error in expression \"{expression}\": {reason}"),
        )
    }

    /// Construct a geometry-engine failure.
    pub fn geometry(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Geometry, ErrorOrigin::Geometry, message)
    }

    /// Construct a configuration rejection.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Config, ErrorOrigin::Config, message)
    }

    /// Construct a feature-source I/O failure.
    pub fn source_io(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Io, ErrorOrigin::Source, message)
    }

    /// Construct a feature-sink I/O failure.
    pub fn sink_io(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Io, ErrorOrigin::Sink, message)
    }

    /// Construct a sink-origin invariant violation (misuse of the sink lifecycle).
    pub fn sink_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Sink, message)
    }

    /// Construct a pipeline-origin invariant violation.
    pub fn pipeline_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Pipeline,
            message,
        )
    }

    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(self.class, ErrorClass::Parse)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Runtime failure taxonomy.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Parse,
    Evaluation,
    Geometry,
    Config,
    Io,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Parse => "parse",
            Self::Evaluation => "evaluation",
            Self::Geometry => "geometry",
            Self::Config => "config",
            Self::Io => "io",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Component that raised the failure.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Expression,
    Geometry,
    Pipeline,
    Config,
    Source,
    Sink,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Expression => "expression",
            Self::Geometry => "geometry",
            Self::Pipeline => "pipeline",
            Self::Config => "config",
            Self::Source => "source",
            Self::Sink => "sink",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_error_names_expression_text() {
        let err = ExecutionError::parser("sum(", "unexpected end of input");

        assert!(err.is_parse_error());
        assert_eq!(
            err.to_string(),
            "Parser error in expression \"sum(\": unexpected end of input"
        );
    }

    #[test]
    fn display_with_class_prefixes_origin_and_class() {
        let err = ExecutionError::evaluation("1 / 0", "division by zero");

        assert_eq!(
            err.display_with_class(),
            "expression:evaluation: Evaluation error in expression \"1 / 0\": division by zero"
        );
    }
}
