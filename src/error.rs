use std::{io, path::PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Publishing to exchange '{exchange}' failed: {reason}")]
    Publish { exchange: String, reason: String },

    #[error("{what} mismatch. Expected: \"{expected}\". Actual: \"{actual}\"")]
    AssertionFailure {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("Resource not found: {}", path.display())]
    ResourceNotFound { path: PathBuf },

    #[error("Invalid fixture {}: {reason}", path.display())]
    InvalidFixture { path: PathBuf, reason: String },

    #[error("Unknown HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("Invalid header name '{0}'")]
    InvalidHeaderName(String),

    #[error("Invalid value for header '{0}'")]
    InvalidHeaderValue(String),

    #[error("No step definition matches \"{0}\"")]
    UnknownStep(String),

    #[error("Invalid step pattern: {0}")]
    InvalidStepPattern(#[from] regex::Error),

    #[error("Invalid step argument '{value}': {reason}")]
    InvalidStepArgument { value: String, reason: String },

    #[error("{0}")]
    MissingState(&'static str),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid feature: {0}")]
    FeatureSyntax(String),

    #[error("IoError: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn assertion<W, E, A>(what: W, expected: E, actual: A) -> Self
    where
        W: Into<String>,
        E: ToString,
        A: ToString,
    {
        Error::AssertionFailure {
            what: what.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn is_assertion_failure(&self) -> bool {
        matches!(self, Error::AssertionFailure { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}
