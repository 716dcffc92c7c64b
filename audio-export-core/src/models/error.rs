use thiserror::Error;

/// Errors that can occur while configuring or running an export.
///
/// Validation errors (`InvalidSettings`, `BackendUnavailable`,
/// `MalformedBackend`) are raised before an encoder exists. Anything raised
/// after writing has started is fatal to the export session; the caller is
/// expected to discard the partially written output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("construction failed: {0}")]
    ConstructionFailure(String),

    #[error("malformed backend: {0}")]
    MalformedBackend(String),

    #[error("{0} reserved header field(s) were never patched")]
    UnpatchedHeader(usize),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
