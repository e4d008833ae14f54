//! Engine error types

use thiserror::Error;

/// Errors raised by a document engine.
///
/// The display form starts with the engine's classification in
/// brackets so that it survives being flattened into a host-facing
/// failure message.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("[io] {0}")]
    Io(#[from] std::io::Error),

    #[error("[format] {0}")]
    Format(String),

    #[error("[password] {0}")]
    Password(String),

    #[error("[permission] {0}")]
    Permission(String),

    #[error("[page] page {0} out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    #[error("[read-only] {0}")]
    ReadOnly(String),

    #[error("[unsupported] {0}")]
    Unsupported(String),

    #[error("[mupdf] {0}")]
    MuPdf(String),
}

impl EngineError {
    /// Engine classification string
    pub fn classification(&self) -> &'static str {
        match self {
            EngineError::Io(_) => "io",
            EngineError::Format(_) => "format",
            EngineError::Password(_) => "password",
            EngineError::Permission(_) => "permission",
            EngineError::PageOutOfRange(..) => "page",
            EngineError::ReadOnly(_) => "read-only",
            EngineError::Unsupported(_) => "unsupported",
            EngineError::MuPdf(_) => "mupdf",
        }
    }
}

impl From<mupdf::Error> for EngineError {
    fn from(err: mupdf::Error) -> Self {
        EngineError::MuPdf(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Format(err.to_string())
    }
}

impl From<quick_xml::de::DeError> for EngineError {
    fn from(err: quick_xml::de::DeError) -> Self {
        EngineError::Format(err.to_string())
    }
}

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;
