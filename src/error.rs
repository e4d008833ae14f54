//! Error types for the document view bridge
//!
//! Every failure that reaches a completion sink is a [`BridgeError`].
//! Its [`code`](BridgeError::code) is the stable string the host sees.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::convert::ConvertError;
use crate::engine::EngineError;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("no view registered for tag {0}")]
    ViewNotFound(i64),

    #[error("view {0} has no loaded document")]
    DocumentNotLoaded(i64),

    #[error("no annotation with identity {identity} on page {page_index}")]
    AnnotationNotFound { page_index: usize, identity: String },

    #[error("{mutation} is not supported by {variant}")]
    UnsupportedMutation {
        mutation: &'static str,
        variant: &'static str,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Save failed: {0}")]
    SaveFailed(String),

    #[error("Import document failed: {0}")]
    ImportDocumentFailed(String),

    #[error("Split document failed: {0}")]
    SplitDocumentFailed(String),

    #[error("Flatten failed: {0}")]
    FlattenFailed(String),

    #[error("Import annotations failed: {0}")]
    ImportAnnotationsFailed(String),

    #[error("Export annotations failed: {0}")]
    ExportAnnotationsFailed(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::ViewNotFound(_) => "VIEW_NOT_FOUND",
            BridgeError::DocumentNotLoaded(_) => "DOCUMENT_NOT_LOADED",
            BridgeError::AnnotationNotFound { .. } => "ANNOTATION_NOT_FOUND",
            BridgeError::UnsupportedMutation { .. } => "UNSUPPORTED_MUTATION",
            BridgeError::InvalidArgument(_) => "INVALID_ARGUMENT",
            BridgeError::SaveFailed(_) => "SAVE_FAIL",
            BridgeError::ImportDocumentFailed(_) => "IMPORT_DOCUMENT_FAIL",
            BridgeError::SplitDocumentFailed(_) => "SPLIT_DOCUMENT_FAIL",
            BridgeError::FlattenFailed(_) => "FLATTEN_FAIL",
            BridgeError::ImportAnnotationsFailed(_) => "IMPORT_ANNOTATIONS_FAIL",
            BridgeError::ExportAnnotationsFailed(_) => "EXPORT_ANNOTATIONS_FAIL",
            BridgeError::Engine(_) => "ENGINE_ERROR",
            BridgeError::Io(_) => "IO_ERROR",
            BridgeError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::ViewNotFound(_) | BridgeError::AnnotationNotFound { .. } => StatusCode::NOT_FOUND,
            BridgeError::DocumentNotLoaded(_) => StatusCode::CONFLICT,
            BridgeError::UnsupportedMutation { .. } | BridgeError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            BridgeError::Engine(EngineError::Password(_)) | BridgeError::Engine(EngineError::Permission(_)) => {
                StatusCode::FORBIDDEN
            }
            BridgeError::Engine(EngineError::PageOutOfRange(..)) => StatusCode::BAD_REQUEST,
            BridgeError::Engine(EngineError::ReadOnly(_)) => StatusCode::CONFLICT,
            BridgeError::SaveFailed(_)
            | BridgeError::ImportDocumentFailed(_)
            | BridgeError::SplitDocumentFailed(_)
            | BridgeError::FlattenFailed(_)
            | BridgeError::ImportAnnotationsFailed(_)
            | BridgeError::ExportAnnotationsFailed(_)
            | BridgeError::Engine(_)
            | BridgeError::Io(_)
            | BridgeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wrap the failure of an operation that reports under its own code
    pub fn wrap(self, wrap: fn(String) -> BridgeError) -> BridgeError {
        match self {
            BridgeError::ViewNotFound(_)
            | BridgeError::DocumentNotLoaded(_)
            | BridgeError::InvalidArgument(_)
            | BridgeError::Internal(_) => self,
            other => wrap(other.to_string()),
        }
    }
}

impl From<ConvertError> for BridgeError {
    fn from(err: ConvertError) -> Self {
        match err {
            ConvertError::NotFound { page_index, identity } => BridgeError::AnnotationNotFound { page_index, identity },
            ConvertError::UnsupportedMutation { mutation, variant } => {
                BridgeError::UnsupportedMutation { mutation, variant }
            }
            ConvertError::Engine(e) => BridgeError::Engine(e),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(code = self.code(), "{}", self);
        }
        let body = Json(ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}
