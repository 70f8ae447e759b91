//! Request-level failures and how they are reported to clients.

use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::RangeNotSatisfiable;

#[derive(Debug, Error)]
pub enum ServeError {
    /// The file is missing, is not a regular file, or its name was rejected.
    #[error("file not found")]
    NotFound,

    #[error(transparent)]
    Unsatisfiable(#[from] RangeNotSatisfiable),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl ServeError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServeError::NotFound => StatusCode::NOT_FOUND,
            ServeError::Unsatisfiable(_) => StatusCode::RANGE_NOT_SATISFIABLE,
            ServeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        match self {
            ServeError::NotFound => (StatusCode::NOT_FOUND, "File not found").into_response(),
            ServeError::Unsatisfiable(e) => e.into_response(),
            ServeError::Io(e) => {
                tracing::error!(error = %e, "i/o error while serving file");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
