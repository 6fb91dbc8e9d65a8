use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::warn;

use board_db::DbError;
use board_types::api::ApiResponse;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("database not connected")]
    NotConnected,

    #[error(transparent)]
    Database(DbError),

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        source: DbError,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Map a repository failure, prefixing store errors with `context`.
    pub fn store(context: &'static str) -> impl FnOnce(DbError) -> ApiError {
        move |err| match ApiError::from(err) {
            ApiError::Database(source) => ApiError::Store { context, source },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotConnected
            | ApiError::Database(_)
            | ApiError::Store { .. }
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotConnected => ApiError::NotConnected,
            DbError::NotFound { entity, .. } => ApiError::NotFound(format!("{entity} not found")),
            DbError::InvalidName(name) => {
                ApiError::BadRequest(format!("invalid database name {name:?}"))
            }
            other => ApiError::Database(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = %status, "Request failed: {}", self);

        // Store errors go back verbatim, including SQLite's own text.
        (status, Json(ApiResponse::failure(self.to_string()))).into_response()
    }
}
