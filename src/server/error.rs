use crate::error::{AnalysisError, CollectionError, StoreError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Collection(#[from] CollectionError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("No analysis results found. Run /analyze first.")]
    NotFound,
    #[error("internal: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    status: &'static str,
    message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Collection(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Analysis(AnalysisError::EmptySnapshot) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Analysis(AnalysisError::Config(_)) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {self}");
        }
        let payload = ErrorPayload {
            status: "error",
            message: self.to_string(),
        };
        (status, Json(payload)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn maps_failures_to_status_codes() {
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(AnalysisError::EmptySnapshot).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(AnalysisError::Config("no key".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::BadRequest("unknown analysis mode".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CollectionError::RootMissing(PathBuf::from("/nope"))).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
