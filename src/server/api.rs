//! The fixed `{success, message?, data?}` response envelope and the error
//! type every handler funnels into.

use crate::favorites::FavoritesError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Json<Envelope<T>> {
        Json(Envelope {
            success: true,
            message: None,
            data: Some(data),
        })
    }

    pub fn with_message<M: Into<String>>(message: M, data: T) -> Json<Envelope<T>> {
        Json(Envelope {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        })
    }
}

/// Builds a `success: false` envelope response without going through
/// [`ApiError`], for handlers with bespoke status codes.
pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(Envelope::<()> {
            success: false,
            message: Some(message.into()),
            data: None,
        }),
    )
        .into_response()
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    // Spanish message is load-bearing: deployed clients match on it.
    #[error("Usuario no autenticado")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self {
            // The wire gets the generic message, the log gets the cause
            error!("Internal error handling request: {:#}", err);
        }
        failure(self.status_code(), self.to_string())
    }
}

impl From<FavoritesError> for ApiError {
    fn from(err: FavoritesError) -> Self {
        match err {
            FavoritesError::SongNotFound { id } => {
                ApiError::NotFound(format!("Song {} not found", id))
            }
            FavoritesError::Storage(err) => ApiError::Internal(err.into()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}
