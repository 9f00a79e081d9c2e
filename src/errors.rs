use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::AlertStatus;

/// Failures of the alert lifecycle. Nothing here is retried inside the crate.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cannot move alert from {from} to {to}")]
    InvalidTransition { from: AlertStatus, to: AlertStatus },

    #[error("alert {id} changed concurrently (expected {expected}, found {actual})")]
    Conflict {
        id: Uuid,
        expected: AlertStatus,
        actual: AlertStatus,
    },

    #[error("alert {0} not found")]
    NotFound(Uuid),

    #[error("trigger {0} not found")]
    TriggerNotFound(Uuid),

    #[error("storage failure: {0}")]
    Persistence(String),
}

impl AlertError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AlertError::Validation(msg.into())
    }

    /// Re-label a store miss on a trigger write.
    pub fn for_trigger(self) -> Self {
        match self {
            AlertError::NotFound(id) => AlertError::TriggerNotFound(id),
            e => e,
        }
    }
}

impl From<StoreError> for AlertError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AlertError::NotFound(id),
            StoreError::Conflict {
                id,
                expected,
                actual,
            } => AlertError::Conflict {
                id,
                expected,
                actual,
            },
            StoreError::Backend(e) => AlertError::Persistence(format!("{e:#}")),
        }
    }
}

/// Screener criteria that cannot be evaluated.
#[derive(Debug, thiserror::Error)]
pub enum ScreenerError {
    #[error("invalid screener criteria: {0}")]
    Validation(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "Storage unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

impl From<AlertError> for AppError {
    fn from(e: AlertError) -> Self {
        let message = e.to_string();
        match e {
            AlertError::Validation(_) => AppError::BadRequest(message),
            AlertError::NotFound(_) | AlertError::TriggerNotFound(_) => {
                AppError::NotFound(message)
            }
            AlertError::InvalidTransition { .. } | AlertError::Conflict { .. } => {
                AppError::Conflict(message)
            }
            AlertError::Persistence(_) => AppError::Unavailable(message),
        }
    }
}

impl From<ScreenerError> for AppError {
    fn from(e: ScreenerError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
