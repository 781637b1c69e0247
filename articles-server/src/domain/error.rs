use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;
use tracing::error;

use crate::presentation::dto::Envelope;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} not found with id: {id}")]
    NotFound { entity: &'static str, id: i64 },
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    SchemaInvalid(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn article_not_found(id: i64) -> Self {
        DomainError::NotFound {
            entity: "Article",
            id,
        }
    }

    pub fn user_not_found(id: i64) -> Self {
        DomainError::NotFound { entity: "User", id }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Internal(format!("database error: {}", err))
    }
}

impl ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        match self {
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::InvalidInput(_) | DomainError::SchemaInvalid(_) => StatusCode::BAD_REQUEST,
            DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            DomainError::Internal(detail) => {
                error!(detail = %detail, "request failed with internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(Envelope::<()>::error(message))
    }
}
