use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::stock::TransferStatus;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("insufficient stock for product {product_id} in shop {shop_id}")]
    InsufficientStock { product_id: Uuid, shop_id: Uuid },

    #[error("cannot transition transfer from {from} to {to}")]
    InvalidStateTransition {
        from: TransferStatus,
        to: TransferStatus,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("user is inactive")]
    UserInactive,

    #[error("invalid token")]
    InvalidToken,

    #[error("authentication required")]
    Unauthorized,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("database error")]
    Persistence(#[from] sqlx::Error),

    #[error("password hashing failed")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("token signing failed")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidTransfer(_) | Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::InsufficientStock { .. }
            | Error::InvalidStateTransition { .. }
            | Error::Conflict(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidCredentials | Error::InvalidToken | Error::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Error::UserInactive | Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Persistence(_) | Error::PasswordHash(_) | Error::TokenSigning(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal failures are opaque to the caller
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("internal error: {self:?}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(
            Error::InvalidTransfer("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::InsufficientStock {
                product_id: Uuid::nil(),
                shop_id: Uuid::nil()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::InvalidStateTransition {
                from: TransferStatus::Completed,
                to: TransferStatus::Pending
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(Error::NotFound("shop").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(Error::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn persistence_errors_are_opaque() {
        let err = Error::Persistence(sqlx::Error::PoolClosed);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
