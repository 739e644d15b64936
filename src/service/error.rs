// service/error.rs
use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::error::HttpError;

use super::paystack::GatewayError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Payment {0} not found")]
    PaymentNotFound(Uuid),

    #[error("Membership {0} not found")]
    MembershipNotFound(Uuid),

    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ServiceError> for HttpError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::PaymentNotFound(_) | ServiceError::MembershipNotFound(_) => {
                HttpError::new(err.to_string(), StatusCode::NOT_FOUND)
            }
            ServiceError::Gateway(e) => HttpError::bad_gateway(e.to_string()),
            ServiceError::Database(e) => HttpError::server_error(e.to_string()),
        }
    }
}
