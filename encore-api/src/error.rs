use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use encore_order::CheckoutError;

#[derive(Debug)]
pub enum AppError {
    ValidationError {
        message: String,
        details: Option<String>,
    },
    BadSignature,
    NotFoundError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    pub fn from_checkout(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart => AppError::ValidationError {
                message: "Cart is empty".to_string(),
                details: None,
            },
            CheckoutError::InvalidQuantity { quantity } => AppError::ValidationError {
                message: "Invalid quantity".to_string(),
                details: Some(format!("item quantity must be at least 1, got {quantity}")),
            },
            CheckoutError::PriceMismatch { calculated } => AppError::ValidationError {
                message: "Price mismatch".to_string(),
                details: Some(format!(
                    "server-computed total is {calculated}, expected 0 for free checkout"
                )),
            },
            CheckoutError::Store(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match self {
            AppError::ValidationError { message, details } => {
                (StatusCode::BAD_REQUEST, message, details)
            }
            AppError::BadSignature => {
                // Security event: log every rejected signature
                tracing::error!("webhook signature verification failed");
                (
                    StatusCode::BAD_REQUEST,
                    "Invalid signature".to_string(),
                    None,
                )
            }
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    None,
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({ "error": error_message });
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
