//! Sistema de manejo de errores
//!
//! Este módulo define los errores del motor de despacho y su conversión
//! a respuestas HTTP. La falta de recursos (sin ambulancia, sin personal)
//! no es un error: se expresa en los tipos de resultado del motor.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::dispatch::DispatchStatus;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition {
        from: DispatchStatus,
        to: DispatchStatus,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: String,
}

impl ErrorResponse {
    fn new(error: &str, message: String, details: Option<serde_json::Value>, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message,
            details,
            code: code.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Database(e) => {
                error!("❌ Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Operation Failed",
                        "The operation could not be completed and was rolled back".to_string(),
                        None,
                        "OPERATION_FAILED",
                    ),
                )
            }

            AppError::Validation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new(
                    "Validation Error",
                    "The provided data is invalid".to_string(),
                    Some(json!(e)),
                    "VALIDATION_ERROR",
                ),
            ),

            AppError::InvalidField { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new(
                    "Validation Error",
                    message,
                    Some(json!({ "field": field })),
                    "VALIDATION_ERROR",
                ),
            ),

            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("Not Found", msg, None, "NOT_FOUND"),
            ),

            AppError::Conflict(msg) => {
                warn!("Conflict: {}", msg);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::new("Conflict", msg, None, "CONFLICT"),
                )
            }

            AppError::InvalidTransition { from, to } => (
                StatusCode::CONFLICT,
                ErrorResponse::new(
                    "Invalid Transition",
                    format!("Cannot move a dispatch from '{}' to '{}'", from, to),
                    Some(json!({ "from": from, "to": to })),
                    "INVALID_TRANSITION",
                ),
            ),

            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("Unauthorized", msg, None, "UNAUTHORIZED"),
            ),

            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new("Service Unavailable", msg, None, "SERVICE_UNAVAILABLE"),
            ),

            AppError::OperationFailed(msg) => {
                error!("❌ Operation failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Operation Failed",
                        "The operation could not be completed and was rolled back".to_string(),
                        None,
                        "OPERATION_FAILED",
                    ),
                )
            }

            AppError::ExternalApi(msg) => {
                error!("❌ External API error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::new(
                        "External API Error",
                        "An error occurred while communicating with external service".to_string(),
                        None,
                        "EXTERNAL_API_ERROR",
                    ),
                )
            }

            AppError::Internal(msg) => {
                error!("❌ Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Internal Server Error",
                        "An unexpected error occurred".to_string(),
                        None,
                        "INTERNAL_ERROR",
                    ),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Error de validación sobre un campo concreto
pub fn invalid_field(field: &str, message: impl Into<String>) -> AppError {
    AppError::InvalidField {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores internos
pub fn internal_error(message: &str) -> AppError {
    AppError::Internal(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_maps_to_conflict() {
        let response = AppError::InvalidTransition {
            from: DispatchStatus::Pending,
            to: DispatchStatus::OnScene,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_invalid_field_maps_to_unprocessable() {
        let response = invalid_field("latitude", "out of range").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_not_found_message() {
        let err = not_found_error("Dispatch", 42);
        assert_eq!(err.to_string(), "Not found: Dispatch with id '42' not found");
    }
}
