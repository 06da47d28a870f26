//! Sistema de manejo de errores
//!
//! Este módulo define los tipos de errores que el núcleo logístico devuelve
//! al llamador y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    code: String,
}

impl AppError {
    /// Código HTTP y código de error estable para cada variante
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            AppError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            AppError::CapacityExceeded(_) => (StatusCode::UNPROCESSABLE_ENTITY, "CAPACITY_EXCEEDED"),
            AppError::ResourceUnavailable(_) => (StatusCode::CONFLICT, "RESOURCE_UNAVAILABLE"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DB_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let (error, message) = match &self {
            AppError::Database(e) => {
                tracing::error!("❌ Database error: {}", e);
                ("Database Error", "An error occurred while accessing the database".to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("❌ Internal error: {}", e);
                ("Internal Server Error", "An unexpected error occurred".to_string())
            }
            AppError::Upstream(msg) => {
                tracing::warn!("⚠️ Upstream error: {}", msg);
                ("Upstream Error", msg.clone())
            }
            AppError::Validation(e) => ("Validation Error", e.to_string()),
            AppError::NotFound(msg) => ("Not Found", msg.clone()),
            AppError::InvalidState(msg) => ("Invalid State", msg.clone()),
            AppError::InvalidArgument(msg) => ("Invalid Argument", msg.clone()),
            AppError::CapacityExceeded(msg) => ("Capacity Exceeded", msg.clone()),
            AppError::ResourceUnavailable(msg) => ("Resource Unavailable", msg.clone()),
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status_and_code().0, StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidState("x".into()).status_and_code().0, StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidArgument("x".into()).status_and_code().0, StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::CapacityExceeded("x".into()).status_and_code().0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::ResourceUnavailable("x".into()).status_and_code().1,
            "RESOURCE_UNAVAILABLE"
        );
        assert_eq!(AppError::Upstream("x".into()).status_and_code().0, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_not_found_helper_message() {
        let err = not_found_error("Leg", 42);
        assert_eq!(err.to_string(), "Not found: Leg with id '42' not found");
    }
}
