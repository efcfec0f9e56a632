use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use sqlx::Error as SqlxError;
use std::env::VarError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access token required")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Password error: {0}")]
    PasswordError(String),

    #[error("Template error: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error")]
    InternalServerError,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] VarError),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] SqlxError),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl AppError {
    /// Validation failure naming every offending field.
    pub fn missing_fields(fields: &[&str]) -> Self {
        AppError::Validation(format!("Missing or invalid fields: {}", fields.join(", ")))
    }

    /// The message handed back to the client. Internal failures never leak detail.
    pub fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_owned(),
            _ => self.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::MissingToken => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PasswordError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::TemplateError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::EnvVarError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SqlxError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MigrateError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            log::error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.public_message(),
        }))
    }
}

impl From<AppError> for std::io::Error {
    fn from(err: AppError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_hide_detail() {
        let err = AppError::PasswordError("salt exploded".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = AppError::missing_fields(&["level", "reason"]);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Missing or invalid fields: level, reason");

        assert_eq!(AppError::NotFound("Permission slip").public_message(), "Permission slip not found");
        assert_eq!(AppError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Conflict("Permission slip already approved".into()).status_code(),
            StatusCode::CONFLICT
        );
    }
}
