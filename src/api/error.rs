//! API error taxonomy and its stable JSON rendering.
//!
//! Every failure body has the shape `{name, message, action, status_code}`;
//! `action` is a remediation hint in the service's user-facing language.
//! Lower-level faults (store, hasher) are translated here and never reach
//! the client beyond a generic internal-error body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

use crate::db::UserError;
use crate::password::PasswordError;

#[derive(Debug)]
pub enum ApiError {
    Validation { message: String, action: String },

    NotFound { message: String, action: String },

    MethodNotAllowed,

    ServiceUnavailable { message: String },

    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    name: &'static str,
    message: String,
    action: String,
    status_code: u16,
}

impl ApiError {
    pub fn validation(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            action: action.into(),
        }
    }

    #[must_use]
    pub fn username_taken() -> Self {
        Self::validation(
            "O username informado já está sendo utilizado",
            "Utilize outro username para realizar esta operação.",
        )
    }

    #[must_use]
    pub fn email_taken() -> Self {
        Self::validation(
            "O email informado já está sendo utilizado.",
            "Utilize outro email para realizar esta operação.",
        )
    }

    #[must_use]
    pub fn user_not_found() -> Self {
        Self::NotFound {
            message: "O username informado não foi encontrado no sistema.".to_string(),
            action: "Verifique se o username está digitado corretamente.".to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::NotFound { .. } => "NotFoundError",
            Self::MethodNotAllowed => "MethodNotAllowedError",
            Self::ServiceUnavailable { .. } => "ServiceUnavailableError",
            Self::Internal(_) => "InternalServerError",
        }
    }

    const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { message, .. } | Self::NotFound { message, .. } => {
                write!(f, "{}: {message}", self.name())
            }
            Self::MethodNotAllowed => write!(f, "{}", self.name()),
            Self::ServiceUnavailable { message } => write!(f, "{}: {message}", self.name()),
            Self::Internal(cause) => write!(f, "{}: {cause}", self.name()),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, action) = match &self {
            Self::Validation { message, action } | Self::NotFound { message, action } => {
                (message.clone(), action.clone())
            }
            Self::MethodNotAllowed => (
                "Método não permitido para este endpoint.".to_string(),
                "Verifique se o método HTTP enviado é válido para este endpoint.".to_string(),
            ),
            Self::ServiceUnavailable { message } => (
                message.clone(),
                "Tente novamente mais tarde.".to_string(),
            ),
            Self::Internal(cause) => {
                // Full cause stays in the logs; the client gets the generic body.
                tracing::error!("Internal error: {cause}");
                (
                    "Um erro interno não esperado aconteceu.".to_string(),
                    "Entre em contato com o suporte.".to_string(),
                )
            }
        };

        let body = ErrorBody {
            name: self.name(),
            message,
            action,
            status_code: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::UsernameTaken => Self::username_taken(),
            UserError::EmailTaken => Self::email_taken(),
            UserError::NotFound => Self::user_not_found(),
            UserError::Password(PasswordError::Empty) => Self::validation(
                "A senha informada não pode ser vazia.",
                "Informe uma senha para realizar esta operação.",
            ),
            UserError::Password(PasswordError::TooLong) => Self::validation(
                "A senha informada é longa demais.",
                "Utilize uma senha mais curta para realizar esta operação.",
            ),
            UserError::Password(err) => Self::Internal(err.to_string()),
            UserError::Database(err) => Self::Internal(err.to_string()),
            UserError::Internal(cause) => Self::Internal(cause),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
