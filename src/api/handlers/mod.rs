//! API handlers and the shared mapping from domain errors to HTTP responses.

pub mod forgot_password;
pub mod health;
pub mod login;
pub mod register;
pub mod reset_password;
pub mod root;
pub mod types;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use crate::account::CredentialError;
use types::{ErrorResponse, MessageResponse};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

pub(crate) fn message_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
        .into_response()
}

pub(crate) fn error_body(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Status code for each error kind.
pub(crate) const fn error_status(err: &CredentialError) -> StatusCode {
    match err {
        CredentialError::Validation(_)
        | CredentialError::Conflict
        | CredentialError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
        CredentialError::NotFound => StatusCode::NOT_FOUND,
        CredentialError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        CredentialError::Delivery(_) | CredentialError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Map a domain error to a client response; internal causes are only logged.
pub(crate) fn error_response(err: &CredentialError) -> Response {
    let status = error_status(err);
    if err.is_internal() {
        let cause = std::error::Error::source(err).map(ToString::to_string);
        error!(error = %err, cause = ?cause, "request failed");
        return error_body(status, INTERNAL_ERROR_MESSAGE);
    }

    error_body(status, &err.to_string())
}

/// Missing or malformed JSON bodies are validation failures.
pub(crate) fn rejection_response(rejection: &JsonRejection) -> Response {
    debug!("Rejected payload: {}", rejection.body_text());
    error_body(StatusCode::BAD_REQUEST, "Invalid JSON payload")
}
