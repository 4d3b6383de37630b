use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

use super::{
    error_response, message_response, rejection_response,
    types::{ErrorResponse, ForgotPasswordRequest, MessageResponse},
};
use crate::account::CredentialService;

/// Issue a reset token; the link goes to the delivery sender, never into the response.
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent", body = MessageResponse),
        (status = 400, description = "Missing email", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn forgot_password(
    service: Extension<Arc<CredentialService>>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(&rejection),
    };

    match service.issue_reset_token(&request.email, Utc::now()).await {
        Ok(_issued) => message_response(StatusCode::OK, "Password reset link sent to your email"),
        Err(err) => error_response(&err),
    }
}
