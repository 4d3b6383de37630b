use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

use super::{
    error_response, message_response, rejection_response,
    types::{ErrorResponse, MessageResponse, ResetPasswordRequest},
};
use crate::account::CredentialService;

/// Redeem a reset token. Unknown, used and expired tokens all get the same 400.
#[utoipa::path(
    post,
    path = "/auth/reset-password/{token}",
    params(
        ("token" = String, Path, description = "Reset token from the reset link")
    ),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid or expired token, or missing password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn reset_password(
    service: Extension<Arc<CredentialService>>,
    Path(token): Path<String>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(&rejection),
    };

    match service
        .redeem_reset_token(&token, &request.new_password, Utc::now())
        .await
    {
        Ok(()) => message_response(StatusCode::OK, "Password successfully reset"),
        Err(err) => error_response(&err),
    }
}
