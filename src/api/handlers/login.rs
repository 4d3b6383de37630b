use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

use super::{
    error_response, message_response, rejection_response,
    types::{ErrorResponse, LoginRequest, MessageResponse},
};
use crate::account::CredentialService;

/// Check credentials. No session or token is issued.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials valid", body = MessageResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(service, payload))]
pub async fn login(
    service: Extension<Arc<CredentialService>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return rejection_response(&rejection),
    };

    match service
        .verify_credentials(&request.email, &request.password)
        .await
    {
        Ok(()) => message_response(StatusCode::OK, "Login successful"),
        Err(err) => error_response(&err),
    }
}
