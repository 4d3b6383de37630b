use axum::response::IntoResponse;

// axum handler for root
pub async fn root() -> impl IntoResponse {
    "Server is running"
}
