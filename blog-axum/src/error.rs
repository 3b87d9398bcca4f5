use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blog_core::errors::BlogError;

/// Handler error: any `anyhow::Error`, rendered as the `{status, message}`
/// envelope.
#[derive(Debug)]
pub struct BlogAxumError(pub anyhow::Error);

impl From<anyhow::Error> for BlogAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for BlogAxumError {
    fn into_response(self) -> Response {
        // A BlogError anywhere in the chain keeps its kind and field errors.
        if let Some(blog) = BlogError::from_anyhow(&self.0) {
            let safe = blog.sanitize_for_client();
            let status = StatusCode::from_u16(safe.code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                tracing::error!(error = ?self.0, "request failed");
            }
            return (status, Json(safe.to_json())).into_response();
        }

        tracing::error!(error = ?self.0, "request failed");
        let blog = BlogError::general_error(self.0.to_string());
        let safe = blog.sanitize_for_client();
        (StatusCode::INTERNAL_SERVER_ERROR, Json(safe.to_json())).into_response()
    }
}
