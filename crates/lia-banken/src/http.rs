use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::store::RepositoryError;

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let message = message.into();
    if status.is_server_error() {
        error!(%status, error = %message, "request failed");
    }
    (status, Json(json!({ "error": message }))).into_response()
}

/// Run a service call on the blocking pool; repository writes and uploads may hit disk.
pub(crate) async fn blocking<T, E, F>(call: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: From<RepositoryError> + Send + 'static,
{
    tokio::task::spawn_blocking(call).await.unwrap_or_else(|err| {
        Err(RepositoryError::Unavailable(format!("blocking task failed: {err}")).into())
    })
}

pub(crate) fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
