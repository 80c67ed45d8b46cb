use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use super::domain::{ProfileForm, StudentProfile};
use super::service::{ProfileError, ProfileService};
use crate::auth::CurrentUser;
use crate::http::{blocking, error_response, repository_status};
use crate::ids::{SchoolId, UserId};
use crate::platform::Platform;
use crate::storage::{StorageError, StoredObject};

pub fn profile_router(max_upload_bytes: u64) -> Router<Platform> {
    let body_limit = usize::try_from(max_upload_bytes).unwrap_or(usize::MAX);
    Router::new()
        .route("/api/v1/profile", get(own_profile).put(upsert_profile))
        .route(
            "/api/v1/profile/cv",
            put(upload_cv).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/v1/students/:user_id", get(get_profile))
        .route("/api/v1/students/:user_id/cv", get(download_cv))
        .route("/api/v1/schools/:school_id/students", get(school_students))
}

impl IntoResponse for ProfileError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProfileError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ProfileError::NotFound | ProfileError::Storage(StorageError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ProfileError::Forbidden => StatusCode::FORBIDDEN,
            ProfileError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProfileError::Storage(StorageError::InvalidPath(_)) => StatusCode::BAD_REQUEST,
            ProfileError::Storage(StorageError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ProfileError::Auth(err) => err.status(),
            ProfileError::Repository(err) => repository_status(err),
        };
        error_response(status, self.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    filename: String,
}

async fn own_profile(
    State(profiles): State<Arc<ProfileService>>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<StudentProfile>, ProfileError> {
    blocking(move || profiles.own_profile(&principal))
        .await
        .map(Json)
}

async fn upsert_profile(
    State(profiles): State<Arc<ProfileService>>,
    CurrentUser(principal): CurrentUser,
    Json(form): Json<ProfileForm>,
) -> Result<Json<StudentProfile>, ProfileError> {
    blocking(move || profiles.upsert_profile(&principal, form))
        .await
        .map(Json)
}

async fn upload_cv(
    State(profiles): State<Arc<ProfileService>>,
    CurrentUser(principal): CurrentUser,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<StoredObject>), ProfileError> {
    let stored =
        blocking(move || profiles.upload_cv(&principal, &query.filename, &body)).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_profile(
    State(profiles): State<Arc<ProfileService>>,
    CurrentUser(principal): CurrentUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<StudentProfile>, ProfileError> {
    blocking(move || profiles.get_profile(&principal, &user_id))
        .await
        .map(Json)
}

async fn download_cv(
    State(profiles): State<Arc<ProfileService>>,
    CurrentUser(principal): CurrentUser,
    Path(user_id): Path<UserId>,
) -> Result<Response, ProfileError> {
    let (object, bytes) = blocking(move || profiles.download_cv(&principal, &user_id)).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, object.content_type)],
        bytes,
    )
        .into_response())
}

async fn school_students(
    State(profiles): State<Arc<ProfileService>>,
    CurrentUser(principal): CurrentUser,
    Path(school_id): Path<SchoolId>,
) -> Result<Json<Vec<StudentProfile>>, ProfileError> {
    blocking(move || profiles.list_students_for_school(&principal, &school_id))
        .await
        .map(Json)
}
