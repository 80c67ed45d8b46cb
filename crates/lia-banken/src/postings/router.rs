use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;

use super::domain::{
    CompanyPostingView, JobPosting, PostingFilter, PostingForm, PostingListing, PostingStatus,
};
use super::service::{PostingError, PostingService};
use crate::auth::CurrentUser;
use crate::http::{blocking, error_response, repository_status};
use crate::ids::PostingId;
use crate::platform::Platform;

pub fn posting_router() -> Router<Platform> {
    Router::new()
        .route("/api/v1/postings", get(list_active).post(create_posting))
        .route(
            "/api/v1/postings/:posting_id",
            get(get_posting).put(update_posting).delete(delete_posting),
        )
        .route("/api/v1/postings/:posting_id/status", patch(set_status))
        .route("/api/v1/company/postings", get(company_postings))
}

impl IntoResponse for PostingError {
    fn into_response(self) -> Response {
        let status = match &self {
            PostingError::Validation(_) | PostingError::MissingCompany => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            PostingError::NotFound => StatusCode::NOT_FOUND,
            PostingError::Forbidden => StatusCode::FORBIDDEN,
            PostingError::HasApplications => StatusCode::CONFLICT,
            PostingError::Auth(err) => err.status(),
            PostingError::Repository(err) => repository_status(err),
        };
        error_response(status, self.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: PostingStatus,
}

async fn list_active(
    State(postings): State<Arc<PostingService>>,
    Query(filter): Query<PostingFilter>,
) -> Result<Json<Vec<PostingListing>>, PostingError> {
    blocking(move || postings.list_active(&filter))
        .await
        .map(Json)
}

async fn create_posting(
    State(postings): State<Arc<PostingService>>,
    CurrentUser(principal): CurrentUser,
    Json(form): Json<PostingForm>,
) -> Result<(StatusCode, Json<JobPosting>), PostingError> {
    let posting = blocking(move || postings.create_posting(&principal, form)).await?;
    Ok((StatusCode::CREATED, Json(posting)))
}

async fn get_posting(
    State(postings): State<Arc<PostingService>>,
    viewer: Option<CurrentUser>,
    Path(posting_id): Path<PostingId>,
) -> Result<Json<PostingListing>, PostingError> {
    let principal = viewer.map(|CurrentUser(principal)| principal);
    blocking(move || postings.posting(principal.as_ref(), &posting_id))
        .await
        .map(Json)
}

async fn update_posting(
    State(postings): State<Arc<PostingService>>,
    CurrentUser(principal): CurrentUser,
    Path(posting_id): Path<PostingId>,
    Json(form): Json<PostingForm>,
) -> Result<Json<JobPosting>, PostingError> {
    blocking(move || postings.update_posting(&principal, &posting_id, form))
        .await
        .map(Json)
}

async fn set_status(
    State(postings): State<Arc<PostingService>>,
    CurrentUser(principal): CurrentUser,
    Path(posting_id): Path<PostingId>,
    Json(body): Json<StatusBody>,
) -> Result<Json<JobPosting>, PostingError> {
    blocking(move || postings.set_status(&principal, &posting_id, body.status))
        .await
        .map(Json)
}

async fn delete_posting(
    State(postings): State<Arc<PostingService>>,
    CurrentUser(principal): CurrentUser,
    Path(posting_id): Path<PostingId>,
) -> Result<StatusCode, PostingError> {
    blocking(move || postings.delete_posting(&principal, &posting_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn company_postings(
    State(postings): State<Arc<PostingService>>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<Vec<CompanyPostingView>>, PostingError> {
    blocking(move || postings.list_company_postings(&principal))
        .await
        .map(Json)
}
