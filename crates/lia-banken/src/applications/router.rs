use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};

use super::domain::{Application, ApplyRequest, StatusUpdate};
use super::service::{ApplicationError, ApplicationService};
use super::views::ApplicationView;
use crate::auth::CurrentUser;
use crate::http::{blocking, error_response, repository_status};
use crate::ids::ApplicationId;
use crate::platform::Platform;

pub fn application_router() -> Router<Platform> {
    Router::new()
        .route(
            "/api/v1/applications",
            get(list_applications).post(submit_application),
        )
        .route("/api/v1/applications/export.csv", get(export_applications))
        .route("/api/v1/applications/:application_id", get(get_application))
        .route(
            "/api/v1/applications/:application_id/status",
            patch(update_status),
        )
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApplicationError::MissingProfile | ApplicationError::PostingClosed => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApplicationError::NotFound(_) => StatusCode::NOT_FOUND,
            ApplicationError::AlreadyApplied => StatusCode::CONFLICT,
            ApplicationError::Forbidden => StatusCode::FORBIDDEN,
            ApplicationError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApplicationError::Auth(err) => err.status(),
            ApplicationError::Repository(err) => repository_status(err),
        };
        error_response(status, self.to_string())
    }
}

async fn submit_application(
    State(applications): State<Arc<ApplicationService>>,
    CurrentUser(principal): CurrentUser,
    Json(request): Json<ApplyRequest>,
) -> Result<(StatusCode, Json<Application>), ApplicationError> {
    let application = blocking(move || applications.apply(&principal, request)).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

async fn list_applications(
    State(applications): State<Arc<ApplicationService>>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<Vec<ApplicationView>>, ApplicationError> {
    blocking(move || applications.list_for(&principal))
        .await
        .map(Json)
}

async fn get_application(
    State(applications): State<Arc<ApplicationService>>,
    CurrentUser(principal): CurrentUser,
    Path(application_id): Path<ApplicationId>,
) -> Result<Json<ApplicationView>, ApplicationError> {
    blocking(move || applications.application(&principal, &application_id))
        .await
        .map(Json)
}

async fn update_status(
    State(applications): State<Arc<ApplicationService>>,
    CurrentUser(principal): CurrentUser,
    Path(application_id): Path<ApplicationId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Application>, ApplicationError> {
    blocking(move || applications.update_status(&principal, &application_id, update.status))
        .await
        .map(Json)
}

async fn export_applications(
    State(applications): State<Arc<ApplicationService>>,
    CurrentUser(principal): CurrentUser,
) -> Result<Response, ApplicationError> {
    let csv = blocking(move || applications.export_csv(&principal)).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"applications.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}
