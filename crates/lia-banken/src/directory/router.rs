use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use super::domain::{
    Company, CompanyForm, EducationProgram, LiaPeriod, LiaPeriodForm, ProgramForm, School,
    SchoolForm,
};
use super::service::{DirectoryError, DirectoryService};
use crate::auth::CurrentUser;
use crate::http::{blocking, error_response, repository_status};
use crate::ids::{CompanyId, LiaPeriodId, ProgramId, SchoolId};
use crate::platform::Platform;

pub fn directory_router() -> Router<Platform> {
    Router::new()
        .route("/api/v1/schools", get(list_schools).put(upsert_school))
        .route("/api/v1/schools/:school_id", get(get_school))
        .route("/api/v1/schools/:school_id/programs", get(list_programs))
        .route("/api/v1/schools/:school_id/lia-periods", get(list_lia_periods))
        .route("/api/v1/companies", get(list_companies).put(upsert_company))
        .route("/api/v1/companies/:company_id", get(get_company))
        .route("/api/v1/programs", post(create_program))
        .route(
            "/api/v1/programs/:program_id",
            put(update_program).delete(delete_program),
        )
        .route("/api/v1/lia-periods", post(create_lia_period))
        .route("/api/v1/lia-periods/:period_id", delete(delete_lia_period))
}

impl IntoResponse for DirectoryError {
    fn into_response(self) -> Response {
        let status = match &self {
            DirectoryError::Validation(_) | DirectoryError::MissingOrganization(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            DirectoryError::NotFound(_) => StatusCode::NOT_FOUND,
            DirectoryError::InUse(_) => StatusCode::CONFLICT,
            DirectoryError::Forbidden => StatusCode::FORBIDDEN,
            DirectoryError::Repository(err) => repository_status(err),
            DirectoryError::Auth(err) => err.status(),
        };
        error_response(status, self.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
struct PeriodQuery {
    #[serde(default)]
    program_id: Option<ProgramId>,
}

async fn list_schools(
    State(directory): State<Arc<DirectoryService>>,
) -> Result<Json<Vec<School>>, DirectoryError> {
    blocking(move || directory.list_schools()).await.map(Json)
}

async fn upsert_school(
    State(directory): State<Arc<DirectoryService>>,
    CurrentUser(principal): CurrentUser,
    Json(form): Json<SchoolForm>,
) -> Result<Json<School>, DirectoryError> {
    blocking(move || directory.upsert_school(&principal, form))
        .await
        .map(Json)
}

async fn get_school(
    State(directory): State<Arc<DirectoryService>>,
    Path(school_id): Path<SchoolId>,
) -> Result<Json<School>, DirectoryError> {
    blocking(move || directory.school(&school_id))
        .await
        .map(Json)
}

async fn list_programs(
    State(directory): State<Arc<DirectoryService>>,
    Path(school_id): Path<SchoolId>,
) -> Result<Json<Vec<EducationProgram>>, DirectoryError> {
    blocking(move || {
        directory.school(&school_id)?;
        directory.list_programs(&school_id)
    })
    .await
    .map(Json)
}

async fn list_lia_periods(
    State(directory): State<Arc<DirectoryService>>,
    Path(school_id): Path<SchoolId>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<Vec<LiaPeriod>>, DirectoryError> {
    blocking(move || {
        directory.school(&school_id)?;
        directory.list_lia_periods(&school_id, query.program_id.as_ref())
    })
    .await
    .map(Json)
}

async fn list_companies(
    State(directory): State<Arc<DirectoryService>>,
) -> Result<Json<Vec<Company>>, DirectoryError> {
    blocking(move || directory.list_companies()).await.map(Json)
}

async fn upsert_company(
    State(directory): State<Arc<DirectoryService>>,
    CurrentUser(principal): CurrentUser,
    Json(form): Json<CompanyForm>,
) -> Result<Json<Company>, DirectoryError> {
    blocking(move || directory.upsert_company(&principal, form))
        .await
        .map(Json)
}

async fn get_company(
    State(directory): State<Arc<DirectoryService>>,
    Path(company_id): Path<CompanyId>,
) -> Result<Json<Company>, DirectoryError> {
    blocking(move || directory.company(&company_id))
        .await
        .map(Json)
}

async fn create_program(
    State(directory): State<Arc<DirectoryService>>,
    CurrentUser(principal): CurrentUser,
    Json(form): Json<ProgramForm>,
) -> Result<(StatusCode, Json<EducationProgram>), DirectoryError> {
    let program = blocking(move || directory.create_program(&principal, form)).await?;
    Ok((StatusCode::CREATED, Json(program)))
}

async fn update_program(
    State(directory): State<Arc<DirectoryService>>,
    CurrentUser(principal): CurrentUser,
    Path(program_id): Path<ProgramId>,
    Json(form): Json<ProgramForm>,
) -> Result<Json<EducationProgram>, DirectoryError> {
    blocking(move || directory.update_program(&principal, &program_id, form))
        .await
        .map(Json)
}

async fn delete_program(
    State(directory): State<Arc<DirectoryService>>,
    CurrentUser(principal): CurrentUser,
    Path(program_id): Path<ProgramId>,
) -> Result<StatusCode, DirectoryError> {
    blocking(move || directory.delete_program(&principal, &program_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_lia_period(
    State(directory): State<Arc<DirectoryService>>,
    CurrentUser(principal): CurrentUser,
    Json(form): Json<LiaPeriodForm>,
) -> Result<(StatusCode, Json<LiaPeriod>), DirectoryError> {
    let period = blocking(move || directory.create_lia_period(&principal, form)).await?;
    Ok((StatusCode::CREATED, Json(period)))
}

async fn delete_lia_period(
    State(directory): State<Arc<DirectoryService>>,
    CurrentUser(principal): CurrentUser,
    Path(period_id): Path<LiaPeriodId>,
) -> Result<StatusCode, DirectoryError> {
    blocking(move || directory.delete_lia_period(&principal, &period_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
