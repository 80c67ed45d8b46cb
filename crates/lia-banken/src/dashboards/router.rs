use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};

use super::service::DashboardService;
use super::views::Dashboard;
use crate::auth::CurrentUser;
use crate::http::{blocking, error_response, repository_status};
use crate::platform::Platform;

pub fn dashboard_router() -> Router<Platform> {
    Router::new().route("/api/v1/dashboard", get(dashboard))
}

async fn dashboard(
    State(dashboards): State<Arc<DashboardService>>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<Dashboard>, Response> {
    blocking(move || dashboards.dashboard(&principal))
        .await
        .map(Json)
        .map_err(|err| error_response(repository_status(&err), err.to_string()))
}
