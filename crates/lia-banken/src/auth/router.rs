use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use super::domain::{AccountView, SignInRequest, SignInResponse, SignUpRequest};
use super::extract::{bearer_token, CurrentUser};
use super::service::{AuthError, AuthService};
use crate::http::{blocking, error_response, repository_status};
use crate::platform::Platform;

pub fn auth_router() -> Router<Platform> {
    Router::new()
        .route("/api/v1/auth/sign-up", post(sign_up_handler))
        .route("/api/v1/auth/sign-in", post(sign_in_handler))
        .route("/api/v1/auth/sign-out", post(sign_out_handler))
        .route("/api/v1/auth/me", get(me_handler))
}

impl AuthError {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidEmail | AuthError::WeakPassword { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AuthError::AdminSignUp | AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::InvalidSession => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Repository(err) => repository_status(err),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.to_string())
    }
}

pub(crate) async fn sign_up_handler(
    State(auth): State<Arc<AuthService>>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<AccountView>), AuthError> {
    let account = blocking(move || auth.sign_up(request)).await?;
    Ok((StatusCode::CREATED, Json(account.view())))
}

pub(crate) async fn sign_in_handler(
    State(auth): State<Arc<AuthService>>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, AuthError> {
    blocking(move || auth.sign_in(request)).await.map(Json)
}

pub(crate) async fn sign_out_handler(
    State(auth): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<StatusCode, AuthError> {
    let token = bearer_token(&headers)
        .ok_or(AuthError::MissingToken)?
        .to_string();
    blocking(move || auth.sign_out(&token)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn me_handler(
    State(auth): State<Arc<AuthService>>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<AccountView>, AuthError> {
    let account = blocking(move || auth.account(&principal.user_id)).await?;
    Ok(Json(account.view()))
}
