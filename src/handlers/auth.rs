use crate::{
    errors::ServiceError,
    services::auth::{LoginResult, SessionInfo},
    ApiResponse, AppState,
};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/session", get(session))
        .route("/logout", post(logout))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutAck {
    pub logged_out: bool,
}

/// Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResult>),
        (status = 400, description = "username or password missing", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ServiceError> {
    let result = state
        .services
        .auth
        .login(
            request.username.as_deref().unwrap_or_default(),
            request.password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// Who the bearer token belongs to
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Token is valid", body = ApiResponse<SessionInfo>),
        (status = 401, description = "Missing, invalid or expired token", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SessionInfo>>, ServiceError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let info = state.services.auth.session(authorization)?;
    Ok(Json(ApiResponse::success(info)))
}

/// Tokens are stateless; clients drop theirs
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Logged out", body = ApiResponse<LogoutAck>)),
    tag = "auth"
)]
pub async fn logout() -> Json<ApiResponse<LogoutAck>> {
    Json(ApiResponse::success_with_message(
        LogoutAck { logged_out: true },
        "logged out",
    ))
}
