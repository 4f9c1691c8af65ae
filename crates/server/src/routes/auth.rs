use axum::{
    Extension, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::user::User;
use serde::{Deserialize, Serialize};
use services::services::user::RegisterUser;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, extract::ApiJson, http::SessionToken};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub async fn register(
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<RegisterUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = deployment
        .users()
        .register(&deployment.db().pool, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn login(
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<LoginResponse>>, ApiError> {
    let user = deployment
        .users()
        .authenticate(&deployment.db().pool, &payload.username, &payload.password)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    let token = deployment.sessions().create(user.id);
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(ResponseJson(ApiResponse::success(LoginResponse { token, user })))
}

pub async fn logout(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> ResponseJson<ApiResponse<()>> {
    deployment.sessions().revoke(&token);
    tracing::info!(user_id = %user.id, "User logged out");
    ResponseJson(ApiResponse::success(()))
}

pub async fn me(Extension(user): Extension<User>) -> ResponseJson<ApiResponse<User>> {
    ResponseJson(ApiResponse::success(user))
}

/// Other sessions of the user are revoked; the calling one stays valid.
pub async fn change_password(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Extension(SessionToken(token)): Extension<SessionToken>,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .users()
        .change_password(
            &deployment.db().pool,
            &user,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;
    deployment.sessions().revoke_user(user.id, Some(&token));
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Routes reachable without a session.
pub fn public_router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/password", put(change_password))
}
