use axum::{
    Extension, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{subtask::Subtask, user::User};
use serde::Deserialize;
use services::services::subtask::{CreateSubtaskRequest, SubtaskUpdate, UpdateSubtaskRequest};
use utils::response::ApiResponse;
use uuid::Uuid;

use super::tasks::{AssignOwnerRequest, CommentRequest, LogTimeRequest};
use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
};

#[derive(Debug, Default, Deserialize)]
pub struct SubtaskQuery {
    pub task_id: Option<Uuid>,
    #[serde(default)]
    pub include_archived: bool,
}

pub async fn get_subtasks(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiQuery(query): ApiQuery<SubtaskQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Subtask>>>, ApiError> {
    let pool = &deployment.db().pool;
    let subtasks = match query.task_id {
        Some(task_id) => {
            deployment
                .subtasks()
                .list_by_task(pool, &user, task_id, query.include_archived)
                .await?
        }
        None => deployment.subtasks().list_mine(pool, &user).await?,
    };
    Ok(ResponseJson(ApiResponse::success(subtasks)))
}

pub async fn create_subtask(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiJson(payload): ApiJson<CreateSubtaskRequest>,
) -> Result<ResponseJson<ApiResponse<Subtask>>, ApiError> {
    let subtask = deployment
        .subtasks()
        .create(&deployment.db().pool, &user, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(subtask)))
}

pub async fn get_subtask(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(subtask_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Subtask>>, ApiError> {
    let subtask = deployment
        .subtasks()
        .get(&deployment.db().pool, &user, subtask_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(subtask)))
}

/// Completing a recurring subtask returns the spawned occurrence alongside it.
pub async fn update_subtask(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(subtask_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateSubtaskRequest>,
) -> Result<ResponseJson<ApiResponse<SubtaskUpdate>>, ApiError> {
    let update = deployment
        .subtasks()
        .update(&deployment.db().pool, &user, subtask_id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(update)))
}

pub async fn delete_subtask(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(subtask_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .subtasks()
        .delete(&deployment.db().pool, &user, subtask_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn assign_subtask_owner(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(subtask_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<AssignOwnerRequest>,
) -> Result<ResponseJson<ApiResponse<Subtask>>, ApiError> {
    let subtask = deployment
        .subtasks()
        .assign_owner(&deployment.db().pool, &user, subtask_id, payload.owner_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(subtask)))
}

pub async fn add_subtask_comment(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(subtask_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CommentRequest>,
) -> Result<ResponseJson<ApiResponse<Subtask>>, ApiError> {
    let subtask = deployment
        .subtasks()
        .comment(&deployment.db().pool, &user, subtask_id, &payload.text)
        .await?;
    Ok(ResponseJson(ApiResponse::success(subtask)))
}

pub async fn log_subtask_time(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(subtask_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<LogTimeRequest>,
) -> Result<ResponseJson<ApiResponse<Subtask>>, ApiError> {
    let subtask = deployment
        .subtasks()
        .log_time(&deployment.db().pool, &user, subtask_id, payload.minutes)
        .await?;
    Ok(ResponseJson(ApiResponse::success(subtask)))
}

pub async fn archive_subtask(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(subtask_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Subtask>>, ApiError> {
    let subtask = deployment
        .subtasks()
        .set_archived(&deployment.db().pool, &user, subtask_id, true)
        .await?;
    Ok(ResponseJson(ApiResponse::success(subtask)))
}

pub async fn unarchive_subtask(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(subtask_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Subtask>>, ApiError> {
    let subtask = deployment
        .subtasks()
        .set_archived(&deployment.db().pool, &user, subtask_id, false)
        .await?;
    Ok(ResponseJson(ApiResponse::success(subtask)))
}

pub fn router() -> Router<DeploymentImpl> {
    let subtask_id_router = Router::new()
        .route(
            "/",
            get(get_subtask).put(update_subtask).delete(delete_subtask),
        )
        .route("/assign", put(assign_subtask_owner))
        .route("/comments", post(add_subtask_comment))
        .route("/time", post(log_subtask_time))
        .route("/archive", post(archive_subtask))
        .route("/unarchive", post(unarchive_subtask));

    let subtasks_router = Router::new()
        .route("/", get(get_subtasks).post(create_subtask))
        .nest("/{id}", subtask_id_router);

    Router::new().nest("/subtasks", subtasks_router)
}
