use axum::{
    Extension, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::{task::Task, user::User};
use serde::Deserialize;
use services::services::task::{CreateTaskRequest, UpdateTaskRequest};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
};

#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssignOwnerRequest {
    pub owner_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct LogTimeRequest {
    pub minutes: i64,
}

/// Tasks of one project when `project_id` is given, otherwise the caller's own.
pub async fn get_tasks(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiQuery(query): ApiQuery<TaskQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let pool = &deployment.db().pool;
    let tasks = match query.project_id {
        Some(project_id) => {
            deployment
                .tasks()
                .list_by_project(pool, &user, project_id, query.include_archived)
                .await?
        }
        None => deployment.tasks().list_mine(pool, &user).await?,
    };
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn create_task(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiJson(payload): ApiJson<CreateTaskRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .tasks()
        .create(&deployment.db().pool, &user, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn get_task(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .tasks()
        .get(&deployment.db().pool, &user, task_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateTaskRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .tasks()
        .update(&deployment.db().pool, &user, task_id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .tasks()
        .delete(&deployment.db().pool, &user, task_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn assign_task_owner(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<AssignOwnerRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .tasks()
        .assign_owner(&deployment.db().pool, &user, task_id, payload.owner_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn add_task_comment(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CommentRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .tasks()
        .comment(&deployment.db().pool, &user, task_id, &payload.text)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn log_task_time(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<LogTimeRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .tasks()
        .log_time(&deployment.db().pool, &user, task_id, payload.minutes)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn archive_task(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .tasks()
        .set_archived(&deployment.db().pool, &user, task_id, true)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn unarchive_task(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = deployment
        .tasks()
        .set_archived(&deployment.db().pool, &user, task_id, false)
        .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub fn router() -> Router<DeploymentImpl> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .route("/assign", put(assign_task_owner))
        .route("/comments", post(add_task_comment))
        .route("/time", post(log_task_time))
        .route("/archive", post(archive_task))
        .route("/unarchive", post(unarchive_task));

    let tasks_router = Router::new()
        .route("/", get(get_tasks).post(create_task))
        .nest("/{id}", task_id_router);

    Router::new().nest("/tasks", tasks_router)
}
