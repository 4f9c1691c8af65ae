use axum::{
    Extension, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    project::{CreateProject, Project, UpdateProject},
    user::User,
};
use serde::Deserialize;
use services::services::access::ProjectWithAccess;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_archived: bool,
}

pub async fn get_projects(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectWithAccess>>>, ApiError> {
    let projects = deployment
        .projects()
        .list(&deployment.db().pool, &user, query.include_archived)
        .await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn create_project(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiJson(payload): ApiJson<CreateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let project = deployment
        .projects()
        .create(&deployment.db().pool, &user, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn get_project(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<ProjectWithAccess>>, ApiError> {
    let project = deployment
        .projects()
        .get(&deployment.db().pool, &user, project_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn update_project(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let project = deployment
        .projects()
        .update(&deployment.db().pool, &user, project_id, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn delete_project(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .projects()
        .delete(&deployment.db().pool, &user, project_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

async fn set_archived(
    deployment: &DeploymentImpl,
    user: &User,
    project_id: Uuid,
    archived: bool,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let project = deployment
        .projects()
        .set_archived(&deployment.db().pool, user, project_id, archived)
        .await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn archive_project(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    set_archived(&deployment, &user, project_id, true).await
}

pub async fn unarchive_project(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    set_archived(&deployment, &user, project_id, false).await
}

pub async fn get_project_members(
    State(deployment): State<DeploymentImpl>,
    ApiPath(project_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    let members = deployment
        .projects()
        .members(&deployment.db().pool, project_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

pub fn router() -> Router<DeploymentImpl> {
    let project_id_router = Router::new()
        .route(
            "/",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/archive", post(archive_project))
        .route("/unarchive", post(unarchive_project))
        .route("/members", get(get_project_members));

    let projects_router = Router::new()
        .route("/", get(get_projects).post(create_project))
        .nest("/{id}", project_id_router);

    Router::new().nest("/projects", projects_router)
}
