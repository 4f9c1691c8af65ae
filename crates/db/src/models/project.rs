use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use crate::types::TaskStatus;
use crate::{
    entities::{project, project_member, subtask, subtask_assignee, task, task_assignee},
    models::ids,
};

pub const DEFAULT_PRIORITY: i32 = 5;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    ProjectNotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub members: Vec<Uuid>,
    pub status: TaskStatus,
    pub priority: i32,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i32>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub tags: Option<Vec<String>>,
}

impl Project {
    async fn from_model<C: ConnectionTrait>(db: &C, model: project::Model) -> Result<Self, DbErr> {
        let owner_id = ids::user_uuid_by_id(db, model.owner_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project owner not found".to_string()))?;
        let members = Self::member_ids_by_row_id(db, model.id).await?;
        let tags: Vec<String> = if model.tags.is_null() {
            Vec::new()
        } else {
            serde_json::from_value(model.tags).map_err(|err| DbErr::Json(err.to_string()))?
        };

        Ok(Self {
            id: model.uuid,
            name: model.name,
            description: model.description,
            owner_id,
            members,
            status: model.status,
            priority: model.priority,
            due_date: model.due_date,
            tags,
            archived: model.archived,
            archived_at: model.archived_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    async fn member_ids_by_row_id<C: ConnectionTrait>(
        db: &C,
        project_row_id: i64,
    ) -> Result<Vec<Uuid>, DbErr> {
        let user_row_ids: Vec<i64> = project_member::Entity::find()
            .select_only()
            .column(project_member::Column::UserId)
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .order_by_asc(project_member::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        let by_id = ids::user_uuids_by_ids(db, &user_row_ids).await?;
        Ok(user_row_ids
            .iter()
            .filter_map(|id| by_id.get(id).copied())
            .collect())
    }

    pub async fn find_all<C: ConnectionTrait>(
        db: &C,
        include_archived: bool,
    ) -> Result<Vec<Self>, DbErr> {
        let mut query = project::Entity::find();
        if !include_archived {
            query = query.filter(project::Column::Archived.eq(false));
        }
        let records = query
            .order_by_desc(project::Column::CreatedAt)
            .all(db)
            .await?;

        let mut projects = Vec::with_capacity(records.len());
        for model in records {
            projects.push(Self::from_model(db, model).await?);
        }
        Ok(projects)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Inserts the project and registers the owner as its first member.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateProject,
        owner_id: Uuid,
        project_id: Uuid,
    ) -> Result<Self, DbErr> {
        let owner_row_id = ids::user_id_by_uuid(db, owner_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        let tags = serde_json::to_value(&data.tags).map_err(|err| DbErr::Json(err.to_string()))?;

        let now = Utc::now();
        let active = project::ActiveModel {
            uuid: Set(project_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            owner_id: Set(owner_row_id),
            status: Set(data.status.unwrap_or_default()),
            priority: Set(data.priority.unwrap_or(DEFAULT_PRIORITY)),
            due_date: Set(data.due_date),
            tags: Set(tags),
            archived: Set(false),
            archived_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        project_member::ActiveModel {
            project_id: Set(model.id),
            user_id: Set(owner_row_id),
            created_at: Set(now.into()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Self::from_model(db, model).await
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateProject,
    ) -> Result<Self, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let mut active: project::ActiveModel = record.into();
        if let Some(name) = payload.name.clone() {
            active.name = Set(name);
        }
        if let Some(description) = payload.description.clone() {
            active.description = Set(Some(description).filter(|d| !d.trim().is_empty()));
        }
        if let Some(status) = payload.status {
            active.status = Set(status);
        }
        if let Some(priority) = payload.priority {
            active.priority = Set(priority);
        }
        if payload.due_date.is_some() {
            active.due_date = Set(payload.due_date);
        }
        if let Some(tags) = &payload.tags {
            active.tags =
                Set(serde_json::to_value(tags).map_err(|err| DbErr::Json(err.to_string()))?);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    pub async fn set_archived<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        archived: bool,
    ) -> Result<Self, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let now = Utc::now();
        let mut active: project::ActiveModel = record.into();
        active.archived = Set(archived);
        active.archived_at = Set(archived.then(|| now.into()));
        active.updated_at = Set(now.into());
        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    /// Appends users to the member set. Existing members are left untouched.
    pub async fn add_members<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), DbErr> {
        if user_ids.is_empty() {
            return Ok(());
        }
        let project_row_id = ids::project_id_by_uuid(db, id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        let existing: HashSet<i64> = project_member::Entity::find()
            .select_only()
            .column(project_member::Column::UserId)
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .into_tuple::<i64>()
            .all(db)
            .await?
            .into_iter()
            .collect();

        let now = Utc::now();
        let mut seen = existing;
        for user_row_id in ids::user_ids_by_uuids(db, user_ids).await? {
            if !seen.insert(user_row_id) {
                continue;
            }
            project_member::ActiveModel {
                project_id: Set(project_row_id),
                user_id: Set(user_row_id),
                created_at: Set(now.into()),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
        Ok(())
    }

    /// Deletes the project with its tasks, subtasks and assignment rows.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let Some(project_row_id) = ids::project_id_by_uuid(db, id).await? else {
            return Ok(0);
        };

        let subtask_ids: Vec<i64> = subtask::Entity::find()
            .select_only()
            .column(subtask::Column::Id)
            .filter(subtask::Column::ProjectId.eq(project_row_id))
            .into_tuple()
            .all(db)
            .await?;
        if !subtask_ids.is_empty() {
            subtask_assignee::Entity::delete_many()
                .filter(subtask_assignee::Column::SubtaskId.is_in(subtask_ids))
                .exec(db)
                .await?;
        }
        subtask::Entity::delete_many()
            .filter(subtask::Column::ProjectId.eq(project_row_id))
            .exec(db)
            .await?;

        let task_ids: Vec<i64> = task::Entity::find()
            .select_only()
            .column(task::Column::Id)
            .filter(task::Column::ProjectId.eq(project_row_id))
            .into_tuple()
            .all(db)
            .await?;
        if !task_ids.is_empty() {
            task_assignee::Entity::delete_many()
                .filter(task_assignee::Column::TaskId.is_in(task_ids))
                .exec(db)
                .await?;
        }
        task::Entity::delete_many()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .exec(db)
            .await?;

        project_member::Entity::delete_many()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .exec(db)
            .await?;

        let result = project::Entity::delete_many()
            .filter(project::Column::Id.eq(project_row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
