use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, sea_query::Query,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::types::TaskStatus;
use crate::{
    entities::{subtask, subtask_assignee, task},
    models::{
        comment::{Comment, decode_comments, encode_comments},
        ids,
        project::DEFAULT_PRIORITY,
        report_filter::ReportFilter,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: Uuid,
    pub parent_task_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub assignees: Vec<Uuid>,
    pub status: TaskStatus,
    pub priority: i32,
    pub due_date: Option<NaiveDate>,
    pub time_taken: i64,
    pub is_recurring: bool,
    pub recurrence_interval: Option<i32>,
    pub comments: Vec<Comment>,
    pub archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubtask {
    pub parent_task_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub time_taken: Option<i64>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurrence_interval: Option<i32>,
}

impl CreateSubtask {
    pub fn from_title(parent_task_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            parent_task_id,
            title: title.into(),
            description: None,
            status: None,
            priority: None,
            due_date: None,
            time_taken: None,
            is_recurring: false,
            recurrence_interval: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubtaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i32>,
    pub due_date: Option<Option<NaiveDate>>,
    pub time_taken: Option<i64>,
    pub is_recurring: Option<bool>,
    pub recurrence_interval: Option<Option<i32>>,
}

impl Subtask {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.assignees.contains(&user_id)
    }

    async fn from_model<C: ConnectionTrait>(db: &C, model: subtask::Model) -> Result<Self, DbErr> {
        let parent_task_id = ids::task_uuid_by_id(db, model.parent_task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Parent task not found".to_string()))?;
        let project_id = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        let owner_id = ids::user_uuid_by_id(db, model.owner_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Subtask owner not found".to_string()))?;
        let assignees = Self::assignee_ids_by_row_id(db, model.id).await?;

        Ok(Self {
            id: model.uuid,
            parent_task_id,
            project_id,
            title: model.title,
            description: model.description,
            owner_id,
            assignees,
            status: model.status,
            priority: model.priority,
            due_date: model.due_date,
            time_taken: model.time_taken,
            is_recurring: model.is_recurring,
            recurrence_interval: model.recurrence_interval,
            comments: decode_comments(model.comments)?,
            archived: model.archived,
            archived_at: model.archived_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    async fn from_models<C: ConnectionTrait>(
        db: &C,
        models: Vec<subtask::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut subtasks = Vec::with_capacity(models.len());
        for model in models {
            subtasks.push(Self::from_model(db, model).await?);
        }
        Ok(subtasks)
    }

    async fn assignee_ids_by_row_id<C: ConnectionTrait>(
        db: &C,
        subtask_row_id: i64,
    ) -> Result<Vec<Uuid>, DbErr> {
        let user_row_ids: Vec<i64> = subtask_assignee::Entity::find()
            .select_only()
            .column(subtask_assignee::Column::UserId)
            .filter(subtask_assignee::Column::SubtaskId.eq(subtask_row_id))
            .order_by_asc(subtask_assignee::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        let by_id = ids::user_uuids_by_ids(db, &user_row_ids).await?;
        Ok(user_row_ids
            .iter()
            .filter_map(|id| by_id.get(id).copied())
            .collect())
    }

    async fn replace_assignees<C: ConnectionTrait>(
        db: &C,
        subtask_row_id: i64,
        assignees: &[Uuid],
    ) -> Result<(), DbErr> {
        let wanted = ids::user_ids_by_uuids(db, assignees).await?;
        let wanted_set: HashSet<i64> = wanted.iter().copied().collect();

        let existing: Vec<i64> = subtask_assignee::Entity::find()
            .select_only()
            .column(subtask_assignee::Column::UserId)
            .filter(subtask_assignee::Column::SubtaskId.eq(subtask_row_id))
            .into_tuple()
            .all(db)
            .await?;
        let stale: Vec<i64> = existing
            .iter()
            .copied()
            .filter(|id| !wanted_set.contains(id))
            .collect();
        if !stale.is_empty() {
            subtask_assignee::Entity::delete_many()
                .filter(subtask_assignee::Column::SubtaskId.eq(subtask_row_id))
                .filter(subtask_assignee::Column::UserId.is_in(stale))
                .exec(db)
                .await?;
        }

        let mut present: HashSet<i64> = existing.into_iter().collect();
        for user_row_id in wanted {
            if !present.insert(user_row_id) {
                continue;
            }
            subtask_assignee::ActiveModel {
                subtask_id: Set(subtask_row_id),
                user_id: Set(user_row_id),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
        Ok(())
    }

    async fn find_model<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<subtask::Model, DbErr> {
        subtask::Entity::find()
            .filter(subtask::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Subtask not found".to_string()))
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = subtask::Entity::find()
            .filter(subtask::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_parent_task_id<C: ConnectionTrait>(
        db: &C,
        parent_task_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<Self>, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, parent_task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let mut query =
            subtask::Entity::find().filter(subtask::Column::ParentTaskId.eq(task_row_id));
        if !include_archived {
            query = query.filter(subtask::Column::Archived.eq(false));
        }
        let models = query.order_by_asc(subtask::Column::CreatedAt).all(db).await?;
        Self::from_models(db, models).await
    }

    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<Self>, DbErr> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;

        let mut query =
            subtask::Entity::find().filter(subtask::Column::ProjectId.eq(project_row_id));
        if !include_archived {
            query = query.filter(subtask::Column::Archived.eq(false));
        }
        let models = query.order_by_desc(subtask::Column::CreatedAt).all(db).await?;
        Self::from_models(db, models).await
    }

    /// Subtasks the user owns or is assigned to.
    pub async fn find_by_participant<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(user_row_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(Vec::new());
        };
        let assigned: Vec<i64> = subtask_assignee::Entity::find()
            .select_only()
            .column(subtask_assignee::Column::SubtaskId)
            .filter(subtask_assignee::Column::UserId.eq(user_row_id))
            .into_tuple()
            .all(db)
            .await?;

        let models = subtask::Entity::find()
            .filter(
                Condition::any()
                    .add(subtask::Column::OwnerId.eq(user_row_id))
                    .add(subtask::Column::Id.is_in(assigned)),
            )
            .order_by_desc(subtask::Column::CreatedAt)
            .all(db)
            .await?;
        Self::from_models(db, models).await
    }

    /// Non-blocked subtasks created within `[start, end]` that match `filter`.
    /// `None` when the filter resolves to no rows at all.
    async fn report_query<C: ConnectionTrait>(
        db: &C,
        filter: &ReportFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Select<subtask::Entity>>, DbErr> {
        let scope = match filter {
            ReportFilter::Project(project_id) => {
                let Some(project_row_id) = ids::project_id_by_uuid(db, *project_id).await? else {
                    return Ok(None);
                };
                Condition::all().add(subtask::Column::ProjectId.eq(project_row_id))
            }
            ReportFilter::Participants(user_ids) => {
                let user_row_ids = ids::user_ids_by_uuids(db, user_ids).await?;
                if user_row_ids.is_empty() {
                    return Ok(None);
                }
                let assigned = Query::select()
                    .column(subtask_assignee::Column::SubtaskId)
                    .from(subtask_assignee::Entity)
                    .and_where(subtask_assignee::Column::UserId.is_in(user_row_ids.clone()))
                    .to_owned();
                Condition::any()
                    .add(subtask::Column::OwnerId.is_in(user_row_ids))
                    .add(subtask::Column::Id.in_subquery(assigned))
            }
        };

        Ok(Some(
            subtask::Entity::find()
                .filter(scope)
                .filter(subtask::Column::Status.ne(TaskStatus::Blocked))
                .filter(subtask::Column::CreatedAt.gte(start))
                .filter(subtask::Column::CreatedAt.lte(end)),
        ))
    }

    pub async fn count_for_report<C: ConnectionTrait>(
        db: &C,
        filter: &ReportFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        match Self::report_query(db, filter, start, end).await? {
            Some(query) => query.count(db).await,
            None => Ok(0),
        }
    }

    /// Oldest first, at most `limit` rows.
    pub async fn find_for_report<C: ConnectionTrait>(
        db: &C,
        filter: &ReportFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(query) = Self::report_query(db, filter, start, end).await? else {
            return Ok(Vec::new());
        };
        let models = query
            .order_by_asc(subtask::Column::CreatedAt)
            .limit(limit)
            .all(db)
            .await?;
        Self::from_models(db, models).await
    }

    /// Inserts the subtask under an existing parent task. The project is taken
    /// from the parent; the owner is placed first in the assignee set.
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateSubtask,
        owner_id: Uuid,
        assignees: &[Uuid],
        subtask_id: Uuid,
    ) -> Result<Self, DbErr> {
        let parent = task::Entity::find()
            .filter(task::Column::Uuid.eq(data.parent_task_id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let owner_row_id = ids::user_id_by_uuid(db, owner_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        let now = Utc::now();
        let active = subtask::ActiveModel {
            uuid: Set(subtask_id),
            parent_task_id: Set(parent.id),
            project_id: Set(parent.project_id),
            owner_id: Set(owner_row_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            status: Set(data.status.unwrap_or_default()),
            priority: Set(data.priority.unwrap_or(DEFAULT_PRIORITY)),
            due_date: Set(data.due_date),
            time_taken: Set(data.time_taken.unwrap_or(0)),
            is_recurring: Set(data.is_recurring),
            recurrence_interval: Set(data.recurrence_interval),
            comments: Set(encode_comments(&[])?),
            archived: Set(false),
            archived_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;

        let mut initial = vec![owner_id];
        initial.extend(assignees.iter().copied().filter(|id| *id != owner_id));
        Self::replace_assignees(db, model.id, &initial).await?;

        Self::from_model(db, model).await
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        changes: &SubtaskChanges,
    ) -> Result<Self, DbErr> {
        let record = Self::find_model(db, id).await?;

        let mut active: subtask::ActiveModel = record.into();
        if let Some(title) = changes.title.clone() {
            active.title = Set(title);
        }
        if let Some(description) = changes.description.clone() {
            active.description = Set(description);
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        if let Some(priority) = changes.priority {
            active.priority = Set(priority);
        }
        if let Some(due_date) = changes.due_date {
            active.due_date = Set(due_date);
        }
        if let Some(time_taken) = changes.time_taken {
            active.time_taken = Set(time_taken);
        }
        if let Some(is_recurring) = changes.is_recurring {
            active.is_recurring = Set(is_recurring);
        }
        if let Some(interval) = changes.recurrence_interval {
            active.recurrence_interval = Set(interval);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    pub async fn set_assignees<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        assignees: &[Uuid],
    ) -> Result<Self, DbErr> {
        let record = Self::find_model(db, id).await?;
        Self::replace_assignees(db, record.id, assignees).await?;

        let mut active: subtask::ActiveModel = record.into();
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    pub async fn set_owner<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Self, DbErr> {
        let owner_row_id = ids::user_id_by_uuid(db, owner_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        let record = Self::find_model(db, id).await?;

        let mut active: subtask::ActiveModel = record.into();
        active.owner_id = Set(owner_row_id);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    pub async fn append_comment<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        comment: Comment,
    ) -> Result<Self, DbErr> {
        let record = Self::find_model(db, id).await?;
        let mut comments = decode_comments(record.comments.clone())?;
        comments.push(comment);

        let mut active: subtask::ActiveModel = record.into();
        active.comments = Set(encode_comments(&comments)?);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    pub async fn add_time<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        minutes: i64,
    ) -> Result<Self, DbErr> {
        let record = Self::find_model(db, id).await?;
        let total = record.time_taken.saturating_add(minutes);

        let mut active: subtask::ActiveModel = record.into();
        active.time_taken = Set(total);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    pub async fn set_archived<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        archived: bool,
    ) -> Result<Self, DbErr> {
        let record = Self::find_model(db, id).await?;

        let now = Utc::now();
        let mut active: subtask::ActiveModel = record.into();
        active.archived = Set(archived);
        active.archived_at = Set(archived.then(|| now.into()));
        active.updated_at = Set(now.into());
        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let Some(subtask_row_id) = ids::subtask_id_by_uuid(db, id).await? else {
            return Ok(0);
        };
        subtask_assignee::Entity::delete_many()
            .filter(subtask_assignee::Column::SubtaskId.eq(subtask_row_id))
            .exec(db)
            .await?;
        let result = subtask::Entity::delete_many()
            .filter(subtask::Column::Id.eq(subtask_row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
