use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::types::NotificationKind;
use crate::{entities::notification, models::ids};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub assignor_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub subtask_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub assignor_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub subtask_id: Option<Uuid>,
}

impl Notification {
    fn from_model(model: notification::Model, user_id: Uuid) -> Self {
        Self {
            id: model.uuid,
            user_id,
            message: model.message,
            kind: model.kind,
            assignor_id: model.assignor_uuid,
            task_id: model.task_uuid,
            subtask_id: model.subtask_uuid,
            read: model.read,
            created_at: model.created_at.into(),
        }
    }

    async fn user_row_id<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<i64, DbErr> {
        ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateNotification,
        notification_id: Uuid,
    ) -> Result<Self, DbErr> {
        let user_row_id = Self::user_row_id(db, data.user_id).await?;
        let active = notification::ActiveModel {
            uuid: Set(notification_id),
            user_id: Set(user_row_id),
            message: Set(data.message.clone()),
            kind: Set(data.kind),
            assignor_uuid: Set(data.assignor_id),
            task_uuid: Set(data.task_id),
            subtask_uuid: Set(data.subtask_id),
            read: Set(false),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from_model(model, data.user_id))
    }

    /// Newest first.
    pub async fn find_by_user<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(user_row_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(Vec::new());
        };
        let mut query =
            notification::Entity::find().filter(notification::Column::UserId.eq(user_row_id));
        if unread_only {
            query = query.filter(notification::Column::Read.eq(false));
        }
        let models = query
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .all(db)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| Self::from_model(model, user_id))
            .collect())
    }

    /// Looks for a notification with the same recipient, kind, message and
    /// subject created at or after `since`.
    pub async fn find_recent_duplicate<C: ConnectionTrait>(
        db: &C,
        data: &CreateNotification,
        since: DateTime<Utc>,
    ) -> Result<Option<Self>, DbErr> {
        let Some(user_row_id) = ids::user_id_by_uuid(db, data.user_id).await? else {
            return Ok(None);
        };
        let mut query = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_row_id))
            .filter(notification::Column::Kind.eq(data.kind))
            .filter(notification::Column::Message.eq(data.message.clone()))
            .filter(notification::Column::CreatedAt.gte(since));
        query = match data.task_id {
            Some(task_id) => query.filter(notification::Column::TaskUuid.eq(task_id)),
            None => query.filter(notification::Column::TaskUuid.is_null()),
        };
        query = match data.subtask_id {
            Some(subtask_id) => query.filter(notification::Column::SubtaskUuid.eq(subtask_id)),
            None => query.filter(notification::Column::SubtaskUuid.is_null()),
        };
        Ok(query
            .one(db)
            .await?
            .map(|model| Self::from_model(model, data.user_id)))
    }

    /// Marks one of the user's notifications read. Returns `None` when the
    /// notification does not exist or belongs to someone else.
    pub async fn mark_read<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, DbErr> {
        let user_row_id = Self::user_row_id(db, user_id).await?;
        let Some(record) = notification::Entity::find()
            .filter(notification::Column::Uuid.eq(id))
            .filter(notification::Column::UserId.eq(user_row_id))
            .one(db)
            .await?
        else {
            return Ok(None);
        };

        let mut active: notification::ActiveModel = record.into();
        active.read = Set(true);
        let updated = active.update(db).await?;
        Ok(Some(Self::from_model(updated, user_id)))
    }

    pub async fn mark_all_read<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<u64, DbErr> {
        let user_row_id = Self::user_row_id(db, user_id).await?;
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::Read, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_row_id))
            .filter(notification::Column::Read.eq(false))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, user_id: Uuid, id: Uuid) -> Result<u64, DbErr> {
        let user_row_id = Self::user_row_id(db, user_id).await?;
        let result = notification::Entity::delete_many()
            .filter(notification::Column::Uuid.eq(id))
            .filter(notification::Column::UserId.eq(user_row_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
