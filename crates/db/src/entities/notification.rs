use sea_orm::entity::prelude::*;

use crate::types::NotificationKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub user_id: i64,
    pub message: String,
    pub kind: NotificationKind,
    pub assignor_uuid: Option<Uuid>,
    pub task_uuid: Option<Uuid>,
    pub subtask_uuid: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
