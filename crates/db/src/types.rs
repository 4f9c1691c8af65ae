use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TaskStatus {
    #[default]
    #[sea_orm(string_value = "todo")]
    #[serde(rename = "To Do", alias = "todo")]
    #[strum(to_string = "To Do", serialize = "todo")]
    Todo,
    #[sea_orm(string_value = "inprogress")]
    #[serde(rename = "In Progress", alias = "inprogress")]
    #[strum(to_string = "In Progress", serialize = "inprogress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    #[serde(rename = "Completed", alias = "completed")]
    #[strum(to_string = "Completed", serialize = "completed")]
    Completed,
    #[sea_orm(string_value = "blocked")]
    #[serde(rename = "Blocked", alias = "blocked")]
    #[strum(to_string = "Blocked", serialize = "blocked")]
    Blocked,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Staff,
    Manager,
    Admin,
}

/// Closed set of department tags a user can belong to.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Department {
    #[sea_orm(string_value = "engineering")]
    Engineering,
    #[sea_orm(string_value = "design")]
    Design,
    #[sea_orm(string_value = "product")]
    Product,
    #[sea_orm(string_value = "marketing")]
    Marketing,
    #[sea_orm(string_value = "sales")]
    Sales,
    #[sea_orm(string_value = "finance")]
    Finance,
    #[sea_orm(string_value = "hr")]
    Hr,
    #[sea_orm(string_value = "operations")]
    Operations,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "unassigned")]
    Unassigned,
    #[sea_orm(string_value = "owner_assigned")]
    OwnerAssigned,
    #[sea_orm(string_value = "status_changed")]
    StatusChanged,
    #[sea_orm(string_value = "field_changed")]
    FieldChanged,
    #[sea_orm(string_value = "comment")]
    Comment,
}
