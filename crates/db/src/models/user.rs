use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use crate::types::{Department, Role};
use crate::entities::user;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Username already taken")]
    UsernameTaken,
    #[error("User not found")]
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub roles: Vec<Role>,
    pub department: Department,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user record together with its stored credential hash. Never serialized.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub roles: Vec<Role>,
    pub department: Department,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_manager_or_admin(&self) -> bool {
        self.has_role(Role::Manager) || self.has_role(Role::Admin)
    }

    pub(crate) fn from_model(model: user::Model) -> Result<Self, DbErr> {
        let roles: Vec<Role> = serde_json::from_value(model.roles)
            .map_err(|err| DbErr::Json(format!("invalid roles for user {}: {err}", model.uuid)))?;
        Ok(Self {
            id: model.uuid,
            username: model.username,
            roles,
            department: model.department,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?
            .map(Self::from_model)
            .transpose()
    }

    pub async fn find_by_username<C: ConnectionTrait>(
        db: &C,
        username: &str,
    ) -> Result<Option<Self>, DbErr> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await?
            .map(Self::from_model)
            .transpose()
    }

    pub async fn find_credentials_by_username<C: ConnectionTrait>(
        db: &C,
        username: &str,
    ) -> Result<Option<UserCredentials>, DbErr> {
        let Some(model) = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(db)
            .await?
        else {
            return Ok(None);
        };
        let password_hash = model.password_hash.clone();
        Ok(Some(UserCredentials {
            user: Self::from_model(model)?,
            password_hash,
        }))
    }

    pub async fn find_credentials_by_id<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<UserCredentials>, DbErr> {
        let Some(model) = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?
        else {
            return Ok(None);
        };
        let password_hash = model.password_hash.clone();
        Ok(Some(UserCredentials {
            user: Self::from_model(model)?,
            password_hash,
        }))
    }

    /// Loads the given users. Unknown ids are skipped; callers that need
    /// every id to resolve should compare lengths.
    pub async fn find_by_ids<C: ConnectionTrait>(db: &C, ids: &[Uuid]) -> Result<Vec<Self>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = user::Entity::find()
            .filter(user::Column::Uuid.is_in(ids.to_vec()))
            .order_by_asc(user::Column::Id)
            .all(db)
            .await?;
        models.into_iter().map(Self::from_model).collect()
    }

    pub async fn find_by_department<C: ConnectionTrait>(
        db: &C,
        department: Department,
    ) -> Result<Vec<Self>, DbErr> {
        let models = user::Entity::find()
            .filter(user::Column::Department.eq(department))
            .order_by_asc(user::Column::Username)
            .all(db)
            .await?;
        models.into_iter().map(Self::from_model).collect()
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::Username)
            .all(db)
            .await?;
        models.into_iter().map(Self::from_model).collect()
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateUser,
        password_hash: &str,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        if Self::find_by_username(db, &data.username).await?.is_some() {
            return Err(UserError::UsernameTaken);
        }

        let roles = serde_json::to_value(&data.roles).map_err(|err| DbErr::Json(err.to_string()))?;
        let now = Utc::now();
        let active = user::ActiveModel {
            uuid: Set(user_id),
            username: Set(data.username.clone()),
            password_hash: Set(password_hash.to_string()),
            roles: Set(roles),
            department: Set(data.department),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        // A concurrent registration can still race past the pre-check.
        let model = match active.insert(db).await {
            Ok(model) => model,
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(UserError::UsernameTaken);
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self::from_model(model)?)
    }

    pub async fn update_password_hash<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), UserError> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(UserError::NotFound)?;

        let mut active: user::ActiveModel = record.into();
        active.password_hash = Set(password_hash.to_string());
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?;
        Ok(())
    }
}
