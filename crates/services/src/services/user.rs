use db::{
    ConnectionTrait,
    models::user::{CreateUser, Department, Role, User},
};
use serde::Deserialize;
use uuid::Uuid;

use super::{
    assignment::dedup_preserving_order,
    auth::{hash_password, verify_password},
    error::{DomainError, Result},
    validation,
};

pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUser {
    pub username: String,
    pub password: String,
    pub roles: Vec<Role>,
    pub department: Department,
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

#[derive(Clone, Default)]
pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        Self
    }

    pub async fn register<C: ConnectionTrait>(&self, db: &C, payload: RegisterUser) -> Result<User> {
        let username = validation::email(&payload.username)?;
        let roles = dedup_preserving_order(payload.roles);
        if roles.is_empty() {
            return Err(DomainError::validation("at least one role is required"));
        }
        validate_password(&payload.password)?;
        let password_hash = hash_password(&payload.password)?;

        let user = User::create(
            db,
            &CreateUser {
                username,
                roles,
                department: payload.department,
            },
            &password_hash,
            Uuid::new_v4(),
        )
        .await?;
        tracing::info!(user_id = %user.id, department = %user.department, "User registered");
        Ok(user)
    }

    /// `None` when the username is unknown or the password does not match.
    pub async fn authenticate<C: ConnectionTrait>(
        &self,
        db: &C,
        username: &str,
        password: &str,
    ) -> Result<Option<User>> {
        let username = username.trim().to_lowercase();
        let Some(credentials) = User::find_credentials_by_username(db, &username).await? else {
            return Ok(None);
        };
        if !verify_password(password, &credentials.password_hash) {
            tracing::debug!(user_id = %credentials.user.id, "Password mismatch");
            return Ok(None);
        }
        Ok(Some(credentials.user))
    }

    pub async fn change_password<C: ConnectionTrait>(
        &self,
        db: &C,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let credentials = User::find_credentials_by_id(db, user.id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        if !verify_password(current_password, &credentials.password_hash) {
            return Err(DomainError::forbidden("Current password is incorrect"));
        }
        validate_password(new_password)?;

        let password_hash = hash_password(new_password)?;
        User::update_password_hash(db, user.id, &password_hash).await?;
        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    pub async fn get<C: ConnectionTrait>(&self, db: &C, id: Uuid) -> Result<User> {
        User::find_by_id(db, id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))
    }

    /// Resolves every id or fails with NotFound naming the first missing one.
    pub async fn find_all_by_ids<C: ConnectionTrait>(&self, db: &C, ids: &[Uuid]) -> Result<Vec<User>> {
        let users = User::find_by_ids(db, ids).await?;
        if let Some(missing) = ids.iter().find(|id| !users.iter().any(|user| user.id == **id)) {
            return Err(DomainError::not_found(format!("User {missing} not found")));
        }
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{TEST_PASSWORD, seed_user, setup_db};

    fn payload(username: &str) -> RegisterUser {
        RegisterUser {
            username: username.to_string(),
            password: "s3cret-pass".to_string(),
            roles: vec![Role::Staff, Role::Staff],
            department: Department::Engineering,
        }
    }

    #[tokio::test]
    async fn register_normalizes_and_rejects_duplicates() {
        let db = setup_db().await;
        let service = UserService::new();

        let user = service.register(&db, payload(" Ana@Example.com ")).await.unwrap();
        assert_eq!(user.username, "ana@example.com");
        assert_eq!(user.roles, vec![Role::Staff]);

        let err = service.register(&db, payload("ana@example.com")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let db = setup_db().await;
        let service = UserService::new();

        let err = service.register(&db, payload("not-an-email")).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");

        let mut no_roles = payload("b@example.com");
        no_roles.roles.clear();
        assert!(service.register(&db, no_roles).await.is_err());

        let mut short = payload("c@example.com");
        short.password = "short".to_string();
        assert!(service.register(&db, short).await.is_err());
    }

    #[tokio::test]
    async fn authenticate_and_change_password() {
        let db = setup_db().await;
        let service = UserService::new();
        let user = seed_user(&db, "dee@example.com", &[Role::Staff], Department::Hr).await;

        assert!(service.authenticate(&db, "dee@example.com", "wrong").await.unwrap().is_none());
        assert!(service.authenticate(&db, "nobody@example.com", TEST_PASSWORD).await.unwrap().is_none());
        let found = service
            .authenticate(&db, "DEE@example.com", TEST_PASSWORD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);

        let err = service
            .change_password(&db, &user, "wrong", "new-password")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        service
            .change_password(&db, &user, TEST_PASSWORD, "new-password")
            .await
            .unwrap();
        assert!(service.authenticate(&db, "dee@example.com", TEST_PASSWORD).await.unwrap().is_none());
        assert!(service.authenticate(&db, "dee@example.com", "new-password").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn find_all_by_ids_reports_missing_users() {
        let db = setup_db().await;
        let user = seed_user(&db, "eve@example.com", &[Role::Staff], Department::Hr).await;
        let service = UserService::new();

        assert_eq!(service.find_all_by_ids(&db, &[user.id]).await.unwrap().len(), 1);
        let err = service
            .find_all_by_ids(&db, &[user.id, Uuid::new_v4()])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
