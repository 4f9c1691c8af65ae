use db::{
    DbErr,
    models::{project::ProjectError, user::UserError},
};
use thiserror::Error;

/// Errors surfaced by the domain layer. The HTTP boundary is the only place
/// these are translated into status codes.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Database(DbErr),
    #[error("Password hashing failed: {0}")]
    PasswordHash(argon2::password_hash::Error),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Stable machine-readable discriminator carried in error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "authorization_error",
            Self::Conflict(_) => "conflict",
            Self::Database(_) => "database_error",
            Self::PasswordHash(_) => "internal_error",
        }
    }
}

impl From<DbErr> for DomainError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::RecordNotFound(message) => Self::NotFound(message),
            other => Self::Database(other),
        }
    }
}

impl From<argon2::password_hash::Error> for DomainError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::PasswordHash(err)
    }
}

impl From<UserError> for DomainError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Database(db_err) => db_err.into(),
            UserError::UsernameTaken => Self::Conflict("Username already taken".to_string()),
            UserError::NotFound => Self::NotFound("User not found".to_string()),
        }
    }
}

impl From<ProjectError> for DomainError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::Database(db_err) => db_err.into(),
            ProjectError::ProjectNotFound => Self::NotFound("Project not found".to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
