use std::sync::OnceLock;

use db::models::{
    project::{CreateProject, Project},
    task::{CreateTask, Task},
    user::{CreateUser, Department, Role, User},
};
use db_migration::Migrator;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use super::auth::hash_password;

pub(crate) const TEST_PASSWORD: &str = "password123";

/// Hashed once per test binary.
fn test_password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(TEST_PASSWORD).unwrap())
}

pub(crate) async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub(crate) async fn seed_user(
    db: &DatabaseConnection,
    username: &str,
    roles: &[Role],
    department: Department,
) -> User {
    User::create(
        db,
        &CreateUser {
            username: username.to_string(),
            roles: roles.to_vec(),
            department,
        },
        test_password_hash(),
        Uuid::new_v4(),
    )
    .await
    .unwrap()
}

pub(crate) async fn seed_project(db: &DatabaseConnection, owner: &User, name: &str) -> Project {
    Project::create(
        db,
        &CreateProject {
            name: name.to_string(),
            ..Default::default()
        },
        owner.id,
        Uuid::new_v4(),
    )
    .await
    .unwrap()
}

pub(crate) async fn seed_task(
    db: &DatabaseConnection,
    project: &Project,
    owner: &User,
    assignees: &[Uuid],
) -> Task {
    Task::create(
        db,
        &CreateTask::from_title(project.id, "Seeded task"),
        owner.id,
        assignees,
        Uuid::new_v4(),
    )
    .await
    .unwrap()
}
