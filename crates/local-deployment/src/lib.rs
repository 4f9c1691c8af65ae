use std::sync::Arc;

use db::{DBService, DbErr};
use services::services::{
    auth::SessionStore,
    capability::CapabilityEvaluator,
    config::{Config, ConfigError, load_config_from_file, save_config_to_file},
    notification::NotificationService,
    project::ProjectService,
    realtime::ConnectionRegistry,
    report::ReportService,
    subtask::SubtaskService,
    task::TaskService,
    user::UserService,
};
use thiserror::Error;
use utils::assets::config_path;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Process-wide wiring: configuration, the database handle, live sessions and
/// every domain service built from them.
#[derive(Clone)]
pub struct LocalDeployment {
    config: Config,
    db: DBService,
    registry: ConnectionRegistry,
    sessions: SessionStore,
    users: UserService,
    projects: ProjectService,
    tasks: TaskService,
    subtasks: SubtaskService,
    notifications: NotificationService,
    reports: ReportService,
}

impl LocalDeployment {
    pub async fn new() -> Result<Self, DeploymentError> {
        let config = Self::load_runtime_config().await?;
        let db = DBService::new().await?;
        Ok(Self::from_parts(config, db))
    }

    /// Builds the service graph on an already connected database.
    pub fn from_parts(config: Config, db: DBService) -> Self {
        let registry = ConnectionRegistry::new();
        let evaluator = CapabilityEvaluator::new(config.projects.admin_override);
        let notifications =
            NotificationService::new(Arc::new(registry.clone()), config.notifications.clone());

        Self {
            users: UserService::new(),
            projects: ProjectService::new(evaluator),
            tasks: TaskService::new(evaluator, notifications.clone()),
            subtasks: SubtaskService::new(evaluator, notifications.clone()),
            reports: ReportService::new(evaluator, config.reports.clone()),
            notifications,
            sessions: SessionStore::new(),
            registry,
            db,
            config,
        }
    }

    async fn load_runtime_config() -> Result<Config, DeploymentError> {
        let path = config_path();
        let config = load_config_from_file(&path).await;
        save_config_to_file(&config, &path).await?;
        Ok(config)
    }

    pub fn log_runtime_settings(&self) {
        let config = &self.config;
        tracing::info!(
            admin_override = config.projects.admin_override,
            realtime_enabled = config.notifications.realtime_enabled,
            dedup_window_secs = ?config.notifications.dedup_window_secs,
            report_max_items = config.reports.max_items,
            "Runtime settings"
        );
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn projects(&self) -> &ProjectService {
        &self.projects
    }

    pub fn tasks(&self) -> &TaskService {
        &self.tasks
    }

    pub fn subtasks(&self) -> &SubtaskService {
        &self.subtasks
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    pub fn reports(&self) -> &ReportService {
        &self.reports
    }
}

#[cfg(test)]
mod tests {
    use services::services::config::ProjectConfig;
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn clones_share_sessions_and_config() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        let config = Config {
            projects: ProjectConfig {
                admin_override: true,
            },
            ..Config::default()
        };
        let deployment = LocalDeployment::from_parts(config, db);
        let cloned = deployment.clone();

        let token = deployment.sessions().create(Uuid::new_v4());
        assert!(cloned.sessions().resolve(&token).is_some());
        assert_eq!(cloned.registry().connected_count(), 0);
        assert!(cloned.config().projects.admin_override);
    }
}
