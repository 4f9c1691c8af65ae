use db::{
    ConnectionTrait,
    models::{
        project::{CreateProject, Project, UpdateProject},
        user::User,
    },
};
use uuid::Uuid;

use super::{
    access::{ProjectWithAccess, annotate},
    capability::{CapabilityEvaluator, Operation},
    error::{DomainError, Result},
    validation,
};

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[derive(Clone, Default)]
pub struct ProjectService {
    evaluator: CapabilityEvaluator,
}

impl ProjectService {
    pub fn new(evaluator: CapabilityEvaluator) -> Self {
        Self { evaluator }
    }

    async fn load<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Project> {
        Project::find_by_id(db, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Project not found"))
    }

    pub async fn create<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        payload: CreateProject,
    ) -> Result<Project> {
        let data = CreateProject {
            name: validation::title(&payload.name, "name")?,
            description: validation::description(payload.description.as_deref())?,
            status: payload.status,
            priority: validation::priority(payload.priority)?,
            due_date: validation::future_due_date(payload.due_date)?,
            tags: normalize_tags(payload.tags),
        };

        let project = Project::create(db, &data, actor.id, Uuid::new_v4()).await?;
        tracing::info!(project_id = %project.id, owner_id = %actor.id, "Project created");
        Ok(project)
    }

    /// Every project is listed; visibility only annotates it.
    pub async fn list<C: ConnectionTrait>(
        &self,
        db: &C,
        viewer: &User,
        include_archived: bool,
    ) -> Result<Vec<ProjectWithAccess>> {
        let projects = Project::find_all(db, include_archived).await?;
        let mut annotated = Vec::with_capacity(projects.len());
        for project in projects {
            annotated.push(annotate(db, project, viewer).await?);
        }
        Ok(annotated)
    }

    pub async fn get<C: ConnectionTrait>(
        &self,
        db: &C,
        viewer: &User,
        id: Uuid,
    ) -> Result<ProjectWithAccess> {
        let project = Self::load(db, id).await?;
        Ok(annotate(db, project, viewer).await?)
    }

    pub async fn update<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        id: Uuid,
        payload: UpdateProject,
    ) -> Result<Project> {
        let project = Self::load(db, id).await?;
        self.evaluator.require(
            actor,
            &Operation::UpdateProject {
                owner_id: project.owner_id,
            },
        )?;

        let changes = UpdateProject {
            name: payload
                .name
                .as_deref()
                .map(|name| validation::title(name, "name"))
                .transpose()?,
            description: match payload.description.as_deref() {
                Some(raw) => Some(validation::description(Some(raw))?.unwrap_or_default()),
                None => None,
            },
            status: payload.status,
            priority: validation::priority(payload.priority)?,
            due_date: payload.due_date,
            tags: payload.tags.map(normalize_tags),
        };

        let updated = Project::update(db, project.id, &changes).await?;
        tracing::debug!(project_id = %updated.id, user_id = %actor.id, "Project updated");
        Ok(updated)
    }

    pub async fn set_archived<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        id: Uuid,
        archived: bool,
    ) -> Result<Project> {
        let project = Self::load(db, id).await?;
        self.evaluator.require(
            actor,
            &Operation::ArchiveProject {
                owner_id: project.owner_id,
            },
        )?;
        let updated = Project::set_archived(db, project.id, archived).await?;
        tracing::info!(project_id = %updated.id, archived, "Project archive state changed");
        Ok(updated)
    }

    pub async fn delete<C: ConnectionTrait>(&self, db: &C, actor: &User, id: Uuid) -> Result<()> {
        let project = Self::load(db, id).await?;
        self.evaluator.require(
            actor,
            &Operation::DeleteProject {
                owner_id: project.owner_id,
            },
        )?;
        let rows = Project::delete(db, project.id).await?;
        tracing::info!(project_id = %project.id, rows, "Project deleted");
        Ok(())
    }

    pub async fn members<C: ConnectionTrait>(&self, db: &C, id: Uuid) -> Result<Vec<User>> {
        let project = Self::load(db, id).await?;
        Ok(User::find_by_ids(db, &project.members).await?)
    }
}
