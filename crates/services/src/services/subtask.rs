use chrono::NaiveDate;
use db::{
    ConnectionTrait,
    models::{
        comment::Comment,
        project::Project,
        subtask::{CreateSubtask, Subtask, SubtaskChanges, TaskStatus},
        task::Task,
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{
    assignment::{AssignmentDiff, diff_assignees},
    capability::{CapabilityEvaluator, Operation},
    error::{DomainError, Result},
    notification::{NotificationService, Subject},
    recurrence::{derive_next_occurrence, validate_recurrence},
    task::{assignee_departments, changed_fields, ensure_can_view, resolve_assignees},
    validation,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubtaskRequest {
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
    #[serde(default)]
    pub assignees: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubtaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i32>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub due_date: Option<Option<NaiveDate>>,
    pub time_taken: Option<i64>,
    pub is_recurring: Option<bool>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub recurrence_interval: Option<Option<i32>>,
    #[serde(default)]
    pub assignees: Option<Value>,
}

/// The updated subtask plus the occurrence created when a recurring subtask
/// was completed by this update.
#[derive(Debug, Clone, Serialize)]
pub struct SubtaskUpdate {
    pub subtask: Subtask,
    pub next_occurrence: Option<Subtask>,
}

#[derive(Clone)]
pub struct SubtaskService {
    evaluator: CapabilityEvaluator,
    notifications: NotificationService,
}

impl SubtaskService {
    pub fn new(evaluator: CapabilityEvaluator, notifications: NotificationService) -> Self {
        Self {
            evaluator,
            notifications,
        }
    }

    async fn load<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Subtask> {
        Subtask::find_by_id(db, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Subtask not found"))
    }

    fn require_edit(&self, actor: &User, subtask: &Subtask) -> Result<()> {
        self.evaluator.require(
            actor,
            &Operation::EditWorkItem {
                is_participant: subtask.is_participant(actor.id),
            },
        )
    }

    pub async fn create<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        payload: CreateSubtaskRequest,
    ) -> Result<Subtask> {
        let data = CreateSubtask {
            parent_task_id: payload.parent_task_id,
            title: validation::title(&payload.title, "title")?,
            description: validation::description(payload.description.as_deref())?,
            status: payload.status,
            priority: validation::priority(payload.priority)?,
            due_date: validation::future_due_date(payload.due_date)?,
            time_taken: validation::time_taken(payload.time_taken)?,
            is_recurring: payload.is_recurring,
            recurrence_interval: payload.recurrence_interval,
        };
        validate_recurrence(data.is_recurring, data.recurrence_interval, data.due_date)?;

        let parent = Task::find_by_id(db, data.parent_task_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Parent task not found"))?;
        let assignees = match &payload.assignees {
            Some(raw) => resolve_assignees(db, raw).await?,
            None => Vec::new(),
        };

        let subtask = Subtask::create(db, &data, actor.id, &assignees, Uuid::new_v4()).await?;
        Project::add_members(db, parent.project_id, &subtask.assignees).await?;
        tracing::info!(
            subtask_id = %subtask.id,
            parent_task_id = %parent.id,
            user_id = %actor.id,
            is_recurring = subtask.is_recurring,
            "Subtask created"
        );

        self.notifications
            .notify_assignment(db, &subtask.assignees, Subject::Subtask(&subtask), actor.id)
            .await;
        Ok(subtask)
    }

    pub async fn get<C: ConnectionTrait>(&self, db: &C, viewer: &User, id: Uuid) -> Result<Subtask> {
        let subtask = Self::load(db, id).await?;
        ensure_can_view(db, viewer, subtask.project_id, subtask.is_participant(viewer.id)).await?;
        Ok(subtask)
    }

    pub async fn list_by_task<C: ConnectionTrait>(
        &self,
        db: &C,
        viewer: &User,
        parent_task_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<Subtask>> {
        let parent = Task::find_by_id(db, parent_task_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Parent task not found"))?;
        ensure_can_view(db, viewer, parent.project_id, parent.is_participant(viewer.id)).await?;
        Ok(Subtask::find_by_parent_task_id(db, parent.id, include_archived).await?)
    }

    pub async fn list_mine<C: ConnectionTrait>(&self, db: &C, viewer: &User) -> Result<Vec<Subtask>> {
        Ok(Subtask::find_by_participant(db, viewer.id)
            .await?
            .into_iter()
            .filter(|subtask| !subtask.archived)
            .collect())
    }

    pub async fn update<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        id: Uuid,
        payload: UpdateSubtaskRequest,
    ) -> Result<SubtaskUpdate> {
        let before = Self::load(db, id).await?;
        self.require_edit(actor, &before)?;

        let due_date = payload
            .due_date
            .map(validation::future_due_date)
            .transpose()?;
        let is_recurring = payload.is_recurring.unwrap_or(before.is_recurring);
        // Turning recurrence off drops a stale interval unless one is sent.
        let recurrence_interval = match payload.recurrence_interval {
            Some(interval) => interval,
            None if !is_recurring => None,
            None => before.recurrence_interval,
        };
        validate_recurrence(
            is_recurring,
            recurrence_interval,
            due_date.unwrap_or(before.due_date),
        )?;

        let changes = SubtaskChanges {
            title: payload
                .title
                .as_deref()
                .map(|title| validation::title(title, "title"))
                .transpose()?,
            description: payload
                .description
                .map(|description| validation::description(description.as_deref()))
                .transpose()?,
            status: payload.status,
            priority: validation::priority(payload.priority)?,
            due_date,
            time_taken: validation::time_taken(payload.time_taken)?,
            is_recurring: payload.is_recurring,
            recurrence_interval: (recurrence_interval != before.recurrence_interval)
                .then_some(recurrence_interval),
        };

        let diff = match &payload.assignees {
            Some(raw) => {
                let next = resolve_assignees(db, raw).await?;
                if next.is_empty() {
                    return Err(DomainError::validation("assignees must not be empty"));
                }
                let diff = diff_assignees(&before.assignees, &next);
                if !diff.is_empty() {
                    self.evaluator.require(actor, &Operation::ChangeAssignees)?;
                }
                Some((next, diff))
            }
            None => None,
        };

        let mut subtask = Subtask::update(db, before.id, &changes).await?;
        let diff = match diff {
            Some((next, diff)) if !diff.is_empty() => {
                subtask = Subtask::set_assignees(db, subtask.id, &next).await?;
                Project::add_members(db, subtask.project_id, &diff.added).await?;
                diff
            }
            _ => AssignmentDiff::default(),
        };
        tracing::debug!(
            subtask_id = %subtask.id,
            user_id = %actor.id,
            added = diff.added.len(),
            removed = diff.removed.len(),
            "Subtask updated"
        );

        let next_occurrence = if before.status != TaskStatus::Completed
            && subtask.status == TaskStatus::Completed
        {
            self.spawn_next_occurrence(db, &subtask).await?
        } else {
            None
        };

        self.notify_update(db, actor, &before, &subtask, &diff).await;
        Ok(SubtaskUpdate {
            subtask,
            next_occurrence,
        })
    }

    async fn spawn_next_occurrence<C: ConnectionTrait>(
        &self,
        db: &C,
        completed: &Subtask,
    ) -> Result<Option<Subtask>> {
        let Some(next) = derive_next_occurrence(completed)? else {
            return Ok(None);
        };
        let created =
            Subtask::create(db, &next.data, next.owner_id, &next.assignees, Uuid::new_v4()).await?;
        tracing::info!(
            completed_id = %completed.id,
            next_id = %created.id,
            due_date = ?created.due_date,
            "Recurring subtask regenerated"
        );
        Ok(Some(created))
    }

    async fn notify_update<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        before: &Subtask,
        after: &Subtask,
        diff: &AssignmentDiff<Uuid>,
    ) {
        let subject = Subject::Subtask(after);
        self.notifications
            .notify_assignment(db, &diff.added, subject, actor.id)
            .await;
        self.notifications
            .notify_unassignment(db, &diff.removed, subject, actor.id)
            .await;
        if before.status != after.status {
            self.notifications
                .notify_status_change(db, subject, actor.id)
                .await;
        }
        let fields = changed_fields(
            (before.title.as_str(), before.due_date, before.priority),
            (after.title.as_str(), after.due_date, after.priority),
        );
        self.notifications
            .notify_field_change(db, subject, &fields, actor.id)
            .await;
    }

    pub async fn assign_owner<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Subtask> {
        self.evaluator.require(actor, &Operation::AssignOwner)?;
        let subtask = Self::load(db, id).await?;
        let owner = User::find_by_id(db, owner_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        if subtask.owner_id == owner.id {
            return Ok(subtask);
        }

        let subtask = Subtask::set_owner(db, subtask.id, owner.id).await?;
        Project::add_members(db, subtask.project_id, &[owner.id]).await?;
        self.notifications
            .notify_owner_assigned(db, owner.id, Subject::Subtask(&subtask), actor.id)
            .await;
        Ok(subtask)
    }

    pub async fn comment<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        id: Uuid,
        text: &str,
    ) -> Result<Subtask> {
        let subtask = Self::load(db, id).await?;
        let departments = assignee_departments(db, &subtask.assignees).await?;
        self.evaluator.require(
            actor,
            &Operation::Comment {
                assignees: &subtask.assignees,
                assignee_departments: &departments,
            },
        )?;
        let text = validation::comment_text(text)?;

        let subtask = Subtask::append_comment(
            db,
            subtask.id,
            Comment::new(text.clone(), actor.id, actor.username.clone()),
        )
        .await?;
        self.notifications
            .notify_comment(db, Subject::Subtask(&subtask), actor, &text)
            .await;
        Ok(subtask)
    }

    pub async fn log_time<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        id: Uuid,
        minutes: i64,
    ) -> Result<Subtask> {
        let subtask = Self::load(db, id).await?;
        self.require_edit(actor, &subtask)?;
        validation::time_taken(Some(minutes))?;
        Ok(Subtask::add_time(db, subtask.id, minutes).await?)
    }

    pub async fn set_archived<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        id: Uuid,
        archived: bool,
    ) -> Result<Subtask> {
        let subtask = Self::load(db, id).await?;
        self.require_edit(actor, &subtask)?;
        Ok(Subtask::set_archived(db, subtask.id, archived).await?)
    }

    pub async fn delete<C: ConnectionTrait>(&self, db: &C, actor: &User, id: Uuid) -> Result<()> {
        let subtask = Self::load(db, id).await?;
        self.require_edit(actor, &subtask)?;
        Subtask::delete(db, subtask.id).await?;
        tracing::info!(subtask_id = %subtask.id, user_id = %actor.id, "Subtask deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Days, Utc};
    use db::models::{
        notification::Notification,
        user::{Department, Role},
    };
    use serde_json::json;

    use super::*;
    use crate::services::{
        config::NotificationConfig,
        realtime::ConnectionRegistry,
        test_support::{seed_project, seed_task, seed_user, setup_db},
    };

    fn service() -> SubtaskService {
        SubtaskService::new(
            CapabilityEvaluator::default(),
            NotificationService::new(
                Arc::new(ConnectionRegistry::new()),
                NotificationConfig::default(),
            ),
        )
    }

    fn request(parent_task_id: Uuid) -> CreateSubtaskRequest {
        CreateSubtaskRequest {
            parent_task_id,
            title: "Weekly sync notes".to_string(),
            description: None,
            status: None,
            priority: None,
            due_date: None,
            time_taken: None,
            is_recurring: false,
            recurrence_interval: None,
            assignees: None,
        }
    }

    #[tokio::test]
    async fn recurring_subtasks_need_interval_and_due_date() {
        let db = setup_db().await;
        let owner = seed_user(&db, "own@example.com", &[Role::Staff], Department::Operations).await;
        let project = seed_project(&db, &owner, "Ops").await;
        let task = seed_task(&db, &project, &owner, &[]).await;
        let service = service();
        let due = Utc::now().date_naive() + Days::new(3);

        for (interval, due_date) in [(None, Some(due)), (Some(0), Some(due)), (Some(7), None)] {
            let err = service
                .create(
                    &db,
                    &owner,
                    CreateSubtaskRequest {
                        is_recurring: true,
                        recurrence_interval: interval,
                        due_date,
                        ..request(task.id)
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }

        let err = service
            .create(
                &db,
                &owner,
                CreateSubtaskRequest {
                    recurrence_interval: Some(7),
                    ..request(task.id)
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = service
            .create(&db, &owner, request(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn completing_a_recurring_subtask_spawns_the_next_one() {
        let db = setup_db().await;
        let owner = seed_user(&db, "own@example.com", &[Role::Staff], Department::Operations).await;
        let helper = seed_user(&db, "help@example.com", &[Role::Staff], Department::Operations).await;
        let project = seed_project(&db, &owner, "Ops").await;
        let task = seed_task(&db, &project, &owner, &[]).await;
        let service = service();
        let due = Utc::now().date_naive() + Days::new(2);

        let subtask = service
            .create(
                &db,
                &owner,
                CreateSubtaskRequest {
                    is_recurring: true,
                    recurrence_interval: Some(7),
                    due_date: Some(due),
                    priority: Some(8),
                    assignees: Some(json!([helper.id])),
                    ..request(task.id)
                },
            )
            .await
            .unwrap();
        assert_eq!(subtask.project_id, project.id);

        let result = service
            .update(
                &db,
                &owner,
                subtask.id,
                UpdateSubtaskRequest {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(result.subtask.status, TaskStatus::Completed);

        let next = result.next_occurrence.unwrap();
        assert_ne!(next.id, subtask.id);
        assert_eq!(next.status, TaskStatus::Todo);
        assert_eq!(next.due_date, Some(due + Days::new(7)));
        assert_eq!(next.recurrence_interval, Some(7));
        assert_eq!(next.priority, 8);
        assert_eq!(next.owner_id, owner.id);
        assert_eq!(next.assignees, subtask.assignees);
        assert_eq!(next.parent_task_id, task.id);

        let again = service
            .update(
                &db,
                &owner,
                subtask.id,
                UpdateSubtaskRequest {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(again.next_occurrence.is_none());
        assert_eq!(
            Subtask::find_by_parent_task_id(&db, task.id, true)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn turning_recurrence_off_clears_the_interval() {
        let db = setup_db().await;
        let owner = seed_user(&db, "own@example.com", &[Role::Staff], Department::Operations).await;
        let project = seed_project(&db, &owner, "Ops").await;
        let task = seed_task(&db, &project, &owner, &[]).await;
        let service = service();

        let subtask = service
            .create(
                &db,
                &owner,
                CreateSubtaskRequest {
                    is_recurring: true,
                    recurrence_interval: Some(1),
                    due_date: Some(Utc::now().date_naive()),
                    ..request(task.id)
                },
            )
            .await
            .unwrap();

        let updated = service
            .update(
                &db,
                &owner,
                subtask.id,
                UpdateSubtaskRequest {
                    is_recurring: Some(false),
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.subtask.is_recurring);
        assert_eq!(updated.subtask.recurrence_interval, None);
        assert!(updated.next_occurrence.is_none());
    }

    #[tokio::test]
    async fn subtask_notifications_reference_parent_and_subtask() {
        let db = setup_db().await;
        let manager = seed_user(&db, "m@example.com", &[Role::Manager], Department::Marketing).await;
        let staff = seed_user(&db, "s@example.com", &[Role::Staff], Department::Marketing).await;
        let project = seed_project(&db, &manager, "Campaign").await;
        let task = seed_task(&db, &project, &manager, &[]).await;
        let service = service();

        let subtask = service.create(&db, &manager, request(task.id)).await.unwrap();
        service
            .update(
                &db,
                &manager,
                subtask.id,
                UpdateSubtaskRequest {
                    assignees: Some(json!([manager.id.to_string(), staff.id.to_string()])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let inbox = Notification::find_by_user(&db, staff.id, false).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(
            inbox[0].message,
            "You have been assigned to subtask: 'Weekly sync notes'"
        );
        assert_eq!(inbox[0].task_id, Some(task.id));
        assert_eq!(inbox[0].subtask_id, Some(subtask.id));

        let err = service
            .update(
                &db,
                &staff,
                subtask.id,
                UpdateSubtaskRequest {
                    assignees: Some(json!([staff.id])),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let listed = service.list_by_task(&db, &staff, task.id, false).await.unwrap();
        assert_eq!(listed.len(), 1);

        let commented = service
            .comment(&db, &staff, subtask.id, "on it")
            .await
            .unwrap();
        assert_eq!(commented.comments.len(), 1);
        assert_eq!(
            Notification::find_by_user(&db, manager.id, false)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
