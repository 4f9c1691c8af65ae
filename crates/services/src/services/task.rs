use chrono::NaiveDate;
use db::{
    ConnectionTrait,
    models::{
        comment::Comment,
        project::Project,
        task::{CreateTask, Task, TaskChanges, TaskStatus},
        user::{Department, User},
    },
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{
    access::{can_view_tasks, load_participation},
    assignment::{AssignmentDiff, diff_assignees, parse_assignee_ids},
    capability::{CapabilityEvaluator, Operation},
    error::{DomainError, Result},
    notification::{FieldChange, NotificationService, Subject},
    validation,
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i32>,
    pub due_date: Option<NaiveDate>,
    pub time_taken: Option<i64>,
    /// Any accepted assignee shape; see [`parse_assignee_ids`].
    #[serde(default)]
    pub assignees: Option<Value>,
}

/// Absent fields are kept; `null` clears nullable ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<i32>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub due_date: Option<Option<NaiveDate>>,
    pub time_taken: Option<i64>,
    #[serde(default)]
    pub assignees: Option<Value>,
}

/// Parses an assignee payload and checks that every id is a known user.
pub(crate) async fn resolve_assignees<C: ConnectionTrait>(db: &C, raw: &Value) -> Result<Vec<Uuid>> {
    let ids = parse_assignee_ids(raw)?;
    let users = User::find_by_ids(db, &ids).await?;
    if let Some(missing) = ids.iter().find(|id| !users.iter().any(|user| user.id == **id)) {
        return Err(DomainError::not_found(format!("Assignee {missing} not found")));
    }
    Ok(ids)
}

pub(crate) async fn assignee_departments<C: ConnectionTrait>(
    db: &C,
    assignees: &[Uuid],
) -> Result<Vec<Department>> {
    Ok(User::find_by_ids(db, assignees)
        .await?
        .into_iter()
        .map(|user| user.department)
        .collect())
}

/// Viewing an item: admins, its participants, or anyone who may drill into
/// the project's tasks.
pub(crate) async fn ensure_can_view<C: ConnectionTrait>(
    db: &C,
    viewer: &User,
    project_id: Uuid,
    is_participant: bool,
) -> Result<()> {
    if viewer.is_admin() || is_participant {
        return Ok(());
    }
    let project = Project::find_by_id(db, project_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Project not found"))?;
    let participation = load_participation(db, project_id).await?;
    if can_view_tasks(&project, &participation, viewer) {
        Ok(())
    } else {
        Err(DomainError::forbidden(
            "Insufficient permissions to view tasks in this project",
        ))
    }
}

pub(crate) fn changed_fields(
    (old_title, old_due, old_priority): (&str, Option<NaiveDate>, i32),
    (new_title, new_due, new_priority): (&str, Option<NaiveDate>, i32),
) -> Vec<FieldChange> {
    let mut fields = Vec::new();
    if old_title != new_title {
        fields.push(FieldChange::Title);
    }
    if old_due != new_due {
        fields.push(FieldChange::Deadline);
    }
    if old_priority != new_priority {
        fields.push(FieldChange::Priority);
    }
    fields
}

#[derive(Clone)]
pub struct TaskService {
    evaluator: CapabilityEvaluator,
    notifications: NotificationService,
}

impl TaskService {
    pub fn new(evaluator: CapabilityEvaluator, notifications: NotificationService) -> Self {
        Self {
            evaluator,
            notifications,
        }
    }

    async fn load<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Task> {
        Task::find_by_id(db, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Task not found"))
    }

    fn require_edit(&self, actor: &User, task: &Task) -> Result<()> {
        self.evaluator.require(
            actor,
            &Operation::EditWorkItem {
                is_participant: task.is_participant(actor.id),
            },
        )
    }

    pub async fn create<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        payload: CreateTaskRequest,
    ) -> Result<Task> {
        let data = CreateTask {
            project_id: payload.project_id,
            title: validation::title(&payload.title, "title")?,
            description: validation::description(payload.description.as_deref())?,
            status: payload.status,
            priority: validation::priority(payload.priority)?,
            due_date: validation::future_due_date(payload.due_date)?,
            time_taken: validation::time_taken(payload.time_taken)?,
        };
        let project = Project::find_by_id(db, data.project_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Project not found"))?;
        let assignees = match &payload.assignees {
            Some(raw) => resolve_assignees(db, raw).await?,
            None => Vec::new(),
        };

        let task = Task::create(db, &data, actor.id, &assignees, Uuid::new_v4()).await?;
        Project::add_members(db, project.id, &task.assignees).await?;
        tracing::info!(task_id = %task.id, project_id = %project.id, user_id = %actor.id, "Task created");

        self.notifications
            .notify_assignment(db, &task.assignees, Subject::Task(&task), actor.id)
            .await;
        Ok(task)
    }

    pub async fn get<C: ConnectionTrait>(&self, db: &C, viewer: &User, id: Uuid) -> Result<Task> {
        let task = Self::load(db, id).await?;
        ensure_can_view(db, viewer, task.project_id, task.is_participant(viewer.id)).await?;
        Ok(task)
    }

    pub async fn list_by_project<C: ConnectionTrait>(
        &self,
        db: &C,
        viewer: &User,
        project_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<Task>> {
        ensure_can_view(db, viewer, project_id, false).await?;
        Ok(Task::find_by_project_id(db, project_id, include_archived).await?)
    }

    /// Tasks the viewer owns or is assigned to, archived ones excluded.
    pub async fn list_mine<C: ConnectionTrait>(&self, db: &C, viewer: &User) -> Result<Vec<Task>> {
        Ok(Task::find_by_participant(db, viewer.id)
            .await?
            .into_iter()
            .filter(|task| !task.archived)
            .collect())
    }

    pub async fn update<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        id: Uuid,
        payload: UpdateTaskRequest,
    ) -> Result<Task> {
        let before = Self::load(db, id).await?;
        self.require_edit(actor, &before)?;

        let changes = TaskChanges {
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
            due_date: payload
                .due_date
                .map(validation::future_due_date)
                .transpose()?,
            time_taken: validation::time_taken(payload.time_taken)?,
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

        let mut task = Task::update(db, before.id, &changes).await?;
        let diff = match diff {
            Some((next, diff)) if !diff.is_empty() => {
                task = Task::set_assignees(db, task.id, &next).await?;
                Project::add_members(db, task.project_id, &diff.added).await?;
                diff
            }
            _ => AssignmentDiff::default(),
        };
        tracing::debug!(
            task_id = %task.id,
            user_id = %actor.id,
            added = diff.added.len(),
            removed = diff.removed.len(),
            "Task updated"
        );

        self.notify_update(db, actor, &before, &task, &diff).await;
        Ok(task)
    }

    async fn notify_update<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        before: &Task,
        after: &Task,
        diff: &AssignmentDiff<Uuid>,
    ) {
        let subject = Subject::Task(after);
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
    ) -> Result<Task> {
        self.evaluator.require(actor, &Operation::AssignOwner)?;
        let task = Self::load(db, id).await?;
        let owner = User::find_by_id(db, owner_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        if task.owner_id == owner.id {
            return Ok(task);
        }

        let task = Task::set_owner(db, task.id, owner.id).await?;
        Project::add_members(db, task.project_id, &[owner.id]).await?;
        tracing::info!(task_id = %task.id, owner_id = %owner.id, user_id = %actor.id, "Task owner reassigned");

        self.notifications
            .notify_owner_assigned(db, owner.id, Subject::Task(&task), actor.id)
            .await;
        Ok(task)
    }

    pub async fn comment<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        id: Uuid,
        text: &str,
    ) -> Result<Task> {
        let task = Self::load(db, id).await?;
        let departments = assignee_departments(db, &task.assignees).await?;
        self.evaluator.require(
            actor,
            &Operation::Comment {
                assignees: &task.assignees,
                assignee_departments: &departments,
            },
        )?;
        let text = validation::comment_text(text)?;

        let task = Task::append_comment(
            db,
            task.id,
            Comment::new(text.clone(), actor.id, actor.username.clone()),
        )
        .await?;
        self.notifications
            .notify_comment(db, Subject::Task(&task), actor, &text)
            .await;
        Ok(task)
    }

    pub async fn log_time<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        id: Uuid,
        minutes: i64,
    ) -> Result<Task> {
        let task = Self::load(db, id).await?;
        self.require_edit(actor, &task)?;
        validation::time_taken(Some(minutes))?;
        let task = Task::add_time(db, task.id, minutes).await?;
        tracing::debug!(task_id = %task.id, minutes, total = task.time_taken, "Time logged");
        Ok(task)
    }

    pub async fn set_archived<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        id: Uuid,
        archived: bool,
    ) -> Result<Task> {
        let task = Self::load(db, id).await?;
        self.require_edit(actor, &task)?;
        Ok(Task::set_archived(db, task.id, archived).await?)
    }

    pub async fn delete<C: ConnectionTrait>(&self, db: &C, actor: &User, id: Uuid) -> Result<()> {
        let task = Self::load(db, id).await?;
        self.require_edit(actor, &task)?;
        let rows = Task::delete(db, task.id).await?;
        tracing::info!(task_id = %task.id, user_id = %actor.id, rows, "Task deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use db::models::{notification::Notification, user::Role};
    use serde_json::json;

    use super::*;
    use crate::services::{
        config::NotificationConfig,
        realtime::{ConnectionRegistry, SessionHandle, SessionRegistry},
        test_support::{seed_project, seed_task, seed_user, setup_db},
    };

    fn service(registry: &ConnectionRegistry) -> TaskService {
        TaskService::new(
            CapabilityEvaluator::default(),
            NotificationService::new(Arc::new(registry.clone()), NotificationConfig::default()),
        )
    }

    fn create_request(project_id: Uuid, assignees: Option<Value>) -> CreateTaskRequest {
        CreateTaskRequest {
            project_id,
            title: "Write docs".to_string(),
            description: None,
            status: None,
            priority: Some(3),
            due_date: None,
            time_taken: None,
            assignees,
        }
    }

    #[tokio::test]
    async fn create_appends_creator_and_members_then_notifies() {
        let db = setup_db().await;
        let registry = ConnectionRegistry::new();
        let owner = seed_user(&db, "own@example.com", &[Role::Staff], Department::Engineering).await;
        let helper = seed_user(&db, "help@example.com", &[Role::Staff], Department::Design).await;
        let project = seed_project(&db, &owner, "Docs").await;

        let task = service(&registry)
            .create(
                &db,
                &owner,
                create_request(project.id, Some(json!({ "0": helper.id.to_string() }))),
            )
            .await
            .unwrap();

        assert_eq!(task.assignees, vec![owner.id, helper.id]);
        let project = Project::find_by_id(&db, project.id).await.unwrap().unwrap();
        assert!(project.is_member(helper.id));
        assert_eq!(Notification::find_by_user(&db, helper.id, false).await.unwrap().len(), 1);
        assert!(Notification::find_by_user(&db, owner.id, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_unknown_project_and_bad_assignees() {
        let db = setup_db().await;
        let registry = ConnectionRegistry::new();
        let owner = seed_user(&db, "own@example.com", &[Role::Staff], Department::Engineering).await;
        let project = seed_project(&db, &owner, "Docs").await;
        let service = service(&registry);

        let err = service
            .create(&db, &owner, create_request(Uuid::new_v4(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        let err = service
            .create(&db, &owner, create_request(project.id, Some(json!(42))))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = service
            .create(
                &db,
                &owner,
                create_request(project.id, Some(json!([Uuid::new_v4().to_string()]))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn staff_cannot_reassign_but_may_edit_fields() {
        let db = setup_db().await;
        let registry = ConnectionRegistry::new();
        let staff = seed_user(&db, "s@example.com", &[Role::Staff], Department::Engineering).await;
        let other = seed_user(&db, "o@example.com", &[Role::Staff], Department::Engineering).await;
        let project = seed_project(&db, &staff, "P").await;
        let task = seed_task(&db, &project, &staff, &[]).await;
        let service = service(&registry);

        let err = service
            .update(
                &db,
                &staff,
                task.id,
                UpdateTaskRequest {
                    assignees: Some(json!([other.id])),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let updated = service
            .update(
                &db,
                &staff,
                task.id,
                UpdateTaskRequest {
                    title: Some("Renamed".to_string()),
                    assignees: Some(json!([staff.id])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");

        let err = service
            .update(
                &db,
                &other,
                task.id,
                UpdateTaskRequest {
                    title: Some("Hijacked".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn reassignment_notifies_added_removed_and_remaining() {
        let db = setup_db().await;
        let registry = ConnectionRegistry::new();
        let manager = seed_user(&db, "m@example.com", &[Role::Manager], Department::Engineering).await;
        let kept = seed_user(&db, "k@example.com", &[Role::Staff], Department::Engineering).await;
        let dropped = seed_user(&db, "d@example.com", &[Role::Staff], Department::Engineering).await;
        let added = seed_user(&db, "a@example.com", &[Role::Staff], Department::Engineering).await;
        let project = seed_project(&db, &manager, "P").await;
        let task = seed_task(&db, &project, &manager, &[kept.id, dropped.id]).await;

        let (handle, mut events) = SessionHandle::channel();
        registry.register(added.id, handle);

        let updated = service(&registry)
            .update(
                &db,
                &manager,
                task.id,
                UpdateTaskRequest {
                    status: Some(TaskStatus::InProgress),
                    assignees: Some(json!(
                        serde_json::to_string(&[kept.id, added.id]).unwrap()
                    )),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.assignees, vec![kept.id, added.id]);

        let messages = |user: Uuid| {
            let db = &db;
            async move {
                Notification::find_by_user(db, user, false)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|n| n.message)
                    .collect::<Vec<_>>()
            }
        };
        let added_messages = messages(added.id).await;
        assert!(added_messages.iter().any(|m| m.starts_with("You have been assigned")));
        assert!(added_messages.iter().any(|m| m.contains("changed to In Progress")));
        assert_eq!(
            messages(dropped.id).await,
            vec!["You have been removed from task: 'Seeded task'".to_string()]
        );
        assert_eq!(messages(kept.id).await.len(), 1);
        assert!(messages(manager.id).await.is_empty());

        let first = events.try_recv().unwrap();
        assert_eq!(first.event, "notification");
        assert_eq!(first.payload["task"]["id"], json!(task.id));

        let project = Project::find_by_id(&db, project.id).await.unwrap().unwrap();
        assert!(project.is_member(added.id));
    }

    #[tokio::test]
    async fn field_edits_notify_remaining_assignees_except_the_editor() {
        let db = setup_db().await;
        let registry = ConnectionRegistry::new();
        let lead = seed_user(&db, "fl@example.com", &[Role::Manager], Department::Design).await;
        let a = seed_user(&db, "fa@example.com", &[Role::Staff], Department::Design).await;
        let b = seed_user(&db, "fb@example.com", &[Role::Staff], Department::Design).await;
        let project = seed_project(&db, &lead, "Site").await;
        let task = seed_task(&db, &project, &lead, &[a.id, b.id]).await;

        service(&registry)
            .update(
                &db,
                &lead,
                task.id,
                UpdateTaskRequest {
                    title: Some("Shipped".to_string()),
                    priority: Some(8),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        for user in [&a, &b] {
            let inbox = Notification::find_by_user(&db, user.id, false).await.unwrap();
            assert_eq!(inbox.len(), 1);
            assert_eq!(inbox[0].message, "The task 'Shipped' was updated: title, priority");
        }
        assert!(Notification::find_by_user(&db, lead.id, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_assignee_list_is_rejected() {
        let db = setup_db().await;
        let registry = ConnectionRegistry::new();
        let manager = seed_user(&db, "m@example.com", &[Role::Manager], Department::Sales).await;
        let project = seed_project(&db, &manager, "P").await;
        let task = seed_task(&db, &project, &manager, &[]).await;

        let err = service(&registry)
            .update(
                &db,
                &manager,
                task.id,
                UpdateTaskRequest {
                    assignees: Some(json!([])),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn nullable_fields_distinguish_absent_from_null() {
        let keep: UpdateTaskRequest = serde_json::from_value(json!({ "title": "x" })).unwrap();
        assert!(keep.due_date.is_none());
        let clear: UpdateTaskRequest =
            serde_json::from_value(json!({ "due_date": null, "description": null })).unwrap();
        assert_eq!(clear.due_date, Some(None));
        assert_eq!(clear.description, Some(None));
    }

    #[tokio::test]
    async fn assign_owner_is_privileged_and_notifies_new_owner() {
        let db = setup_db().await;
        let registry = ConnectionRegistry::new();
        let staff = seed_user(&db, "s@example.com", &[Role::Staff], Department::Finance).await;
        let manager = seed_user(&db, "m@example.com", &[Role::Manager], Department::Finance).await;
        let project = seed_project(&db, &staff, "P").await;
        let task = seed_task(&db, &project, &staff, &[]).await;
        let service = service(&registry);

        let err = service
            .assign_owner(&db, &staff, task.id, manager.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let task = service
            .assign_owner(&db, &manager, task.id, staff.id)
            .await
            .unwrap();
        assert_eq!(task.owner_id, staff.id);

        let other = seed_user(&db, "o@example.com", &[Role::Staff], Department::Finance).await;
        let task = service
            .assign_owner(&db, &manager, task.id, other.id)
            .await
            .unwrap();
        assert_eq!(task.owner_id, other.id);
        let inbox = Notification::find_by_user(&db, other.id, false).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].message.starts_with("You are now the owner"));
    }

    #[tokio::test]
    async fn comments_are_gated_and_fan_out_to_assignees() {
        let db = setup_db().await;
        let registry = ConnectionRegistry::new();
        let owner = seed_user(&db, "own@example.com", &[Role::Staff], Department::Engineering).await;
        let colleague = seed_user(&db, "col@example.com", &[Role::Staff], Department::Engineering).await;
        let outsider = seed_user(&db, "out@example.com", &[Role::Staff], Department::Sales).await;
        let project = seed_project(&db, &owner, "P").await;
        let task = seed_task(&db, &project, &owner, &[]).await;
        let service = service(&registry);

        let err = service
            .comment(&db, &outsider, task.id, "let me in")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let task = service
            .comment(&db, &colleague, task.id, "  looks good  ")
            .await
            .unwrap();
        assert_eq!(task.comments.len(), 1);
        assert_eq!(task.comments[0].text, "looks good");
        assert_eq!(task.comments[0].author_name, "col@example.com");

        let inbox = Notification::find_by_user(&db, owner.id, false).await.unwrap();
        assert_eq!(
            inbox[0].message,
            "col@example.com commented on task 'Seeded task': looks good"
        );
    }

    #[tokio::test]
    async fn time_is_accumulated_and_never_negative() {
        let db = setup_db().await;
        let registry = ConnectionRegistry::new();
        let owner = seed_user(&db, "own@example.com", &[Role::Staff], Department::Hr).await;
        let project = seed_project(&db, &owner, "P").await;
        let task = seed_task(&db, &project, &owner, &[]).await;
        let service = service(&registry);

        service.log_time(&db, &owner, task.id, 30).await.unwrap();
        let task = service.log_time(&db, &owner, task.id, 15).await.unwrap();
        assert_eq!(task.time_taken, 45);
        assert!(service.log_time(&db, &owner, task.id, -5).await.is_err());
    }

    #[tokio::test]
    async fn viewing_follows_project_visibility() {
        let db = setup_db().await;
        let registry = ConnectionRegistry::new();
        let owner = seed_user(&db, "own@example.com", &[Role::Manager], Department::Product).await;
        let stranger = seed_user(&db, "x@example.com", &[Role::Staff], Department::Sales).await;
        let admin = seed_user(&db, "root@example.com", &[Role::Admin], Department::Sales).await;
        let project = seed_project(&db, &owner, "P").await;
        let task = seed_task(&db, &project, &owner, &[]).await;
        let service = service(&registry);

        let err = service.get(&db, &stranger, task.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert!(service.get(&db, &admin, task.id).await.is_ok());
        assert_eq!(
            service
                .list_by_project(&db, &owner, project.id, false)
                .await
                .unwrap()
                .len(),
            1
        );

        service.set_archived(&db, &owner, task.id, true).await.unwrap();
        assert!(service.list_mine(&db, &owner).await.unwrap().is_empty());
        service.delete(&db, &owner, task.id).await.unwrap();
        let err = service.get(&db, &owner, task.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
