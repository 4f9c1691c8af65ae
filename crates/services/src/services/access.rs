use std::collections::{HashMap, HashSet};

use db::{
    ConnectionTrait, DbErr,
    models::{
        project::Project,
        subtask::Subtask,
        task::Task,
        user::{Department, User},
    },
};
use serde::Serialize;
use uuid::Uuid;

/// Owner and assignees of one task or subtask under a project.
#[derive(Debug, Clone)]
pub struct WorkItemParticipants {
    pub participants: Vec<Uuid>,
    pub archived: bool,
}

impl From<&Task> for WorkItemParticipants {
    fn from(task: &Task) -> Self {
        let mut participants = task.assignees.clone();
        participants.push(task.owner_id);
        Self {
            participants,
            archived: task.archived,
        }
    }
}

impl From<&Subtask> for WorkItemParticipants {
    fn from(subtask: &Subtask) -> Self {
        let mut participants = subtask.assignees.clone();
        participants.push(subtask.owner_id);
        Self {
            participants,
            archived: subtask.archived,
        }
    }
}

/// Everything [`can_view_tasks`] needs to know about a project's work items.
#[derive(Debug, Clone, Default)]
pub struct ProjectParticipation {
    pub items: Vec<WorkItemParticipants>,
    pub departments: HashMap<Uuid, Department>,
}

impl ProjectParticipation {
    pub fn new(items: Vec<WorkItemParticipants>, users: &[User]) -> Self {
        Self {
            items,
            departments: users.iter().map(|user| (user.id, user.department)).collect(),
        }
    }

    fn active_participants(&self) -> impl Iterator<Item = &Uuid> {
        self.items
            .iter()
            .filter(|item| !item.archived)
            .flat_map(|item| item.participants.iter())
    }
}

/// Whether `viewer` may drill into the tasks of `project`.
///
/// 1. admins always may;
/// 2. a direct owner or assignee of a live task or subtask may;
/// 3. a project member sharing a department with such a participant may.
///
/// Archived items never grant visibility.
pub fn can_view_tasks(project: &Project, participation: &ProjectParticipation, viewer: &User) -> bool {
    if viewer.is_admin() {
        return true;
    }

    if participation
        .active_participants()
        .any(|participant| *participant == viewer.id)
    {
        return true;
    }

    project.is_member(viewer.id)
        && participation.active_participants().any(|participant| {
            participation.departments.get(participant) == Some(&viewer.department)
        })
}

/// Loads the participation snapshot of a project, archived items included.
pub async fn load_participation<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
) -> Result<ProjectParticipation, DbErr> {
    let tasks = Task::find_by_project_id(db, project_id, true).await?;
    let subtasks = Subtask::find_by_project_id(db, project_id, true).await?;

    let items: Vec<WorkItemParticipants> = tasks
        .iter()
        .map(WorkItemParticipants::from)
        .chain(subtasks.iter().map(WorkItemParticipants::from))
        .collect();

    let user_ids: Vec<Uuid> = items
        .iter()
        .flat_map(|item| item.participants.iter().copied())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let users = User::find_by_ids(db, &user_ids).await?;

    Ok(ProjectParticipation::new(items, &users))
}

/// A project annotated with the viewer's task visibility.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithAccess {
    #[serde(flatten)]
    pub project: Project,
    pub can_view_tasks: bool,
}

pub async fn annotate<C: ConnectionTrait>(
    db: &C,
    project: Project,
    viewer: &User,
) -> Result<ProjectWithAccess, DbErr> {
    let can_view_tasks = if viewer.is_admin() {
        true
    } else {
        let participation = load_participation(db, project.id).await?;
        can_view_tasks(&project, &participation, viewer)
    };
    Ok(ProjectWithAccess {
        project,
        can_view_tasks,
    })
}
