use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use db::models::{
    subtask::Subtask,
    task::{Task, TaskStatus},
};
use serde::Serialize;
use uuid::Uuid;

use super::window::DateWindow;
use crate::services::assignment::dedup_preserving_order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatusBucket {
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl StatusBucket {
    /// Blocked items belong to no bucket.
    pub fn from_status(status: TaskStatus) -> Option<Self> {
        match status {
            TaskStatus::Todo => Some(Self::ToDo),
            TaskStatus::InProgress => Some(Self::InProgress),
            TaskStatus::Completed => Some(Self::Completed),
            TaskStatus::Blocked => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Task,
    Subtask,
}

/// Entity-independent view of a task or subtask as it appears in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    pub id: Uuid,
    pub kind: ItemKind,
    pub title: String,
    pub project_id: Uuid,
    pub parent_task_id: Option<Uuid>,
    pub status: TaskStatus,
    pub priority: i32,
    pub owner_id: Uuid,
    pub assignees: Vec<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub time_taken: i64,
    pub created_at: DateTime<Utc>,
}

impl ItemSummary {
    /// Owner and assignees, each once.
    pub fn participants(&self) -> Vec<Uuid> {
        dedup_preserving_order(
            std::iter::once(self.owner_id).chain(self.assignees.iter().copied()),
        )
    }
}

impl From<&Task> for ItemSummary {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            kind: ItemKind::Task,
            title: task.title.clone(),
            project_id: task.project_id,
            parent_task_id: None,
            status: task.status,
            priority: task.priority,
            owner_id: task.owner_id,
            assignees: task.assignees.clone(),
            due_date: task.due_date,
            time_taken: task.time_taken,
            created_at: task.created_at,
        }
    }
}

impl From<&Subtask> for ItemSummary {
    fn from(subtask: &Subtask) -> Self {
        Self {
            id: subtask.id,
            kind: ItemKind::Subtask,
            title: subtask.title.clone(),
            project_id: subtask.project_id,
            parent_task_id: Some(subtask.parent_task_id),
            status: subtask.status,
            priority: subtask.priority,
            owner_id: subtask.owner_id,
            assignees: subtask.assignees.clone(),
            due_date: subtask.due_date,
            time_taken: subtask.time_taken,
            created_at: subtask.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportBuckets {
    #[serde(rename = "To Do")]
    pub to_do: Vec<ItemSummary>,
    #[serde(rename = "In Progress")]
    pub in_progress: Vec<ItemSummary>,
    #[serde(rename = "Completed")]
    pub completed: Vec<ItemSummary>,
}

impl ReportBuckets {
    pub fn get(&self, bucket: StatusBucket) -> &[ItemSummary] {
        match bucket {
            StatusBucket::ToDo => &self.to_do,
            StatusBucket::InProgress => &self.in_progress,
            StatusBucket::Completed => &self.completed,
        }
    }

    fn push(&mut self, bucket: StatusBucket, item: ItemSummary) {
        match bucket {
            StatusBucket::ToDo => self.to_do.push(item),
            StatusBucket::InProgress => self.in_progress.push(item),
            StatusBucket::Completed => self.completed.push(item),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    #[serde(rename = "To Do")]
    pub to_do: usize,
    #[serde(rename = "In Progress")]
    pub in_progress: usize,
    #[serde(rename = "Completed")]
    pub completed: usize,
    pub total: usize,
}

impl BucketCounts {
    fn record(&mut self, bucket: StatusBucket) {
        match bucket {
            StatusBucket::ToDo => self.to_do += 1,
            StatusBucket::InProgress => self.in_progress += 1,
            StatusBucket::Completed => self.completed += 1,
        }
        self.total += 1;
    }
}

/// A user counted in a team report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMember {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberSummary {
    pub user_id: Uuid,
    pub username: String,
    #[serde(flatten)]
    pub counts: BucketCounts,
    pub time_taken: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportAggregates {
    #[serde(flatten)]
    pub counts: BucketCounts,
    pub time_taken: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberSummary>>,
}

/// Buckets the items created inside `window` by status and totals them.
///
/// With `members` set, each member is counted once per item they own or are
/// assigned to.
pub fn aggregate<I>(
    items: I,
    window: &DateWindow,
    members: Option<&[ReportMember]>,
) -> (ReportBuckets, ReportAggregates)
where
    I: IntoIterator<Item = ItemSummary>,
{
    let mut buckets = ReportBuckets::default();
    let mut aggregates = ReportAggregates::default();
    let mut per_member: HashMap<Uuid, MemberSummary> = members
        .unwrap_or_default()
        .iter()
        .map(|member| {
            (
                member.user_id,
                MemberSummary {
                    user_id: member.user_id,
                    username: member.username.clone(),
                    counts: BucketCounts::default(),
                    time_taken: 0,
                },
            )
        })
        .collect();

    for item in items {
        if !window.contains(item.created_at) {
            continue;
        }
        let Some(bucket) = StatusBucket::from_status(item.status) else {
            continue;
        };

        for participant in item.participants() {
            if let Some(summary) = per_member.get_mut(&participant) {
                summary.counts.record(bucket);
                summary.time_taken += item.time_taken;
            }
        }
        aggregates.counts.record(bucket);
        aggregates.time_taken += item.time_taken;
        buckets.push(bucket, item);
    }

    aggregates.members = members.map(|members| {
        members
            .iter()
            .filter_map(|member| per_member.remove(&member.user_id))
            .collect()
    });
    (buckets, aggregates)
}
