use std::{fmt, sync::Arc};

use chrono::{Duration, Utc};
use db::{
    ConnectionTrait,
    models::{
        notification::{CreateNotification, Notification, NotificationKind},
        subtask::Subtask,
        task::Task,
        user::User,
    },
};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{
    assignment::dedup_preserving_order,
    config::NotificationConfig,
    error::{DomainError, Result},
    realtime::SessionRegistry,
};

pub const NOTIFICATION_EVENT: &str = "notification";

const COMMENT_PREVIEW_CHARS: usize = 120;

/// The task or subtask a notification is about.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    Task(&'a Task),
    Subtask(&'a Subtask),
}

impl Subject<'_> {
    fn noun(&self) -> &'static str {
        match self {
            Subject::Task(_) => "task",
            Subject::Subtask(_) => "subtask",
        }
    }

    fn title(&self) -> &str {
        match self {
            Subject::Task(task) => &task.title,
            Subject::Subtask(subtask) => &subtask.title,
        }
    }

    fn assignees(&self) -> &[Uuid] {
        match self {
            Subject::Task(task) => &task.assignees,
            Subject::Subtask(subtask) => &subtask.assignees,
        }
    }

    fn status_label(&self) -> String {
        match self {
            Subject::Task(task) => task.status.to_string(),
            Subject::Subtask(subtask) => subtask.status.to_string(),
        }
    }

    fn ids(&self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            Subject::Task(task) => (Some(task.id), None),
            Subject::Subtask(subtask) => (Some(subtask.parent_task_id), Some(subtask.id)),
        }
    }

    fn payload(&self) -> Value {
        let serialized = match self {
            Subject::Task(task) => serde_json::to_value(task),
            Subject::Subtask(subtask) => serde_json::to_value(subtask),
        };
        serialized.unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldChange {
    Title,
    Deadline,
    Priority,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldChange::Title => "title",
            FieldChange::Deadline => "deadline",
            FieldChange::Priority => "priority",
        };
        f.write_str(label)
    }
}

/// What one fan-out did, per recipient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutOutcome {
    pub persisted: usize,
    pub pushed: usize,
    pub suppressed: usize,
    pub failed: usize,
}

impl FanoutOutcome {
    fn merge(&mut self, other: FanoutOutcome) {
        self.persisted += other.persisted;
        self.pushed += other.pushed;
        self.suppressed += other.suppressed;
        self.failed += other.failed;
    }
}

/// Persists one notification per recipient and pushes a best-effort realtime
/// event to recipients with a live session. Never fails the caller.
#[derive(Clone)]
pub struct NotificationService {
    registry: Arc<dyn SessionRegistry>,
    config: NotificationConfig,
}

impl NotificationService {
    pub fn new(registry: Arc<dyn SessionRegistry>, config: NotificationConfig) -> Self {
        Self { registry, config }
    }

    pub async fn notify_assignment<C: ConnectionTrait>(
        &self,
        db: &C,
        added: &[Uuid],
        subject: Subject<'_>,
        actor_id: Uuid,
    ) -> FanoutOutcome {
        let message = format!(
            "You have been assigned to {}: '{}'",
            subject.noun(),
            subject.title()
        );
        self.fan_out(db, added, actor_id, NotificationKind::Assigned, &message, subject)
            .await
    }

    pub async fn notify_unassignment<C: ConnectionTrait>(
        &self,
        db: &C,
        removed: &[Uuid],
        subject: Subject<'_>,
        actor_id: Uuid,
    ) -> FanoutOutcome {
        let message = format!(
            "You have been removed from {}: '{}'",
            subject.noun(),
            subject.title()
        );
        self.fan_out(db, removed, actor_id, NotificationKind::Unassigned, &message, subject)
            .await
    }

    pub async fn notify_owner_assigned<C: ConnectionTrait>(
        &self,
        db: &C,
        owner_id: Uuid,
        subject: Subject<'_>,
        actor_id: Uuid,
    ) -> FanoutOutcome {
        let message = format!(
            "You are now the owner of {}: '{}'",
            subject.noun(),
            subject.title()
        );
        self.fan_out(
            db,
            &[owner_id],
            actor_id,
            NotificationKind::OwnerAssigned,
            &message,
            subject,
        )
        .await
    }

    /// Sent to the post-update assignee set.
    pub async fn notify_status_change<C: ConnectionTrait>(
        &self,
        db: &C,
        subject: Subject<'_>,
        actor_id: Uuid,
    ) -> FanoutOutcome {
        let message = format!(
            "Status of {} '{}' changed to {}",
            subject.noun(),
            subject.title(),
            subject.status_label()
        );
        self.fan_out(
            db,
            subject.assignees(),
            actor_id,
            NotificationKind::StatusChanged,
            &message,
            subject,
        )
        .await
    }

    pub async fn notify_field_change<C: ConnectionTrait>(
        &self,
        db: &C,
        subject: Subject<'_>,
        fields: &[FieldChange],
        actor_id: Uuid,
    ) -> FanoutOutcome {
        if fields.is_empty() {
            return FanoutOutcome::default();
        }
        let changed = fields
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let message = format!(
            "The {} '{}' was updated: {}",
            subject.noun(),
            subject.title(),
            changed
        );
        self.fan_out(
            db,
            subject.assignees(),
            actor_id,
            NotificationKind::FieldChanged,
            &message,
            subject,
        )
        .await
    }

    pub async fn notify_comment<C: ConnectionTrait>(
        &self,
        db: &C,
        subject: Subject<'_>,
        author: &User,
        text: &str,
    ) -> FanoutOutcome {
        let preview: String = text.chars().take(COMMENT_PREVIEW_CHARS).collect();
        let message = format!(
            "{} commented on {} '{}': {}",
            author.username,
            subject.noun(),
            subject.title(),
            preview
        );
        self.fan_out(
            db,
            subject.assignees(),
            author.id,
            NotificationKind::Comment,
            &message,
            subject,
        )
        .await
    }

    async fn fan_out<C: ConnectionTrait>(
        &self,
        db: &C,
        recipients: &[Uuid],
        actor_id: Uuid,
        kind: NotificationKind,
        message: &str,
        subject: Subject<'_>,
    ) -> FanoutOutcome {
        let mut outcome = FanoutOutcome::default();
        let (task_id, subtask_id) = subject.ids();
        let recipients = dedup_preserving_order(
            recipients
                .iter()
                .copied()
                .filter(|recipient| *recipient != actor_id),
        );

        for recipient in recipients {
            let data = CreateNotification {
                user_id: recipient,
                message: message.to_string(),
                kind,
                assignor_id: Some(actor_id),
                task_id,
                subtask_id,
            };
            outcome.merge(self.deliver(db, &data, subject).await);
        }

        tracing::debug!(
            %actor_id,
            ?kind,
            persisted = outcome.persisted,
            pushed = outcome.pushed,
            suppressed = outcome.suppressed,
            failed = outcome.failed,
            "Notification fan-out finished"
        );
        outcome
    }

    async fn deliver<C: ConnectionTrait>(
        &self,
        db: &C,
        data: &CreateNotification,
        subject: Subject<'_>,
    ) -> FanoutOutcome {
        let mut outcome = FanoutOutcome::default();

        if self.is_duplicate(db, data).await {
            outcome.suppressed = 1;
            return outcome;
        }

        let notification_id = match Notification::create(db, data, Uuid::new_v4()).await {
            Ok(notification) => {
                outcome.persisted = 1;
                Some(notification.id)
            }
            Err(err) => {
                tracing::warn!(
                    user_id = %data.user_id,
                    error = %err,
                    "Failed to persist notification"
                );
                outcome.failed = 1;
                None
            }
        };

        if self.config.realtime_enabled && self.push(data, notification_id, subject) {
            outcome.pushed = 1;
        }
        outcome
    }

    async fn is_duplicate<C: ConnectionTrait>(&self, db: &C, data: &CreateNotification) -> bool {
        let Some(since) = self
            .config
            .dedup_window_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
            .and_then(|window| Utc::now().checked_sub_signed(window))
        else {
            return false;
        };
        match Notification::find_recent_duplicate(db, data, since).await {
            Ok(existing) => existing.is_some(),
            Err(err) => {
                tracing::warn!(
                    user_id = %data.user_id,
                    error = %err,
                    "Duplicate lookup failed, delivering anyway"
                );
                false
            }
        }
    }

    fn push(
        &self,
        data: &CreateNotification,
        notification_id: Option<Uuid>,
        subject: Subject<'_>,
    ) -> bool {
        let Some(handle) = self.registry.lookup(data.user_id) else {
            return false;
        };
        let payload = json!({
            "notification_id": notification_id,
            "message": data.message,
            "kind": data.kind,
            "assignor_id": data.assignor_id,
            subject.noun(): subject.payload(),
            "timestamp": Utc::now(),
        });
        match self.registry.push(&handle, NOTIFICATION_EVENT, payload) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    user_id = %data.user_id,
                    event = NOTIFICATION_EVENT,
                    error = %err,
                    "Realtime push failed"
                );
                false
            }
        }
    }

    pub async fn list<C: ConnectionTrait>(
        &self,
        db: &C,
        user: &User,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        Ok(Notification::find_by_user(db, user.id, unread_only).await?)
    }

    pub async fn mark_read<C: ConnectionTrait>(
        &self,
        db: &C,
        user: &User,
        id: Uuid,
    ) -> Result<Notification> {
        Notification::mark_read(db, user.id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Notification not found"))
    }

    pub async fn mark_all_read<C: ConnectionTrait>(&self, db: &C, user: &User) -> Result<u64> {
        Ok(Notification::mark_all_read(db, user.id).await?)
    }

    pub async fn delete<C: ConnectionTrait>(&self, db: &C, user: &User, id: Uuid) -> Result<()> {
        match Notification::delete(db, user.id, id).await? {
            0 => Err(DomainError::not_found("Notification not found")),
            _ => Ok(()),
        }
    }
}
