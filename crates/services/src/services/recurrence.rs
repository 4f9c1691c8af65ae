use chrono::{Days, NaiveDate};
use db::models::subtask::{CreateSubtask, Subtask, TaskStatus};
use uuid::Uuid;

use super::error::{DomainError, Result};

/// Recurrence fields are all-or-nothing: a recurring subtask needs a positive
/// day interval and a due date; a non-recurring one must not carry an interval.
pub fn validate_recurrence(
    is_recurring: bool,
    recurrence_interval: Option<i32>,
    due_date: Option<NaiveDate>,
) -> Result<()> {
    if !is_recurring {
        if recurrence_interval.is_some() {
            return Err(DomainError::validation(
                "recurrence_interval is only allowed on recurring subtasks",
            ));
        }
        return Ok(());
    }

    match recurrence_interval {
        Some(interval) if interval > 0 => {}
        Some(_) => {
            return Err(DomainError::validation(
                "recurrence_interval must be a positive number of days",
            ));
        }
        None => {
            return Err(DomainError::validation(
                "recurrence_interval is required for recurring subtasks",
            ));
        }
    }

    if due_date.is_none() {
        return Err(DomainError::validation(
            "due_date is required for recurring subtasks",
        ));
    }
    Ok(())
}

/// The subtask to create after a recurring one completes.
#[derive(Debug, Clone)]
pub struct NextOccurrence {
    pub data: CreateSubtask,
    pub owner_id: Uuid,
    pub assignees: Vec<Uuid>,
}

/// Shifts `due_date` by `interval_days` calendar days.
pub fn shift_due_date(due_date: NaiveDate, interval_days: i32) -> Result<NaiveDate> {
    let days = u64::try_from(interval_days)
        .map_err(|_| DomainError::validation("recurrence_interval must be positive"))?;
    due_date
        .checked_add_days(Days::new(days))
        .ok_or_else(|| DomainError::validation("Next due date is out of range"))
}

/// `None` for non-recurring subtasks. Status-transition detection is up to
/// the caller.
pub fn derive_next_occurrence(subtask: &Subtask) -> Result<Option<NextOccurrence>> {
    if !subtask.is_recurring {
        return Ok(None);
    }
    validate_recurrence(true, subtask.recurrence_interval, subtask.due_date)?;

    let (Some(interval), Some(due_date)) = (subtask.recurrence_interval, subtask.due_date) else {
        return Ok(None);
    };
    let next_due = shift_due_date(due_date, interval)?;

    Ok(Some(NextOccurrence {
        data: CreateSubtask {
            parent_task_id: subtask.parent_task_id,
            title: subtask.title.clone(),
            description: subtask.description.clone(),
            status: Some(TaskStatus::Todo),
            priority: Some(subtask.priority),
            due_date: Some(next_due),
            time_taken: None,
            is_recurring: true,
            recurrence_interval: Some(interval),
        },
        owner_id: subtask.owner_id,
        assignees: subtask.assignees.clone(),
    }))
}
