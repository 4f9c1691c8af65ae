pub mod notification;
pub mod project;
pub mod project_member;
pub mod subtask;
pub mod subtask_assignee;
pub mod task;
pub mod task_assignee;
pub mod user;
