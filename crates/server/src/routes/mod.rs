pub mod auth;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod reports;
pub mod subtasks;
pub mod tasks;
