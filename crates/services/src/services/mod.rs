pub mod access;
pub mod assignment;
pub mod auth;
pub mod capability;
pub mod config;
pub mod error;
pub mod notification;
pub mod project;
pub mod realtime;
pub mod recurrence;
pub mod report;
pub mod subtask;
pub mod task;
pub mod user;
mod validation;

#[cfg(test)]
pub(crate) mod test_support;
