#![allow(clippy::useless_conversion)]

pub mod comment;
pub mod ids;
pub mod notification;
pub mod project;
pub mod report_filter;
pub mod subtask;
pub mod task;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support;
