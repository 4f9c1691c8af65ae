//! Completion and time-tracking reports.
//!
//! Items are loaded per scope, bucketed by status over a date window and
//! handed to a [`ReportRenderer`] as a [`ReportData`] value. Empty reports are
//! a normal outcome and never reach the renderer.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use db::{
    ConnectionTrait,
    models::{
        project::Project,
        report_filter::ReportFilter,
        subtask::Subtask,
        task::Task,
        user::{Department, User},
    },
};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

mod aggregate;
mod render;
mod window;

pub use aggregate::{
    BucketCounts, ItemKind, ItemSummary, MemberSummary, ReportAggregates, ReportBuckets,
    ReportMember, StatusBucket, aggregate,
};
pub use render::{JsonReportRenderer, RenderError, ReportRenderer};
pub use window::{DateWindow, Timeframe};

use super::{
    capability::{CapabilityEvaluator, Operation},
    config::ReportConfig,
    error::DomainError,
};

pub const EMPTY_REPORT_MESSAGE: &str = "No tasks found for the selected scope and period";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportScope {
    Project,
    User,
    Team,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    #[serde(rename = "type")]
    pub report_type: ReportScope,
    pub scope_name: String,
    pub generated_at: DateTime<Utc>,
    pub date_range: DateWindow,
}

/// The normalized shape every renderer consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub data: ReportBuckets,
    pub aggregates: ReportAggregates,
    pub metadata: ReportMetadata,
}

impl ReportData {
    pub fn is_empty(&self) -> bool {
        self.aggregates.counts.total == 0
    }
}

pub fn build_report<I>(
    scope: ReportScope,
    scope_name: impl Into<String>,
    items: I,
    window: DateWindow,
    members: Option<&[ReportMember]>,
) -> ReportData
where
    I: IntoIterator<Item = ItemSummary>,
{
    let (data, aggregates) = aggregate(items, &window, members);
    ReportData {
        data,
        aggregates,
        metadata: ReportMetadata {
            report_type: scope,
            scope_name: scope_name.into(),
            generated_at: Utc::now(),
            date_range: window,
        },
    }
}

#[derive(Debug)]
pub enum ReportOutcome<T> {
    /// Nothing qualified; the renderer was not invoked.
    Empty { report: ReportData, message: String },
    Rendered { report: ReportData, output: T },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl From<db::DbErr> for ReportError {
    fn from(err: db::DbErr) -> Self {
        ReportError::Domain(err.into())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    pub scope: ReportScope,
    pub scope_id: String,
    pub timeframe: Option<Timeframe>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Clone, Default)]
pub struct ReportService {
    evaluator: CapabilityEvaluator,
    config: ReportConfig,
}

struct ScopedItems {
    name: String,
    items: Vec<ItemSummary>,
    members: Option<Vec<ReportMember>>,
}

impl ReportService {
    pub fn new(evaluator: CapabilityEvaluator, config: ReportConfig) -> Self {
        Self { evaluator, config }
    }

    pub async fn generate<C, R>(
        &self,
        db: &C,
        actor: &User,
        request: &ReportRequest,
        renderer: &R,
    ) -> Result<ReportOutcome<R::Output>, ReportError>
    where
        C: ConnectionTrait,
        R: ReportRenderer,
    {
        let window = DateWindow::resolve(request.timeframe, request.start, request.end)?;
        let scoped = match request.scope {
            ReportScope::Project => self.project_items(db, actor, &request.scope_id, &window).await?,
            ReportScope::User => self.user_items(db, actor, &request.scope_id, &window).await?,
            ReportScope::Team => self.team_items(db, actor, &request.scope_id, &window).await?,
        };

        let report = build_report(
            request.scope,
            scoped.name,
            scoped.items,
            window,
            scoped.members.as_deref(),
        );
        if report.is_empty() {
            return Ok(ReportOutcome::Empty {
                report,
                message: EMPTY_REPORT_MESSAGE.to_string(),
            });
        }

        let output = renderer.render(&report)?;
        tracing::info!(
            scope = %request.scope,
            scope_id = %request.scope_id,
            total = report.aggregates.counts.total,
            content_type = renderer.content_type(),
            "Report generated"
        );
        Ok(ReportOutcome::Rendered { report, output })
    }

    async fn project_items<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        scope_id: &str,
        window: &DateWindow,
    ) -> Result<ScopedItems, ReportError> {
        let project_id = parse_id(scope_id, "project")?;
        let project = Project::find_by_id(db, project_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Project not found"))?;
        self.evaluator.require(
            actor,
            &Operation::ProjectReport {
                is_member: project.is_member(actor.id),
            },
        )?;

        let items = self
            .load_tasks(db, &ReportFilter::Project(project.id), window)
            .await?;
        Ok(ScopedItems {
            name: project.name,
            items,
            members: None,
        })
    }

    async fn user_items<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        scope_id: &str,
        window: &DateWindow,
    ) -> Result<ScopedItems, ReportError> {
        let user_id = parse_id(scope_id, "user")?;
        let user = User::find_by_id(db, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;
        self.evaluator
            .require(actor, &Operation::UserReport { subject_id: user.id })?;

        let items = self
            .load_tasks(db, &ReportFilter::Participants(vec![user.id]), window)
            .await?;
        Ok(ScopedItems {
            name: user.username,
            items,
            members: None,
        })
    }

    async fn team_items<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &User,
        scope_id: &str,
        window: &DateWindow,
    ) -> Result<ScopedItems, ReportError> {
        let department = Department::from_str(scope_id.trim())
            .map_err(|_| DomainError::validation(format!("Unknown department: {scope_id}")))?;
        self.evaluator
            .require(actor, &Operation::TeamReport { department })?;

        let team = User::find_by_department(db, department).await?;
        let members: Vec<ReportMember> = team
            .iter()
            .map(|user| ReportMember {
                user_id: user.id,
                username: user.username.clone(),
            })
            .collect();
        let filter = ReportFilter::Participants(members.iter().map(|m| m.user_id).collect());

        let (start, end) = (window.start_instant(), window.end_instant());
        let total = Task::count_for_report(db, &filter, start, end).await?
            + Subtask::count_for_report(db, &filter, start, end).await?;
        let limit = self.ensure_within_limit(total)?;
        let tasks = Task::find_for_report(db, &filter, start, end, limit).await?;
        let subtasks = Subtask::find_for_report(db, &filter, start, end, limit).await?;
        let items = tasks
            .iter()
            .map(ItemSummary::from)
            .chain(subtasks.iter().map(ItemSummary::from))
            .collect();

        Ok(ScopedItems {
            name: department.to_string(),
            items,
            members: Some(members),
        })
    }

    /// Rejects scopes with more qualifying items than `reports.max_items`
    /// rather than reporting a partial total.
    fn ensure_within_limit(&self, qualifying: u64) -> Result<u64, DomainError> {
        let max_items = self.config.max_items as u64;
        if qualifying > max_items {
            tracing::warn!(qualifying, max_items, "Report scope over item limit");
            return Err(DomainError::validation(format!(
                "Report covers {qualifying} items, more than the limit of {max_items}; narrow the date range"
            )));
        }
        Ok(max_items)
    }

    async fn load_tasks<C: ConnectionTrait>(
        &self,
        db: &C,
        filter: &ReportFilter,
        window: &DateWindow,
    ) -> Result<Vec<ItemSummary>, ReportError> {
        let (start, end) = (window.start_instant(), window.end_instant());
        let qualifying = Task::count_for_report(db, filter, start, end).await?;
        let limit = self.ensure_within_limit(qualifying)?;
        let tasks = Task::find_for_report(db, filter, start, end, limit).await?;
        Ok(tasks.iter().map(ItemSummary::from).collect())
    }
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(raw.trim()).map_err(|_| DomainError::validation(format!("Invalid {what} id")))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use db::models::{
        subtask::CreateSubtask,
        task::{CreateTask, TaskChanges, TaskStatus},
        user::Role,
    };
    use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

    use super::*;
    use crate::services::test_support::{seed_project, seed_user, setup_db};

    #[derive(Default)]
    struct CountingRenderer {
        calls: AtomicUsize,
    }

    impl ReportRenderer for CountingRenderer {
        type Output = usize;

        fn content_type(&self) -> &'static str {
            "text/plain"
        }

        fn render(&self, report: &ReportData) -> Result<usize, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(report.aggregates.counts.total)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn backdate<C: ConnectionTrait>(db: &C, task_id: Uuid, at: DateTime<Utc>) {
        use db::entities::task;
        let model = task::Entity::find()
            .filter(task::Column::Uuid.eq(task_id))
            .one(db)
            .await
            .unwrap()
            .unwrap();
        let mut active: task::ActiveModel = model.into();
        active.created_at = Set(at.into());
        active.update(db).await.unwrap();
    }

    #[tokio::test]
    async fn empty_range_is_a_success_without_rendering() {
        let db = setup_db().await;
        let owner = seed_user(&db, "r1@example.com", &[Role::Manager], Department::Engineering).await;
        let project = seed_project(&db, &owner, "Spring").await;
        let task = Task::create(
            &db,
            &CreateTask::from_title(project.id, "March work"),
            owner.id,
            &[],
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        backdate(&db, task.id, date(2024, 3, 12).and_hms_opt(10, 0, 0).unwrap().and_utc()).await;

        let renderer = CountingRenderer::default();
        let outcome = ReportService::default()
            .generate(
                &db,
                &owner,
                &ReportRequest {
                    scope: ReportScope::Project,
                    scope_id: project.id.to_string(),
                    timeframe: Some(Timeframe::Week),
                    start: Some(date(2024, 1, 8)),
                    end: None,
                },
                &renderer,
            )
            .await
            .unwrap();

        match outcome {
            ReportOutcome::Empty { report, message } => {
                assert_eq!(message, EMPTY_REPORT_MESSAGE);
                assert!(report.data.to_do.is_empty());
                assert!(report.data.in_progress.is_empty());
                assert!(report.data.completed.is_empty());
                assert_eq!(report.aggregates.counts.total, 0);
            }
            ReportOutcome::Rendered { .. } => panic!("empty report must not render"),
        }
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn project_report_renders_buckets_as_json() {
        let db = setup_db().await;
        let owner = seed_user(&db, "r2@example.com", &[Role::Staff], Department::Design).await;
        let project = seed_project(&db, &owner, "Rebrand").await;
        for (title, status) in [
            ("a", TaskStatus::Todo),
            ("b", TaskStatus::Completed),
            ("c", TaskStatus::Blocked),
        ] {
            let task = Task::create(
                &db,
                &CreateTask::from_title(project.id, title),
                owner.id,
                &[],
                Uuid::new_v4(),
            )
            .await
            .unwrap();
            Task::update(
                &db,
                task.id,
                &TaskChanges {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let today = Utc::now().date_naive();
        let outcome = ReportService::default()
            .generate(
                &db,
                &owner,
                &ReportRequest {
                    scope: ReportScope::Project,
                    scope_id: project.id.to_string(),
                    timeframe: None,
                    start: Some(today),
                    end: Some(today),
                },
                &JsonReportRenderer,
            )
            .await
            .unwrap();

        let ReportOutcome::Rendered { output, .. } = outcome else {
            panic!("expected a rendered report");
        };
        assert_eq!(output["aggregates"]["total"], 2);
        assert_eq!(output["aggregates"]["To Do"], 1);
        assert_eq!(output["aggregates"]["Completed"], 1);
        assert_eq!(output["metadata"]["type"], "project");
        assert_eq!(output["metadata"]["scope_name"], "Rebrand");
        assert_eq!(output["data"]["In Progress"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn team_report_requires_manager_of_that_department() {
        let db = setup_db().await;
        let staff = seed_user(&db, "r3@example.com", &[Role::Staff], Department::Sales).await;
        let today = Utc::now().date_naive();
        let err = ReportService::default()
            .generate(
                &db,
                &staff,
                &ReportRequest {
                    scope: ReportScope::Team,
                    scope_id: "sales".to_string(),
                    timeframe: Some(Timeframe::Month),
                    start: Some(today),
                    end: None,
                },
                &JsonReportRenderer,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Domain(DomainError::Forbidden(_))));
    }

    fn today_request(scope: ReportScope, scope_id: String) -> ReportRequest {
        let today = Utc::now().date_naive();
        ReportRequest {
            scope,
            scope_id,
            timeframe: None,
            start: Some(today),
            end: Some(today),
        }
    }

    #[tokio::test]
    async fn scope_over_the_item_limit_is_rejected_not_truncated() {
        let db = setup_db().await;
        let owner = seed_user(&db, "r4@example.com", &[Role::Manager], Department::Finance).await;
        let project = seed_project(&db, &owner, "Busy").await;
        for title in ["a", "b", "c"] {
            Task::create(
                &db,
                &CreateTask::from_title(project.id, title),
                owner.id,
                &[],
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        }
        let request = today_request(ReportScope::Project, project.id.to_string());

        let capped = ReportService::new(CapabilityEvaluator::default(), ReportConfig { max_items: 2 });
        let err = capped
            .generate(&db, &owner, &request, &JsonReportRenderer)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Domain(DomainError::Validation(_))));

        let exact = ReportService::new(CapabilityEvaluator::default(), ReportConfig { max_items: 3 });
        let ReportOutcome::Rendered { report, .. } = exact
            .generate(&db, &owner, &request, &JsonReportRenderer)
            .await
            .unwrap()
        else {
            panic!("expected a rendered report");
        };
        assert_eq!(report.aggregates.counts.total, 3);
    }

    #[tokio::test]
    async fn team_report_loads_only_work_touching_the_department() {
        let db = setup_db().await;
        let lead = seed_user(&db, "r5@example.com", &[Role::Manager], Department::Sales).await;
        let rep = seed_user(&db, "r6@example.com", &[Role::Staff], Department::Sales).await;
        let outsider = seed_user(&db, "r7@example.com", &[Role::Staff], Department::Hr).await;
        let project = seed_project(&db, &outsider, "Mixed").await;

        let hr_only = Task::create(
            &db,
            &CreateTask::from_title(project.id, "hr only"),
            outsider.id,
            &[],
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        Task::create(
            &db,
            &CreateTask::from_title(project.id, "with sales"),
            outsider.id,
            &[rep.id],
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        Subtask::create(
            &db,
            &CreateSubtask::from_title(hr_only.id, "sales step"),
            rep.id,
            &[],
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let outcome = ReportService::default()
            .generate(
                &db,
                &lead,
                &today_request(ReportScope::Team, "sales".to_string()),
                &JsonReportRenderer,
            )
            .await
            .unwrap();
        let ReportOutcome::Rendered { report, .. } = outcome else {
            panic!("expected a rendered report");
        };
        assert_eq!(report.aggregates.counts.total, 2);
        let titles: Vec<_> = report.data.to_do.iter().map(|item| item.title.as_str()).collect();
        assert!(titles.contains(&"with sales"));
        assert!(titles.contains(&"sales step"));
        assert!(!titles.contains(&"hr only"));
    }
}
