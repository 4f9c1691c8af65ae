use axum::{
    Extension, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use chrono::NaiveDate;
use db::models::user::User;
use serde::Deserialize;
use serde_json::Value;
use services::services::report::{
    JsonReportRenderer, ReportOutcome, ReportRequest, ReportScope, Timeframe,
};
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiPath, ApiQuery},
};

#[derive(Debug, Default, Deserialize)]
pub struct ReportWindowQuery {
    pub timeframe: Option<Timeframe>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// An empty window is still a success; the envelope message says why there
/// is nothing to show.
pub async fn get_report(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath((scope, scope_id)): ApiPath<(ReportScope, String)>,
    ApiQuery(query): ApiQuery<ReportWindowQuery>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let request = ReportRequest {
        scope,
        scope_id,
        timeframe: query.timeframe,
        start: query.start,
        end: query.end,
    };
    let outcome = deployment
        .reports()
        .generate(&deployment.db().pool, &user, &request, &JsonReportRenderer)
        .await?;

    match outcome {
        ReportOutcome::Empty { report, message } => {
            let data = serde_json::to_value(&report)
                .map_err(|err| ApiError::Internal(err.to_string()))?;
            Ok(ResponseJson(ApiResponse::success_with_message(data, message)))
        }
        ReportOutcome::Rendered { output, .. } => Ok(ResponseJson(ApiResponse::success(output))),
    }
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/reports/{scope}/{id}", get(get_report))
}
