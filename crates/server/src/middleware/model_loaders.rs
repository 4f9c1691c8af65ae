use std::{fmt::Display, future::Future};

use axum::http::StatusCode;
use db::{DBService, models::user::User};
use uuid::Uuid;

use crate::DeploymentImpl;

pub trait ModelLoaderDeps {
    fn db_service(&self) -> &DBService;
}

impl ModelLoaderDeps for DeploymentImpl {
    fn db_service(&self) -> &DBService {
        self.db()
    }
}

pub async fn fetch_model_or_status<M, E, Fut>(
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<M, StatusCode>
where
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    match load_future.await {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            tracing::warn!("{model_name} {model_id} not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(error) => {
            tracing::error!("Failed to fetch {model_name} {model_id}: {error}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Loads the user a session token points at.
pub async fn load_session_user<S>(deps: &S, user_id: Uuid) -> Result<User, StatusCode>
where
    S: ModelLoaderDeps,
{
    fetch_model_or_status(
        "User",
        user_id,
        User::find_by_id(&deps.db_service().pool, user_id),
    )
    .await
}
