use axum::{
    Extension, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Json as ResponseJson},
    routing::{delete, get, put},
};
use db::models::{notification::Notification, user::User};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use services::services::realtime::{SessionHandle, SessionRegistry};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiPath, ApiQuery},
};

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub async fn get_notifications(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiQuery(query): ApiQuery<InboxQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Notification>>>, ApiError> {
    let notifications = deployment
        .notifications()
        .list(&deployment.db().pool, &user, query.unread_only)
        .await?;
    Ok(ResponseJson(ApiResponse::success(notifications)))
}

pub async fn mark_notification_read(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(notification_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Notification>>, ApiError> {
    let notification = deployment
        .notifications()
        .mark_read(&deployment.db().pool, &user, notification_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(notification)))
}

pub async fn mark_all_notifications_read(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<MarkAllReadResponse>>, ApiError> {
    let updated = deployment
        .notifications()
        .mark_all_read(&deployment.db().pool, &user)
        .await?;
    Ok(ResponseJson(ApiResponse::success(MarkAllReadResponse {
        updated,
    })))
}

pub async fn delete_notification(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ApiPath(notification_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .notifications()
        .delete(&deployment.db().pool, &user, notification_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn stream_notifications_ws(
    ws: WebSocketUpgrade,
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_notifications_ws(socket, deployment, user.id).await {
            tracing::warn!(user_id = %user.id, "notifications WS closed: {}", e);
        }
    })
}

async fn handle_notifications_ws(
    socket: WebSocket,
    deployment: DeploymentImpl,
    user_id: Uuid,
) -> anyhow::Result<()> {
    let registry = deployment.registry().clone();
    let (handle, mut events) = SessionHandle::channel();
    let connection_id = handle.connection_id();
    registry.register(user_id, handle);
    tracing::debug!(%user_id, %connection_id, "Realtime session opened");

    let (mut sender, mut receiver) = socket.split();

    let result = async {
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let frame = serde_json::to_string(&event)?;
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                msg = receiver.next() => {
                    match msg {
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        // Client frames carry nothing we act on
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
        anyhow::Ok(())
    }
    .await;

    registry.unregister(user_id, connection_id);
    tracing::debug!(%user_id, %connection_id, "Realtime session closed");
    let _ = sender.close().await;
    result
}

pub fn router() -> Router<DeploymentImpl> {
    let notifications_router = Router::new()
        .route("/", get(get_notifications))
        .route("/read-all", put(mark_all_notifications_read))
        .route("/ws", get(stream_notifications_ws))
        .route("/{id}", delete(delete_notification))
        .route("/{id}/read", put(mark_notification_read));

    Router::new().nest("/notifications", notifications_router)
}
