use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::trace::TraceLayer;

use crate::{DeploymentImpl, routes};

mod auth;

pub use auth::SessionToken;

pub fn router(deployment: DeploymentImpl) -> Router {
    let protected_routes = Router::new()
        .merge(routes::auth::router())
        .merge(routes::projects::router())
        .merge(routes::tasks::router())
        .merge(routes::subtasks::router())
        .merge(routes::notifications::router())
        .merge(routes::reports::router())
        .layer(from_fn_with_state(
            deployment.clone(),
            auth::require_session,
        ));

    let api_routes = Router::new()
        .merge(routes::auth::public_router())
        .merge(protected_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{DeploymentImpl, test_support::IsolatedEnv};

    async fn setup_deployment() -> (IsolatedEnv, DeploymentImpl) {
        let env = IsolatedEnv::new();
        let deployment = env.deployment().await;
        (env, deployment)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    /// Registers a user and returns `(user_id, token)`.
    async fn sign_up(app: &Router, username: &str, roles: &[&str], department: &str) -> (String, String) {
        let (status, _) = send(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "username": username,
                "password": "password123",
                "roles": roles,
                "department": department,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(
            app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": username, "password": "password123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let user_id = json["data"]["user"]["id"].as_str().unwrap().to_string();
        let token = json["data"]["token"].as_str().unwrap().to_string();
        (user_id, token)
    }

    #[tokio::test]
    async fn health_is_public() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let (status, json) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn api_requires_a_session() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let (status, json) = send(&app, Method::GET, "/api/projects", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Unauthorized");

        let (status, _) = send(&app, Method::GET, "/api/projects", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_login_me_and_logout() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let (user_id, token) = sign_up(&app, "ana@example.com", &["staff"], "engineering").await;

        let (status, json) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["id"], user_id.as_str());
        assert!(json["data"].get("password_hash").is_none());

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "username": "ana@example.com",
                "password": "password123",
                "roles": ["staff"],
                "department": "engineering",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error_kind"], "conflict");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "ana@example.com", "password": "nope-nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_input_uses_the_error_envelope() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);
        let (_, token) = sign_up(&app, "bo@example.com", &["staff"], "design").await;

        let (status, json) =
            send(&app, Method::GET, "/api/tasks/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_kind"], "validation_error");

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/projects",
            Some(&token),
            Some(json!({"name": "Launch", "priority": 11})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error_kind"], "validation_error");

        let (status, json) = send(
            &app,
            Method::GET,
            &format!("/api/projects/{}", Uuid::new_v4()),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error_kind"], "not_found");
    }

    #[tokio::test]
    async fn task_flow_notifies_assignees_and_hides_tasks_from_outsiders() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);
        let (_, owner) = sign_up(&app, "own@example.com", &["manager"], "product").await;
        let (assignee_id, assignee) =
            sign_up(&app, "cy@example.com", &["staff"], "product").await;
        let (_, outsider) = sign_up(&app, "out@example.com", &["staff"], "sales").await;

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/projects",
            Some(&owner),
            Some(json!({"name": "Launch"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let project_id = json["data"]["id"].as_str().unwrap().to_string();

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/tasks",
            Some(&owner),
            Some(json!({
                "project_id": project_id,
                "title": "Write brief",
                "assignees": [assignee_id],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let task_id = json["data"]["id"].as_str().unwrap().to_string();

        let (status, json) =
            send(&app, Method::GET, "/api/notifications", Some(&assignee), None).await;
        assert_eq!(status, StatusCode::OK);
        let inbox = json["data"].as_array().unwrap();
        assert_eq!(inbox.len(), 1);
        let notification_id = inbox[0]["id"].as_str().unwrap().to_string();

        let (status, json) = send(
            &app,
            Method::PUT,
            &format!("/api/notifications/{notification_id}/read"),
            Some(&assignee),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["read"], true);

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/notifications/{notification_id}"),
            Some(&outsider),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let task_uri = format!("/api/tasks/{task_id}");
        let (status, _) = send(&app, Method::GET, &task_uri, Some(&assignee), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, json) = send(&app, Method::GET, &task_uri, Some(&outsider), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error_kind"], "authorization_error");

        let (status, json) = send(
            &app,
            Method::POST,
            &format!("{task_uri}/comments"),
            Some(&assignee),
            Some(json!({"text": "On it"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["comments"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_report_is_a_success_with_message() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);
        let (user_id, token) = sign_up(&app, "dee@example.com", &["staff"], "hr").await;

        let (status, json) = send(
            &app,
            Method::GET,
            &format!("/api/reports/user/{user_id}?start=2020-01-01&end=2020-01-31"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(
            json["message"],
            services::services::report::EMPTY_REPORT_MESSAGE
        );
    }

    #[tokio::test]
    async fn websocket_upgrade_requires_token() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);
        let (_, token) = sign_up(&app, "ws@example.com", &["staff"], "finance").await;

        let make_ws_request = |uri: String| {
            Request::builder()
                .method("GET")
                .uri(uri)
                .version(axum::http::Version::HTTP_11)
                .header(header::HOST, "localhost")
                .header(header::CONNECTION, "Upgrade")
                .header(header::UPGRADE, "websocket")
                .header("sec-websocket-version", "13")
                .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
                .body(Body::empty())
                .unwrap()
        };

        let response = app
            .clone()
            .oneshot(make_ws_request("/api/notifications/ws".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(make_ws_request(format!("/api/notifications/ws?token={token}")))
            .await
            .unwrap();

        // `oneshot` requests lack Hyper's `OnUpgrade` extension, so axum answers
        // 426 once auth has passed.
        assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
    }
}
