use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use url::form_urlencoded;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, middleware::model_loaders::load_session_user};

/// Bearer token of the authenticated request, available to handlers as an
/// extension next to the session's `User`.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn extract_query_token(req: &Request) -> Option<String> {
    let query = req.uri().query()?;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key == "token" {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            return Some(trimmed.to_string());
        }
    }
    None
}

fn is_websocket_request(req: &Request) -> bool {
    req.headers()
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"))
}

fn extract_request_token(req: &Request) -> Option<String> {
    // 1) Authorization: Bearer <token>
    if let Some(value) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
    {
        return Some(value.to_string());
    }

    // 2) X-API-Token: <token>
    if let Some(value) = req
        .headers()
        .get("x-api-token")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return Some(value.to_string());
    }

    // 3) Browsers cannot set headers on a WebSocket handshake
    if is_websocket_request(req) {
        return extract_query_token(req);
    }

    None
}

fn unauthorized(req: &Request, reason: &'static str) -> Response {
    tracing::warn!(
        path = %req.uri().path(),
        method = %req.method(),
        reason,
        "Unauthorized API request"
    );
    let response = ApiResponse::<()>::error_with_kind("authentication_error", "Unauthorized");
    (StatusCode::UNAUTHORIZED, Json(response)).into_response()
}

pub async fn require_session(
    State(deployment): State<DeploymentImpl>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_request_token(&req) else {
        return unauthorized(&req, "missing_token");
    };
    let Some(user_id) = deployment.sessions().resolve(&token) else {
        return unauthorized(&req, "unknown_token");
    };

    let user = match load_session_user(&deployment, user_id).await {
        Ok(user) => user,
        Err(StatusCode::NOT_FOUND) => {
            deployment.sessions().revoke(&token);
            return unauthorized(&req, "user_deleted");
        }
        Err(status) => {
            let response = ApiResponse::<()>::error_with_kind(
                "database_error",
                "Failed to load the session user",
            );
            return (status, Json(response)).into_response();
        }
    };

    req.extensions_mut().insert(user);
    req.extensions_mut().insert(SessionToken(token));
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request(builder: axum::http::request::Builder) -> Request {
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn bearer_header_wins_over_other_sources() {
        let req = request(
            Request::builder()
                .uri("/notifications/ws?token=query")
                .header(header::AUTHORIZATION, "bearer  abc ")
                .header("x-api-token", "header")
                .header(header::UPGRADE, "websocket"),
        );
        assert_eq!(extract_request_token(&req).as_deref(), Some("abc"));
    }

    #[test]
    fn query_token_is_only_read_for_websocket_upgrades() {
        let plain = request(Request::builder().uri("/tasks?token=abc"));
        assert_eq!(extract_request_token(&plain), None);

        let upgrade = request(
            Request::builder()
                .uri("/notifications/ws?token=abc")
                .header(header::UPGRADE, "WebSocket"),
        );
        assert_eq!(extract_request_token(&upgrade).as_deref(), Some("abc"));
    }

    #[test]
    fn malformed_authorization_headers_are_ignored() {
        assert_eq!(parse_authorization_bearer("Basic abc"), None);
        assert_eq!(parse_authorization_bearer("Bearer   "), None);
        assert_eq!(parse_authorization_bearer("token"), None);
    }
}
