use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use teamsync::auth::{complete_login, GoogleClaims};
use teamsync::events::SigningKey;
use teamsync::server::build_router;
use teamsync::store::{IdentityStore, MemoryIdentityStore};
use teamsync::{AppState, Config};

const FAILURE_URL: &str = "https://app.example.com/google/oauth/callback?status=failure";
const SIGNING_KEY: &str = "signkey-test-0f1e2d3c4b5a69788796a5b4c3d2e1f0";

fn config(extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("DATABASE_URL", "postgres://localhost/teamsync_test"),
        ("SESSION_SECRET", "integration-secret"),
        ("FRONTEND_ORIGIN", "https://app.example.com"),
        ("GOOGLE_CLIENT_ID", "client-123.apps.googleusercontent.com"),
        ("GOOGLE_CLIENT_SECRET", "google-secret"),
        ("GOOGLE_CALLBACK_URL", "http://localhost:8000/auth/google/callback"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    Config::from_lookup(|name| vars.get(name).cloned()).unwrap()
}

fn app_with(extra: &[(&str, &str)]) -> (Router, MemoryIdentityStore, AppState) {
    let store = MemoryIdentityStore::new();
    let state = AppState::new(config(extra), Arc::new(store.clone())).unwrap();
    (build_router(state.clone()), store, state)
}

fn app() -> (Router, MemoryIdentityStore) {
    let (router, store, _) = app_with(&[]);
    (router, store)
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

fn event_request(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn deliver(router: &Router, name: &str, data: Value) -> Response<Body> {
    let body = json!({ "event": { "name": name, "data": data } });
    router
        .clone()
        .oneshot(event_request("/api/inngest", &body))
        .await
        .unwrap()
}

async fn get(router: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn ada() -> Value {
    json!({
        "id": "user_ada",
        "email_addresses": [{"email_address": "ada@example.com"}],
        "first_name": "Ada",
        "last_name": "Lovelace",
        "image_url": "https://img.example.com/ada.png"
    })
}

#[tokio::test]
async fn google_login_redirects_to_provider_with_state_cookie() {
    let (router, _) = app();
    let response = get(&router, "/auth/google", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    assert!(target.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
    assert!(target.contains("scope=profile%20email"));

    let cookies = set_cookies(&response);
    let state_cookie = cookies
        .iter()
        .find(|c| c.starts_with("oauth_state="))
        .expect("state cookie");
    let nonce = state_cookie
        .trim_start_matches("oauth_state=")
        .split(';')
        .next()
        .unwrap();
    assert!(target.contains(&format!("state={}", nonce)));
}

#[tokio::test]
async fn callback_without_provider_response_redirects_to_failure() {
    let (router, _) = app();
    let response = get(&router, "/auth/google/callback", None).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), FAILURE_URL);
}

#[tokio::test]
async fn callback_with_provider_error_redirects_to_failure() {
    let (router, _) = app();
    let response = get(
        &router,
        "/auth/google/callback?error=access_denied&state=abc",
        Some("oauth_state=abc"),
    )
    .await;
    assert_eq!(location(&response), FAILURE_URL);
}

#[tokio::test]
async fn callback_with_mismatched_state_redirects_to_failure() {
    let (router, _) = app();
    let response = get(
        &router,
        "/auth/google/callback?code=4%2F0Adeu5B&state=forged",
        Some("oauth_state=expected"),
    )
    .await;
    assert_eq!(location(&response), FAILURE_URL);
    assert!(set_cookies(&response)
        .iter()
        .any(|c| c.starts_with("oauth_state=;") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn google_login_without_configuration_redirects_to_failure() {
    let store = MemoryIdentityStore::new();
    let mut config = config(&[]);
    config.google = None;
    let router = build_router(AppState::new(config, Arc::new(store)).unwrap());

    let response = get(&router, "/auth/google", None).await;
    assert_eq!(location(&response), FAILURE_URL);
}

#[tokio::test]
async fn completed_login_lands_in_first_workspace() {
    let (router, store, state) = app_with(&[]);
    deliver(&router, "clerk/user.created", ada()).await;
    deliver(
        &router,
        "clerk/workspace.created",
        json!({"id": "org_engines", "name": "Engines", "slug": "engines", "created_by": "user_ada"}),
    )
    .await;
    assert!(store.workspace("org_engines").await.is_some());

    let claims = GoogleClaims {
        sub: "google-sub-1".to_string(),
        email: "ADA@example.com".to_string(),
        name: Some("Ada Lovelace".to_string()),
        picture: None,
    };
    let response = complete_login(&state, &claims).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "https://app.example.com/workspace/org_engines"
    );

    let session = set_cookies(&response)
        .into_iter()
        .find(|c| c.starts_with("session="))
        .expect("session cookie");
    let token = session
        .trim_start_matches("session=")
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert_eq!(state.sessions.validate(&token).unwrap().sub, "google-sub-1");
}

#[tokio::test]
async fn completed_login_for_unknown_user_reports_success() {
    let (_, _, state) = app_with(&[]);
    let claims = GoogleClaims {
        sub: "google-sub-2".to_string(),
        email: "nobody@example.com".to_string(),
        name: None,
        picture: None,
    };
    let response = complete_login(&state, &claims).await;
    assert_eq!(
        location(&response),
        "https://app.example.com/google/oauth/callback?status=success"
    );
}

#[tokio::test]
async fn logout_clears_session_cookie() {
    let (router, _) = app();
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(header::COOKIE, "session=stale-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response)
        .iter()
        .any(|c| c.starts_with("session=;") && c.contains("Max-Age=0")));
    assert_eq!(
        json_body(response).await,
        json!({"message": "Logged out successfully"})
    );
}

#[tokio::test]
async fn introspection_lists_every_function() {
    let (router, _) = app();
    let response = get(&router, "/api/inngest", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["appId"], "TeamSync");
    assert_eq!(body["functionCount"], 7);
    assert_eq!(body["hasSigningKey"], false);
    let events: Vec<&str> = body["functions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["triggers"][0]["event"].as_str().unwrap())
        .collect();
    assert!(events.contains(&"clerk/organizationInvitation.accepted"));
}

#[tokio::test]
async fn user_and_workspace_lifecycle() {
    let (router, store) = app();

    let response = deliver(&router, "clerk/user.created", ada()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"success": true, "userId": "user_ada"})
    );
    let user = store.user("user_ada").await.unwrap();
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.name, "Ada Lovelace");

    let response = deliver(
        &router,
        "clerk/workspace.created",
        json!({
            "id": "org_engines",
            "name": "Analytical Engines",
            "slug": "engines",
            "created_by": "user_ada",
            "image_url": ""
        }),
    )
    .await;
    assert_eq!(
        json_body(response).await,
        json!({"success": true, "workspaceId": "org_engines"})
    );

    let invitation =
        json!({"user_id": "user_babbage", "organization_id": "org_engines", "role_name": "member"});
    let response = deliver(
        &router,
        "clerk/organizationInvitation.accepted",
        invitation.clone(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = deliver(
        &router,
        "clerk/user.created",
        json!({"id": "user_babbage", "first_name": "Charles", "last_name": "Babbage"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = deliver(&router, "clerk/organizationInvitation.accepted", invitation).await;
    assert_eq!(
        json_body(response).await,
        json!({"success": true, "workspaceId": "org_engines", "userId": "user_babbage"})
    );

    let members = store.members_of("org_engines").await;
    let roles: Vec<(&str, &str)> = members
        .iter()
        .map(|m| (m.user_id.as_str(), m.role.as_str()))
        .collect();
    assert_eq!(roles, vec![("user_ada", "ADMIN"), ("user_babbage", "MEMBER")]);

    let response = deliver(
        &router,
        "clerk/organization.deleted",
        json!({"id": "org_engines"}),
    )
    .await;
    assert_eq!(
        json_body(response).await,
        json!({"success": true, "deletedWorkspaceId": "org_engines"})
    );
    assert!(store.members_of("org_engines").await.is_empty());

    let response = deliver(&router, "clerk/user.deleted", json!({"id": "user_ada"})).await;
    assert_eq!(
        json_body(response).await,
        json!({"success": true, "deletedUserId": "user_ada"})
    );
    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn duplicate_workspace_is_conflict() {
    let (router, _) = app();
    deliver(&router, "clerk/user.created", ada()).await;
    let org = json!({"id": "org_1", "name": "One", "slug": "one", "created_by": "user_ada"});
    let response = deliver(&router, "clerk/workspace.created", org.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = deliver(&router, "clerk/workspace.created", org).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["error"], "conflict");
}

#[tokio::test]
async fn deleting_missing_user_depends_on_mode() {
    let (lenient, _) = app();
    let response = deliver(&lenient, "clerk/user.deleted", json!({"id": "user_gone"})).await;
    assert_eq!(response.status(), StatusCode::OK);

    let (strict, _, _) = app_with(&[("USER_DELETE_MODE", "strict")]);
    let response = deliver(&strict, "clerk/user.deleted", json!({"id": "user_gone"})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_and_mistargeted_events_are_rejected() {
    let (router, _) = app();

    let response = deliver(&router, "clerk/session.created", json!({"id": "sess_1"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "unknown_event");

    let body = json!({"event": {"name": "clerk/user.created", "data": ada()}});
    let response = router
        .clone()
        .oneshot(event_request(
            "/api/inngest?fnId=sync-workspace-from-clerk",
            &body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(event_request("/api/inngest?fnId=no-such-function", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .clone()
        .oneshot(event_request("/api/inngest?fnId=sync-user-from-clerk", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn signed_deliveries_are_verified() {
    let (router, store, _) = app_with(&[("INNGEST_SIGNING_KEY", SIGNING_KEY)]);
    let body = json!({"event": {"name": "clerk/user.created", "data": ada()}});

    let response = router
        .clone()
        .oneshot(event_request("/api/inngest", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(store.user_count().await, 0);

    let raw = body.to_string();
    let signature = SigningKey::new(SIGNING_KEY).sign(raw.as_bytes(), chrono::Utc::now().timestamp());
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/inngest")
                .header(header::CONTENT_TYPE, "application/json")
                .header("X-Inngest-Signature", signature)
                .body(Body::from(raw))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.user("user_ada").await.is_some());
}

#[tokio::test]
async fn health_reports_ok() {
    let (router, store) = app();
    store.ping().await.unwrap();
    let response = get(&router, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "ok"}));
}
