use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::auth::session::{cookie_value, SESSION_COOKIE, STATE_COOKIE};
use crate::auth::token::GoogleClaims;
use crate::state::AppState;

/// Routes mounted under `/auth`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/google", get(google_login))
        .route("/google/callback", get(google_callback))
        .route("/logout", post(logout))
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn failure(state: &AppState) -> Response {
    (
        AppendHeaders([(SET_COOKIE, state.sessions.clear_state_cookie())]),
        Redirect::to(&state.config.failure_redirect_url()),
    )
        .into_response()
}

async fn google_login(State(state): State<AppState>) -> Response {
    let Some(google) = state.google.as_ref() else {
        tracing::warn!("Google login requested but Google OAuth is not configured");
        return failure(&state);
    };

    let nonce = uuid::Uuid::new_v4().to_string();
    (
        AppendHeaders([(SET_COOKIE, state.sessions.state_cookie(&nonce))]),
        Redirect::to(&google.authorization_url(&nonce)),
    )
        .into_response()
}

async fn google_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let Some(google) = state.google.as_ref() else {
        tracing::warn!("Google callback received but Google OAuth is not configured");
        return failure(&state);
    };

    if let Some(error) = params.error.as_deref() {
        tracing::warn!("Google login failed: {}", error);
        return failure(&state);
    }

    let (Some(code), Some(returned_state)) = (params.code.as_deref(), params.state.as_deref())
    else {
        tracing::warn!("Google callback missing code or state");
        return failure(&state);
    };

    if cookie_value(&headers, STATE_COOKIE).as_deref() != Some(returned_state) {
        tracing::warn!("Google callback state mismatch");
        return failure(&state);
    }

    match google.exchange_code(code).await {
        Ok(claims) => complete_login(&state, &claims).await,
        Err(e) => {
            tracing::warn!("Google login failed: {}", e);
            failure(&state)
        }
    }
}

/// Establishes the local session for a verified Google identity and picks the
/// landing page: the user's first workspace when one is known.
pub async fn complete_login(state: &AppState, claims: &GoogleClaims) -> Response {
    let token = match state.sessions.issue(claims) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to issue session for {}: {}", claims.email, e);
            return failure(state);
        }
    };

    let target = match landing_workspace(state, &claims.email).await {
        Some(workspace_id) => format!(
            "{}/workspace/{}",
            state.config.frontend_origin,
            urlencoding::encode(&workspace_id)
        ),
        None => state.config.success_redirect_url(),
    };

    tracing::info!("Google login succeeded for {}", claims.email);
    (
        AppendHeaders([
            (SET_COOKIE, state.sessions.session_cookie(&token)),
            (SET_COOKIE, state.sessions.clear_state_cookie()),
        ]),
        Redirect::to(&target),
    )
        .into_response()
}

async fn landing_workspace(state: &AppState, email: &str) -> Option<String> {
    let user = match state.store.find_user_by_email(email).await {
        Ok(user) => user?,
        Err(e) => {
            tracing::warn!("User lookup for {} failed: {}", email, e);
            return None;
        }
    };

    match state.store.first_workspace_for_user(&user.id).await {
        Ok(workspace_id) => workspace_id,
        Err(e) => {
            tracing::warn!("Workspace lookup for {} failed: {}", user.id, e);
            None
        }
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = cookie_value(&headers, SESSION_COOKIE) {
        match state.sessions.validate(&token) {
            Ok(session) => tracing::info!("User {} logged out", session.email),
            Err(e) => tracing::debug!("Logout with stale session: {}", e),
        }
    }

    (
        AppendHeaders([(SET_COOKIE, state.sessions.clear_session_cookie())]),
        Json(json!({ "message": "Logged out successfully" })),
    )
}
