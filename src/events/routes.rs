use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::events::handlers::SyncOutcome;
use crate::events::registry::{dispatch, Event, SyncFunction, APP_ID, FUNCTIONS};
use crate::events::signature::SIGNATURE_HEADER;
use crate::state::AppState;

pub const EVENTS_PATH: &str = "/api/inngest";

pub fn router() -> Router<AppState> {
    Router::new().route(EVENTS_PATH, get(introspect).post(invoke))
}

#[derive(Debug, Serialize)]
pub struct Trigger {
    pub event: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FunctionInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub triggers: Vec<Trigger>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Introspection {
    pub app_id: &'static str,
    pub function_count: usize,
    pub has_signing_key: bool,
    pub functions: Vec<FunctionInfo>,
}

async fn introspect(State(state): State<AppState>) -> Json<Introspection> {
    let functions = FUNCTIONS
        .iter()
        .map(|f| FunctionInfo {
            id: f.id,
            name: f.name,
            triggers: vec![Trigger { event: f.event }],
        })
        .collect::<Vec<_>>();

    Json(Introspection {
        app_id: APP_ID,
        function_count: functions.len(),
        has_signing_key: state.signing_key.is_some(),
        functions,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct InvokeParams {
    #[serde(rename = "fnId")]
    pub fn_id: Option<String>,
}

/// Invocation envelope; the runtime sends more fields than we read.
#[derive(Debug, Deserialize)]
struct Invocation {
    event: Event,
}

async fn invoke(
    State(state): State<AppState>,
    Query(params): Query<InvokeParams>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<SyncOutcome>> {
    if let Some(key) = state.signing_key.as_ref() {
        let header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        key.verify(&body, header, chrono::Utc::now().timestamp())
            .map_err(|e| {
                tracing::warn!("Rejected event delivery: {}", e);
                AppError::Unauthorized(e.to_string())
            })?;
    }

    let invocation: Invocation = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid event envelope: {}", e)))?;
    let event = invocation.event;

    // A targeted invocation must name a function triggered by this event.
    if let Some(fn_id) = params.fn_id.as_deref() {
        let function = SyncFunction::by_id(fn_id)
            .ok_or_else(|| AppError::NotFound(format!("Function {}", fn_id)))?;
        if function.event != event.name {
            return Err(AppError::InvalidInput(format!(
                "Function {} is not triggered by {}",
                fn_id, event.name
            )));
        }
    }

    let outcome = dispatch(state.store.as_ref(), state.sync_options, &event).await?;
    Ok(Json(outcome))
}
