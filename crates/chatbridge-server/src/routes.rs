//! REST routes over the helper bridge.
//!
//! Callers see a generic "operation failed" distinguishing only
//! transport-unavailable (503), timeout (504), and helper-reported error
//! (502); registry bookkeeping never surfaces here.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chatbridge_helper::transport::Transport;
use chatbridge_helper::{HelperClient, HelperError, TransactionRegistry};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<HelperClient>,
    pub registry: Arc<TransactionRegistry>,
    pub transport: Arc<dyn Transport>,
}

/// Build the REST router.
pub fn build_router(state: AppState, cors_enabled: bool) -> Router {
    let router = Router::new()
        .route("/api/v1/ping", get(ping))
        .route("/api/v1/status", get(status))
        .route("/api/v1/facetime/answer", post(answer_call))
        .route("/api/v1/facetime/leave", post(leave_call))
        .route("/api/v1/facetime/admit", post(admit_participant))
        .route("/api/v1/facetime/link", post(create_call_link))
        .route("/api/v1/chat/participant/add", post(add_participant))
        .route("/api/v1/chat/participant/remove", post(remove_participant))
        .route("/api/v1/chat/leave", post(leave_chat))
        .route("/api/v1/chat/rename", post(rename_chat))
        .route("/api/v1/chat/read", post(mark_chat_read))
        .route("/api/v1/chat/typing", post(set_typing))
        .route("/api/v1/message/send", post(send_message))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// Helper failure mapped to an HTTP response.
pub struct ApiFailure(pub HelperError);

impl From<HelperError> for ApiFailure {
    fn from(error: HelperError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let (code, kind) = match &self.0 {
            HelperError::TransportUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "transport_unavailable")
            }
            HelperError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            HelperError::Helper(_) => (StatusCode::BAD_GATEWAY, "helper_error"),
            HelperError::Cancelled | HelperError::ChannelClosed => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        let body = Json(json!({
            "status": "error",
            "kind": kind,
            "error": self.0.to_string(),
        }));
        (code, body).into_response()
    }
}

fn ok(data: Value) -> Json<Value> {
    Json(json!({ "status": "ok", "data": data }))
}

// ── Request bodies ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallBody {
    call_uuid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdmitBody {
    conversation_uuid: String,
    handle_uuid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantBody {
    chat_guid: String,
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody {
    chat_guid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameBody {
    chat_guid: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypingBody {
    chat_guid: String,
    typing: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageBody {
    chat_guid: String,
    message: String,
    temp_guid: String,
}

// ── Handlers ───────────────────────────────────────────────────────────

async fn ping(State(state): State<AppState>) -> Result<Json<Value>, ApiFailure> {
    state.client.ping().await?;
    Ok(ok(Value::Null))
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "data": {
            "helper_connected": state.transport.is_connected(),
            "transactions": state.registry.snapshot(),
        }
    }))
}

async fn answer_call(
    State(state): State<AppState>,
    Json(body): Json<CallBody>,
) -> Result<Json<Value>, ApiFailure> {
    let payload = state.client.answer_call(&body.call_uuid).await?;
    Ok(ok(payload))
}

async fn leave_call(
    State(state): State<AppState>,
    Json(body): Json<CallBody>,
) -> Result<Json<Value>, ApiFailure> {
    state.client.leave_call(&body.call_uuid).await?;
    Ok(ok(Value::Null))
}

async fn admit_participant(
    State(state): State<AppState>,
    Json(body): Json<AdmitBody>,
) -> Result<Json<Value>, ApiFailure> {
    let payload = state
        .client
        .admit_participant(&body.conversation_uuid, &body.handle_uuid)
        .await?;
    Ok(ok(payload))
}

async fn create_call_link(State(state): State<AppState>) -> Result<Json<Value>, ApiFailure> {
    let payload = state.client.create_call_link().await?;
    Ok(ok(payload))
}

async fn add_participant(
    State(state): State<AppState>,
    Json(body): Json<ParticipantBody>,
) -> Result<Json<Value>, ApiFailure> {
    let payload = state
        .client
        .add_participant(&body.chat_guid, &body.address)
        .await?;
    Ok(ok(payload))
}

async fn remove_participant(
    State(state): State<AppState>,
    Json(body): Json<ParticipantBody>,
) -> Result<Json<Value>, ApiFailure> {
    let payload = state
        .client
        .remove_participant(&body.chat_guid, &body.address)
        .await?;
    Ok(ok(payload))
}

async fn leave_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<Value>, ApiFailure> {
    state.client.leave_chat(&body.chat_guid).await?;
    Ok(ok(Value::Null))
}

async fn rename_chat(
    State(state): State<AppState>,
    Json(body): Json<RenameBody>,
) -> Result<Json<Value>, ApiFailure> {
    state.client.rename_chat(&body.chat_guid, &body.name).await?;
    Ok(ok(Value::Null))
}

async fn mark_chat_read(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<Value>, ApiFailure> {
    state.client.mark_chat_read(&body.chat_guid).await?;
    Ok(ok(Value::Null))
}

async fn set_typing(
    State(state): State<AppState>,
    Json(body): Json<TypingBody>,
) -> Result<Json<Value>, ApiFailure> {
    if body.typing {
        state.client.send_typing(&body.chat_guid).await?;
    } else {
        state.client.stop_typing(&body.chat_guid).await?;
    }
    Ok(ok(Value::Null))
}

async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<Value>, ApiFailure> {
    let payload = state
        .client
        .send_message(&body.chat_guid, &body.message, &body.temp_guid)
        .await?;
    Ok(ok(payload))
}
