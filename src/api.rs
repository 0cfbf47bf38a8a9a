//! HTTP adapter for the ledger chat agent
//!
//! Exposes the agent over a JSON endpoint and a form-encoded messaging
//! webhook that answers with TwiML.

use axum::{
    extract::{Form, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::Agent;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageRequest {
    pub owner_id: String,
    pub text: String,
}

/// Fields posted by the messaging provider
#[derive(Debug, Deserialize)]
pub struct WebhookForm {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageReply {
    pub owner_id: String,
    pub reply: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<Agent>,
}

/// =============================
/// Helpers
/// =============================

/// Wrap a reply in a TwiML message document
pub fn twiml_message(reply: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escape(reply)
    )
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Message Endpoints
/// =============================

async fn message_handler(
    State(state): State<ApiState>,
    Json(req): Json<MessageRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let owner_id = req.owner_id.trim();
    if owner_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("owner_id is required".into())),
        );
    }

    info!(owner_id = %owner_id, "Inbound API message");
    let reply = state.agent.handle(owner_id, &req.text).await;

    (
        StatusCode::OK,
        Json(ApiResponse::success(MessageReply {
            owner_id: owner_id.to_string(),
            reply,
        })),
    )
}

async fn webhook_handler(
    State(state): State<ApiState>,
    Form(form): Form<WebhookForm>,
) -> impl IntoResponse {
    let owner_id = form.from.trim();
    if owner_id.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing From").into_response();
    }

    info!(owner_id = %owner_id, "Inbound webhook message");
    let reply = state.agent.handle(owner_id, &form.body).await;

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        twiml_message(&reply),
    )
        .into_response()
}

/// =============================
/// Router
/// =============================

pub fn create_router(agent: Arc<Agent>) -> Router {
    let state = ApiState { agent };

    Router::new()
        .route("/health", get(health))
        .route("/api/message", post(message_handler))
        .route("/whatsapp", post(webhook_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    agent: Arc<Agent>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(agent);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
