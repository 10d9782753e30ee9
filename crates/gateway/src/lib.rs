//! HTTP gateway for MotoAsesor.
//!
//! Receives the WhatsApp bridge's webhooks and exposes a health probe. Every
//! accepted message batch is handed to the relay's message router through the
//! WhatsApp channel's event stream.
//!
//! Built on Axum.

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use motoasesor_channels::{WebhookOutcome, WhatsAppChannel};
use motoasesor_config::AppConfig;
use motoasesor_core::{Channel, ChannelError, EventBus};
use motoasesor_relay::SessionStore;

/// Bridge payloads may carry inline media; anything larger is refused.
const MAX_WEBHOOK_BYTES: usize = 4 * 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub whatsapp: Arc<WhatsAppChannel>,
    pub store: Arc<SessionStore>,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/webhook/whatsapp", post(webhook_handler))
        .route("/webhook/whatsapp/{event}", post(webhook_event_handler))
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BYTES))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server and the relay behind it.
///
/// Runs until Ctrl-C, then stops the channel and waits for in-flight
/// conversations to finish.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let inventory = motoasesor_inventory::connect(&config.inventory).await?;
    let providers = motoasesor_providers::build_from_config(&config);
    let provider = providers
        .default()
        .ok_or("No default provider configured; set an API key")?;

    let events = Arc::new(EventBus::default());
    let whatsapp = Arc::new(WhatsAppChannel::new(config.whatsapp.clone()));
    let router = motoasesor_relay::assemble(&config, inventory, provider, whatsapp.clone(), events);

    let rx = whatsapp.start().await?;
    let relay = tokio::spawn(Arc::clone(&router).run(rx));

    let state = Arc::new(GatewayState {
        whatsapp: whatsapp.clone(),
        store: Arc::clone(router.store()),
    });
    let app = build_router(state);

    info!(addr = %addr, bridge = %config.whatsapp.api_url, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    whatsapp.stop().await?;
    relay.await?;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
    }
    info!("Shutdown requested");
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sessions: usize,
    whatsapp_connected: bool,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.store.len().await,
        whatsapp_connected: state.whatsapp.is_connected(),
    })
}

#[derive(Debug, Serialize)]
struct WebhookResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    messages: Option<usize>,
}

impl From<WebhookOutcome> for WebhookResponse {
    fn from(outcome: WebhookOutcome) -> Self {
        match outcome {
            WebhookOutcome::Queued { messages } => Self {
                status: "queued",
                event: None,
                messages: Some(messages),
            },
            WebhookOutcome::Connection { state } => Self {
                status: "connection",
                event: Some(state),
                messages: None,
            },
            WebhookOutcome::QrCodePending => Self {
                status: "qrcode",
                event: None,
                messages: None,
            },
            WebhookOutcome::Ignored { event } => Self {
                status: "ignored",
                event: Some(event),
                messages: None,
            },
        }
    }
}

async fn webhook_handler(
    State(state): State<SharedState>,
    Json(payload): Json<Value>,
) -> Result<Json<WebhookResponse>, StatusCode> {
    dispatch(&state, None, &payload).await
}

async fn webhook_event_handler(
    State(state): State<SharedState>,
    Path(event): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<WebhookResponse>, StatusCode> {
    dispatch(&state, Some(&event), &payload).await
}

async fn dispatch(
    state: &GatewayState,
    path_event: Option<&str>,
    payload: &Value,
) -> Result<Json<WebhookResponse>, StatusCode> {
    match state.whatsapp.handle_webhook(path_event, payload).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(ChannelError::InvalidPayload(reason)) => {
            warn!(reason = %reason, "Rejected webhook");
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e) => {
            error!(error = %e, "Webhook could not be processed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
