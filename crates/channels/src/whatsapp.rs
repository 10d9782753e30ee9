//! WhatsApp channel adapter over an Evolution-API-style bridge.
//!
//! The bridge owns the WhatsApp Web session (credentials, QR pairing,
//! reconnects). MotoAsesor only sees two surfaces:
//! - inbound webhooks (`messages.upsert`, `connection.update`,
//!   `qrcode.updated`), handed to [`WhatsAppChannel::handle_webhook`] by the
//!   gateway
//! - outbound REST calls for text and presence

use async_trait::async_trait;
use motoasesor_config::WhatsAppConfig;
use motoasesor_core::channel::{Channel, EventKind, InboundEvent, InboundMessage, Presence};
use motoasesor_core::error::ChannelError;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What a webhook delivery amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A message batch was forwarded to the router
    Queued { messages: usize },
    /// The bridge reported a connection state change
    Connection { state: String },
    /// A new pairing QR code is waiting to be scanned on the bridge
    QrCodePending,
    /// Event the relay does not act on
    Ignored { event: String },
}

/// WhatsApp channel adapter.
pub struct WhatsAppChannel {
    config: WhatsAppConfig,
    client: reqwest::Client,
    connected: AtomicBool,
    inject_tx: tokio::sync::Mutex<Option<mpsc::Sender<Result<InboundEvent, ChannelError>>>>,
}

impl WhatsAppChannel {
    pub fn new(config: WhatsAppConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config: WhatsAppConfig {
                api_url: config.api_url.trim_end_matches('/').to_string(),
                ..config
            },
            client,
            connected: AtomicBool::new(false),
            inject_tx: tokio::sync::Mutex::new(None),
        }
    }

    /// Last connection state seen from the bridge.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.config.api_url, path, self.config.instance_name)
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("apikey", key),
            None => request,
        }
    }

    /// Check the payload's `apikey` against the configured webhook token.
    pub fn verify_token(&self, payload: &Value) -> bool {
        match &self.config.webhook_token {
            None => true,
            Some(token) if token.is_empty() => true,
            Some(token) => payload["apikey"].as_str() == Some(token.as_str()),
        }
    }

    /// Inject an event into the running stream (used by webhooks and tests).
    pub async fn inject_event(&self, event: InboundEvent) -> Result<(), ChannelError> {
        let guard = self.inject_tx.lock().await;
        if let Some(tx) = guard.as_ref() {
            tx.send(Ok(event))
                .await
                .map_err(|_| ChannelError::ConnectionLost("Event channel closed".into()))
        } else {
            Err(ChannelError::ConnectionLost(
                "WhatsApp channel not started".into(),
            ))
        }
    }

    /// Process one webhook delivery.
    ///
    /// `path_event` is the event name taken from the URL when the bridge is
    /// configured to post each event to its own path; the payload's `event`
    /// field wins when present.
    pub async fn handle_webhook(
        &self,
        path_event: Option<&str>,
        payload: &Value,
    ) -> Result<WebhookOutcome, ChannelError> {
        if !self.verify_token(payload) {
            return Err(ChannelError::InvalidPayload("webhook token mismatch".into()));
        }

        let event = payload["event"]
            .as_str()
            .or(path_event)
            .map(normalize_event_name)
            .unwrap_or_default();

        match event.as_str() {
            "messages.upsert" => {
                let Some(inbound) = parse_upsert(payload) else {
                    return Ok(WebhookOutcome::Ignored { event });
                };
                let messages = inbound.messages.len();
                self.inject_event(inbound).await?;
                Ok(WebhookOutcome::Queued { messages })
            }
            "connection.update" => {
                let state = payload["data"]["state"].as_str().unwrap_or("unknown").to_string();
                let open = state == "open" || state == "connected";
                self.connected.store(open, Ordering::Relaxed);
                if open {
                    info!("WhatsApp connection confirmed by bridge");
                } else {
                    warn!(state = %state, "WhatsApp connection is not open");
                }
                Ok(WebhookOutcome::Connection { state })
            }
            "qrcode.updated" => {
                info!(
                    instance = %self.config.instance_name,
                    "WhatsApp pairing QR code is waiting on the bridge; scan it from the phone"
                );
                Ok(WebhookOutcome::QrCodePending)
            }
            _ => {
                debug!(event = %event, "Ignoring bridge event");
                Ok(WebhookOutcome::Ignored { event })
            }
        }
    }
}

/// `MESSAGES_UPSERT` and `messages-upsert` both mean `messages.upsert`.
pub fn normalize_event_name(name: &str) -> String {
    name.trim().to_lowercase().replace(['_', '-'], ".")
}

fn parse_message(msg: &Value) -> Option<InboundMessage> {
    let key = &msg["key"];
    let remote_jid = key["remoteJid"].as_str()?.to_string();

    let text = msg["message"]["conversation"]
        .as_str()
        .or_else(|| msg["message"]["extendedTextMessage"]["text"].as_str())
        .map(String::from);

    Some(InboundMessage {
        remote_jid,
        from_me: key["fromMe"].as_bool().unwrap_or(false),
        push_name: msg["pushName"].as_str().map(String::from),
        text,
        id: key["id"].as_str().map(String::from),
    })
}

/// Parse a `messages.upsert` payload into an inbound event.
///
/// `data` may hold a single message or an array of them. Messages without a
/// `remoteJid` cannot be answered and are dropped here. Returns `None` when
/// nothing usable remains.
pub fn parse_upsert(payload: &Value) -> Option<InboundEvent> {
    let data = &payload["data"];
    let raw: Vec<&Value> = match data.as_array() {
        Some(arr) => arr.iter().collect(),
        None if data.is_object() => vec![data],
        None => Vec::new(),
    };

    let messages: Vec<InboundMessage> = raw.into_iter().filter_map(parse_message).collect();
    if messages.is_empty() {
        return None;
    }

    // Evolution puts the upsert kind on each message; Baileys on the event.
    let kind = data["type"]
        .as_str()
        .or_else(|| data[0]["type"].as_str())
        .or_else(|| payload["type"].as_str())
        .map(EventKind::parse)
        .unwrap_or(EventKind::Notify);

    Some(InboundEvent { kind, messages })
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<InboundEvent, ChannelError>>, ChannelError> {
        info!(
            bridge = %self.config.api_url,
            instance = %self.config.instance_name,
            "WhatsApp channel starting"
        );
        let (tx, rx) = mpsc::channel(64);
        *self.inject_tx.lock().await = Some(tx);
        Ok(rx)
    }

    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        let body = json!({
            "number": recipient,
            "text": text,
        });
        self.post("message/sendText", recipient, &body).await
    }

    async fn set_presence(&self, recipient: &str, presence: Presence) -> Result<(), ChannelError> {
        let body = json!({
            "number": recipient,
            "presence": presence.as_str(),
            "delay": 0,
        });
        self.post("chat/sendPresence", recipient, &body).await
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        // Dropping the sender ends the router's stream.
        self.inject_tx.lock().await.take();
        info!("WhatsApp channel stopped");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        let response = self
            .with_key(self.client.get(self.endpoint("instance/connectionState")))
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionLost(e.to_string()))?;

        if !response.status().is_success() {
            self.connected.store(false, Ordering::Relaxed);
            return Ok(false);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChannelError::InvalidPayload(e.to_string()))?;
        let state = body["instance"]["state"]
            .as_str()
            .or_else(|| body["state"].as_str())
            .unwrap_or("");
        let open = state == "open" || state == "connected";
        self.connected.store(open, Ordering::Relaxed);
        Ok(open)
    }
}

impl WhatsAppChannel {
    async fn post(&self, path: &str, recipient: &str, body: &Value) -> Result<(), ChannelError> {
        let send_failed = |reason: String| ChannelError::SendFailed {
            recipient: recipient.to_string(),
            reason,
        };

        let response = self
            .with_key(self.client.post(self.endpoint(path)))
            .json(body)
            .send()
            .await
            .map_err(|e| send_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(send_failed(format!("bridge returned {status}: {error_body}")));
        }
        Ok(())
    }
}
