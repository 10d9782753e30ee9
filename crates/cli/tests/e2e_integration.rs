//! End-to-end tests for the MotoAsesor relay.
//!
//! A webhook is posted to the gateway, the router consults the catalog and a
//! scripted model, and the reply lands on a mock WhatsApp bridge served over
//! real HTTP.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower::ServiceExt;

use motoasesor_channels::WhatsAppChannel;
use motoasesor_config::{AppConfig, WhatsAppConfig};
use motoasesor_core::error::ProviderError;
use motoasesor_core::event::{DomainEvent, EventBus};
use motoasesor_core::message::{Role, Turn};
use motoasesor_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use motoasesor_core::Channel;
use motoasesor_gateway::{GatewayState, build_router};
use motoasesor_inventory::{StaticInventory, demo_catalog};
use motoasesor_relay::{APOLOGY, MessageRouter, OPENING_TURNS};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that plays back scripted replies and keeps every request.
struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn text(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedProvider exhausted")?;
        Ok(ProviderResponse {
            turn: Turn::assistant(next),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock".into(),
        })
    }
}

// ── Mock WhatsApp bridge ─────────────────────────────────────────────────

type Calls = Arc<Mutex<Vec<(String, Value)>>>;

/// Records `sendText` and `sendPresence` calls the way the bridge would receive them.
struct MockBridge {
    url: String,
    calls: Calls,
}

impl MockBridge {
    async fn spawn() -> Self {
        async fn record(
            State(calls): State<Calls>,
            Path((action, _instance)): Path<(String, String)>,
            Json(body): Json<Value>,
        ) -> (StatusCode, Json<Value>) {
            calls.lock().unwrap().push((action, body));
            (StatusCode::CREATED, Json(json!({"status": "PENDING"})))
        }

        let calls: Calls = Arc::default();
        let app = Router::new()
            .route("/message/{action}/{instance}", post(record))
            .route("/chat/{action}/{instance}", post(record))
            .with_state(calls.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            calls,
        }
    }

    fn texts(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(action, _)| action == "sendText")
            .map(|(_, body)| {
                (
                    body["number"].as_str().unwrap_or_default().to_string(),
                    body["text"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    fn presences(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(action, _)| action == "sendPresence")
            .map(|(_, body)| body["presence"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Relay {
    app: Router,
    whatsapp: Arc<WhatsAppChannel>,
    router: Arc<MessageRouter>,
    relay: tokio::task::JoinHandle<()>,
}

impl Relay {
    async fn start(bridge: &MockBridge, provider: Arc<ScriptedProvider>, events: Arc<EventBus>) -> Self {
        let config = AppConfig {
            whatsapp: WhatsAppConfig {
                api_url: bridge.url.clone(),
                webhook_token: Some("hook-secret".into()),
                ..WhatsAppConfig::default()
            },
            ..AppConfig::default()
        };

        let whatsapp = Arc::new(WhatsAppChannel::new(config.whatsapp.clone()));
        let inventory = Arc::new(StaticInventory::from_listings(&demo_catalog()));
        let router = motoasesor_relay::assemble(&config, inventory, provider, whatsapp.clone(), events);

        let rx = whatsapp.start().await.unwrap();
        let relay = tokio::spawn(Arc::clone(&router).run(rx));
        let app = build_router(Arc::new(GatewayState {
            whatsapp: whatsapp.clone(),
            store: Arc::clone(router.store()),
        }));

        Self {
            app,
            whatsapp,
            router,
            relay,
        }
    }

    async fn post(&self, payload: Value) -> StatusCode {
        let req = Request::builder()
            .method("POST")
            .uri("/webhook/whatsapp")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();
        self.app.clone().oneshot(req).await.unwrap().status()
    }

    /// Close the event stream and wait for every in-flight message.
    async fn finish(self) -> Arc<MessageRouter> {
        self.whatsapp.stop().await.unwrap();
        self.relay.await.unwrap();
        self.router
    }
}

fn upsert(jid: &str, text: &str) -> Value {
    json!({
        "event": "messages.upsert",
        "instance": "motoasesor",
        "apikey": "hook-secret",
        "data": {
            "key": {"remoteJid": jid, "fromMe": false, "id": "3EB0"},
            "pushName": "Lucía",
            "message": {"conversation": text},
            "messageType": "conversation"
        }
    })
}

const CUSTOMER: &str = "5215512345678@s.whatsapp.net";

// ── E2E: webhook to bridge ───────────────────────────────────────────────

#[tokio::test]
async fn e2e_first_message_opens_session_and_replies() {
    let bridge = MockBridge::spawn().await;
    let provider = Arc::new(ScriptedProvider::text(&[
        "¡Hola Lucía! Para ciudad te recomiendo la Vespa Primavera 125.",
    ]));
    let relay = Relay::start(&bridge, provider.clone(), Arc::new(EventBus::default())).await;

    let status = relay.post(upsert(CUSTOMER, "Busco algo para la ciudad")).await;
    assert_eq!(status, StatusCode::OK);
    let router = relay.finish().await;

    assert_eq!(
        bridge.texts(),
        vec![(
            CUSTOMER.to_string(),
            "¡Hola Lucía! Para ciudad te recomiendo la Vespa Primavera 125.".to_string()
        )]
    );
    assert_eq!(bridge.presences(), vec!["composing", "paused"]);

    // The model saw the opening pair with the live catalog, then the question.
    let request = provider.request(0);
    assert_eq!(request.turns.len(), OPENING_TURNS + 1);
    assert_eq!(request.turns[0].role, Role::User);
    assert!(request.turns[0].content.contains("| 5 | Vespa | Primavera 125 | 125cc | $4299.00 | Scooter | 5 |"));
    assert!(!request.turns[0].content.contains("Panigale"));
    assert_eq!(request.turns[1].role, Role::Assistant);
    assert_eq!(request.turns[2].content, "Busco algo para la ciudad");

    let turns = router.store().snapshot(CUSTOMER).await.unwrap();
    assert_eq!(turns.len(), OPENING_TURNS + 2);
    assert_eq!(turns[3].role, Role::Assistant);
}

#[tokio::test]
async fn e2e_follow_up_carries_history() {
    let bridge = MockBridge::spawn().await;
    let provider = Arc::new(ScriptedProvider::text(&[
        "Tenemos la Honda CB500F y la Yamaha MT-07.",
        "La MT-07 cuesta $8999.00.",
    ]));
    let relay = Relay::start(&bridge, provider.clone(), Arc::new(EventBus::default())).await;

    assert_eq!(relay.post(upsert(CUSTOMER, "¿Qué naked tienen?")).await, StatusCode::OK);
    // Wait for the first reply so the second message sees it in history.
    while bridge.texts().is_empty() {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(relay.post(upsert(CUSTOMER, "¿Cuánto cuesta la MT-07?")).await, StatusCode::OK);
    relay.finish().await;

    assert_eq!(provider.calls(), 2);
    let second = provider.request(1);
    assert_eq!(second.turns.len(), OPENING_TURNS + 3);
    assert_eq!(second.turns[3].content, "Tenemos la Honda CB500F y la Yamaha MT-07.");
    assert_eq!(second.turns[4].content, "¿Cuánto cuesta la MT-07?");
    assert_eq!(bridge.texts()[1].1, "La MT-07 cuesta $8999.00.");
}

#[tokio::test]
async fn e2e_generation_failure_sends_apology() {
    let bridge = MockBridge::spawn().await;
    let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::RateLimited {
        retry_after_secs: 30,
    })]));
    let events = Arc::new(EventBus::default());
    let mut subscriber = events.subscribe();
    let relay = Relay::start(&bridge, provider.clone(), events).await;

    relay.post(upsert(CUSTOMER, "hola")).await;
    let router = relay.finish().await;

    assert_eq!(bridge.texts(), vec![(CUSTOMER.to_string(), APOLOGY.to_string())]);
    // Typing indicator is left as is after a failure.
    assert_eq!(bridge.presences(), vec!["composing"]);
    // History holds only the opening pair.
    assert_eq!(router.store().snapshot(CUSTOMER).await.unwrap().len(), OPENING_TURNS);

    let mut saw_failure = false;
    while let Ok(event) = subscriber.try_recv() {
        if matches!(*event, DomainEvent::GenerationFailed { .. }) {
            saw_failure = true;
        }
    }
    assert!(saw_failure);
}

#[tokio::test]
async fn e2e_groups_and_own_messages_are_ignored() {
    let bridge = MockBridge::spawn().await;
    let provider = Arc::new(ScriptedProvider::text(&[]));
    let relay = Relay::start(&bridge, provider.clone(), Arc::new(EventBus::default())).await;

    relay.post(upsert("120363025246125486@g.us", "hola grupo")).await;
    relay.post(upsert("status@broadcast", "estado")).await;
    let mut own = upsert(CUSTOMER, "mensaje del vendedor");
    own["data"]["key"]["fromMe"] = json!(true);
    relay.post(own).await;
    let router = relay.finish().await;

    assert_eq!(provider.calls(), 0);
    assert!(bridge.calls.lock().unwrap().is_empty());
    assert!(router.store().is_empty().await);
}

#[tokio::test]
async fn e2e_webhook_token_is_enforced() {
    let bridge = MockBridge::spawn().await;
    let provider = Arc::new(ScriptedProvider::text(&[]));
    let relay = Relay::start(&bridge, provider.clone(), Arc::new(EventBus::default())).await;

    let mut forged = upsert(CUSTOMER, "hola");
    forged["apikey"] = json!("wrong");
    assert_eq!(relay.post(forged).await, StatusCode::UNAUTHORIZED);
    relay.finish().await;

    assert_eq!(provider.calls(), 0);
}
