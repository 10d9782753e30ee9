//! Scripted collaborators shared by the relay tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use motoasesor_core::channel::{Channel, InboundEvent, Presence};
use motoasesor_core::error::{ChannelError, ProviderError, StoreError};
use motoasesor_core::inventory::{InventoryRow, InventorySource};
use motoasesor_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use motoasesor_core::Turn;
use tokio::sync::{RwLock, mpsc};

pub fn sample_rows() -> Vec<InventoryRow> {
    vec![
        InventoryRow {
            id: 1,
            brand: "Honda".into(),
            model: "CB500F".into(),
            displacement_cc: 471,
            price: 6899.0,
            category: "Naked".into(),
            stock: 3,
        },
        InventoryRow {
            id: 2,
            brand: "Vespa".into(),
            model: "Primavera 125".into(),
            displacement_cc: 125,
            price: 4299.0,
            category: "Scooter".into(),
            stock: 5,
        },
    ]
}

/// Inventory that counts fetches and can be switched to failing.
pub struct CountingInventory {
    rows: RwLock<Vec<InventoryRow>>,
    fail: bool,
    fetches: AtomicUsize,
}

impl CountingInventory {
    pub fn new(rows: Vec<InventoryRow>) -> Self {
        Self {
            rows: RwLock::new(rows),
            fail: false,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub async fn set_rows(&self, rows: Vec<InventoryRow>) {
        *self.rows.write().await = rows;
    }
}

#[async_trait]
impl InventorySource for CountingInventory {
    fn name(&self) -> &str {
        "counting"
    }

    async fn fetch_available(&self) -> Result<Vec<InventoryRow>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(self.rows.read().await.clone())
    }
}

/// Provider that plays back queued results and records every request.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::ApiError {
                status_code: 500,
                message: "script exhausted".into(),
            }))?;

        Ok(ProviderResponse {
            turn: Turn::assistant(next),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "scripted".into(),
        })
    }
}

/// Something the router did through the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text { to: String, text: String },
    Presence { to: String, presence: Presence },
}

/// Channel that records outbound calls. Text sends can be made to fail.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<Sent>>,
    fail_text: bool,
    fail_presence: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_text() -> Self {
        Self {
            fail_text: true,
            ..Self::default()
        }
    }

    pub fn failing_presence() -> Self {
        Self {
            fail_presence: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { to, text } => Some((to, text)),
                Sent::Presence { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<mpsc::Receiver<Result<InboundEvent, ChannelError>>, ChannelError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push(Sent::Text {
            to: recipient.into(),
            text: text.into(),
        });
        if self.fail_text {
            return Err(ChannelError::SendFailed {
                recipient: recipient.into(),
                reason: "bridge returned 500".into(),
            });
        }
        Ok(())
    }

    async fn set_presence(&self, recipient: &str, presence: Presence) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push(Sent::Presence {
            to: recipient.into(),
            presence,
        });
        if self.fail_presence {
            return Err(ChannelError::ConnectionLost("presence rejected".into()));
        }
        Ok(())
    }
}
