//! Session store — per-identity conversation histories.
//!
//! Each identity owns a slot guarded by an async mutex. [`SessionStore::get_or_create`]
//! hands out the slot's guard as a [`SessionLease`], so at most one message per
//! identity is being answered at a time. Arrival order is kept by the router,
//! which hands each identity's messages to a single worker.
//!
//! Capacity is bounded: past `max_sessions` the least recently used identity
//! that is not currently leased is evicted. Each session keeps at most
//! `max_exchanges` real exchanges after the opening pair.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use motoasesor_config::SessionConfig;
use motoasesor_core::{InventorySource, Turn};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::catalog::{NO_INVENTORY, format_catalog};
use crate::prompt::Persona;

/// Number of synthetic turns every session starts with.
pub const OPENING_TURNS: usize = 2;

/// Store limits. Zero `max_exchanges` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub max_exchanges: usize,
    pub catalog_refresh: Option<Duration>,
}

impl SessionLimits {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            max_sessions: config.max_sessions.max(1),
            max_exchanges: config.max_exchanges,
            catalog_refresh: config
                .catalog_refresh_minutes
                .filter(|m| *m > 0)
                .map(|m| Duration::from_secs(m * 60)),
        }
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

/// One conversation: the opening pair followed by real exchanges.
#[derive(Debug, Clone, Default)]
pub struct Session {
    turns: Vec<Turn>,
    catalog_rows: usize,
    catalog_built_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Real user/assistant exchanges after the opening pair.
    pub fn exchanges(&self) -> usize {
        self.turns.len().saturating_sub(OPENING_TURNS) / 2
    }

    /// Rows in the catalog the session was opened (or last refreshed) with.
    pub fn catalog_rows(&self) -> usize {
        self.catalog_rows
    }

    fn is_seeded(&self) -> bool {
        !self.turns.is_empty()
    }

    fn push_exchange(&mut self, user_text: &str, assistant_text: &str, max_exchanges: usize) {
        self.turns.push(Turn::user(user_text));
        self.turns.push(Turn::assistant(assistant_text));

        if max_exchanges > 0 {
            while self.exchanges() > max_exchanges {
                // Oldest real exchange, as a pair.
                self.turns.drain(OPENING_TURNS..OPENING_TURNS + 2);
            }
        }
    }
}

type Slot = Arc<Mutex<Session>>;

struct Entry {
    slot: Slot,
    last_used: u64,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<String, Entry>,
    clock: u64,
}

impl Registry {
    /// Look up or insert the slot for `identity`, marking it most recently used.
    fn checkout(&mut self, identity: &str, max_sessions: usize) -> Slot {
        self.clock += 1;
        let now = self.clock;

        if let Some(entry) = self.entries.get_mut(identity) {
            entry.last_used = now;
            return entry.slot.clone();
        }

        while self.entries.len() >= max_sessions {
            if !self.evict_one() {
                warn!(
                    sessions = self.entries.len(),
                    max_sessions, "Every session is busy; exceeding capacity"
                );
                break;
            }
        }

        let slot: Slot = Arc::new(Mutex::new(Session::default()));
        self.entries.insert(
            identity.to_string(),
            Entry {
                slot: slot.clone(),
                last_used: now,
            },
        );
        slot
    }

    /// Drop the least recently used slot nobody else holds.
    fn evict_one(&mut self) -> bool {
        let victim = self
            .entries
            .iter()
            .filter(|(_, e)| Arc::strong_count(&e.slot) == 1)
            .min_by_key(|(_, e)| e.last_used)
            .map(|(id, _)| id.clone());

        match victim {
            Some(identity) => {
                self.entries.remove(&identity);
                debug!(identity = %identity, "Evicted least recently used session");
                true
            }
            None => false,
        }
    }
}

/// Exclusive access to one identity's session.
///
/// Holding the lease blocks other messages from the same identity. Dropping
/// it releases them.
pub struct SessionLease {
    identity: String,
    guard: OwnedMutexGuard<Session>,
    created: bool,
    max_exchanges: usize,
}

impl SessionLease {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Whether this call opened the session.
    pub fn is_new(&self) -> bool {
        self.created
    }

    pub fn session(&self) -> &Session {
        &self.guard
    }

    pub fn turns(&self) -> &[Turn] {
        self.guard.turns()
    }

    /// Record a user turn and the reply to it.
    pub fn append_exchange(&mut self, user_text: &str, assistant_text: &str) {
        self.guard
            .push_exchange(user_text, assistant_text, self.max_exchanges);
    }
}

/// Process-wide map from identity to conversation.
pub struct SessionStore {
    inventory: Arc<dyn InventorySource>,
    persona: Persona,
    limits: SessionLimits,
    registry: Mutex<Registry>,
}

impl SessionStore {
    pub fn new(inventory: Arc<dyn InventorySource>, persona: Persona, limits: SessionLimits) -> Self {
        Self {
            inventory,
            persona,
            limits,
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Fetch the catalog and render it. A failing store degrades to the
    /// no-inventory sentence.
    async fn current_catalog(&self, identity: &str) -> (String, usize) {
        match self.inventory.fetch_available().await {
            Ok(rows) => (format_catalog(&rows), rows.len()),
            Err(e) => {
                warn!(
                    identity = %identity,
                    store = %self.inventory.name(),
                    "Inventory unavailable, opening without catalog: {e}"
                );
                (NO_INVENTORY.to_string(), 0)
            }
        }
    }

    /// Lease the session for `identity`, opening it if needed.
    ///
    /// A new session fetches the inventory once and is seeded with the
    /// opening prompt and the acknowledgment. An existing session is returned
    /// unchanged, except that its catalog is rebuilt when a refresh interval
    /// is configured and has elapsed.
    pub async fn get_or_create(&self, identity: &str) -> SessionLease {
        let slot = self
            .registry
            .lock()
            .await
            .checkout(identity, self.limits.max_sessions);
        let mut guard = slot.lock_owned().await;

        let created = !guard.is_seeded();
        if created {
            let (catalog, rows) = self.current_catalog(identity).await;
            guard.turns = vec![
                Turn::user(self.persona.opening_prompt(&catalog)),
                Turn::assistant(self.persona.acknowledgment.clone()),
            ];
            guard.catalog_rows = rows;
            guard.catalog_built_at = Some(Utc::now());
            info!(identity = %identity, catalog_rows = rows, "Session created");
        } else if self.catalog_is_stale(&guard) {
            let (catalog, rows) = self.current_catalog(identity).await;
            guard.turns[0] = Turn::user(self.persona.opening_prompt(&catalog));
            guard.catalog_rows = rows;
            guard.catalog_built_at = Some(Utc::now());
            debug!(identity = %identity, catalog_rows = rows, "Session catalog refreshed");
        }

        SessionLease {
            identity: identity.to_string(),
            guard,
            created,
            max_exchanges: self.limits.max_exchanges,
        }
    }

    fn catalog_is_stale(&self, session: &Session) -> bool {
        let (Some(interval), Some(built)) = (self.limits.catalog_refresh, session.catalog_built_at)
        else {
            return false;
        };
        chrono::Duration::from_std(interval)
            .map(|interval| Utc::now() - built >= interval)
            .unwrap_or(false)
    }

    /// Append a user turn and a reply to an existing session.
    ///
    /// Returns `false` (and changes nothing) if the identity has no session.
    /// Waits for the identity's lease, so it must not be called by the
    /// holder of that lease; use [`SessionLease::append_exchange`] there.
    pub async fn append_exchange(&self, identity: &str, user_text: &str, assistant_text: &str) -> bool {
        let Some(slot) = self.slot(identity).await else {
            return false;
        };
        let mut session = slot.lock().await;
        if !session.is_seeded() {
            return false;
        }
        session.push_exchange(user_text, assistant_text, self.limits.max_exchanges);
        true
    }

    async fn slot(&self, identity: &str) -> Option<Slot> {
        self.registry
            .lock()
            .await
            .entries
            .get(identity)
            .map(|e| e.slot.clone())
    }

    /// Copy of an identity's turns. Waits for an in-flight reply to finish.
    pub async fn snapshot(&self, identity: &str) -> Option<Vec<Turn>> {
        let slot = self.slot(identity).await?;
        let session = slot.lock().await;
        session.is_seeded().then(|| session.turns.clone())
    }

    pub async fn contains(&self, identity: &str) -> bool {
        self.registry.lock().await.entries.contains_key(identity)
    }

    /// Number of tracked identities.
    pub async fn len(&self) -> usize {
        self.registry.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Forget every session. Leases already handed out stay valid but are
    /// detached from the store.
    pub async fn reset(&self) {
        let mut registry = self.registry.lock().await;
        registry.entries.clear();
        registry.clock = 0;
    }
}
