//! The MotoAsesor conversation relay.
//!
//! Inbound chat messages flow through the [`MessageRouter`], which keeps one
//! [`SessionStore`] conversation per identity, opens each conversation with
//! the advisor persona plus the live catalog, and asks the
//! [`CompletionClient`] for every reply.

pub mod catalog;
pub mod completion;
pub mod prompt;
pub mod router;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use catalog::{NO_INVENTORY, format_catalog};
pub use completion::{Completion, CompletionClient};
pub use prompt::{ACKNOWLEDGMENT, APOLOGY, Persona, SYSTEM_PREAMBLE, build_opening};
pub use router::{MessageRouter, Outcome, Skip, screen};
pub use session::{OPENING_TURNS, Session, SessionLease, SessionLimits, SessionStore};

use std::sync::Arc;

use motoasesor_config::AppConfig;
use motoasesor_core::{Channel, EventBus, InventorySource, Provider};

/// Wire a router from configuration and already-built collaborators.
pub fn assemble(
    config: &AppConfig,
    inventory: Arc<dyn InventorySource>,
    provider: Arc<dyn Provider>,
    channel: Arc<dyn Channel>,
    events: Arc<EventBus>,
) -> Arc<MessageRouter> {
    let store = Arc::new(SessionStore::new(
        inventory,
        Persona::from_config(&config.persona),
        SessionLimits::from_config(&config.session),
    ));
    let completion = CompletionClient::from_config(provider, config);
    Arc::new(MessageRouter::new(store, completion, channel, events))
}
