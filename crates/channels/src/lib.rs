//! Chat transports for MotoAsesor.
//!
//! Each channel connects to a messaging surface and relays events to and
//! from the message router.
//!
//! Available channels:
//! - **WhatsApp** — Evolution-API-style bridge (webhooks in, REST out)
//! - **CLI** — Interactive terminal chat (stdin/stdout)

pub mod cli;
pub mod whatsapp;

pub use cli::{CliChannel, LOCAL_IDENTITY};
pub use whatsapp::{WebhookOutcome, WhatsAppChannel, parse_upsert};
