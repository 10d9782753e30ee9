//! # MotoAsesor Core
//!
//! Domain types, traits, and error definitions for the MotoAsesor relay.
//! This crate has **no I/O of its own**; it defines the domain model that
//! every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here:
//! - [`Provider`] — the completion backend ("generate a reply for this history")
//! - [`Channel`] — the chat transport ("deliver events in, send text out")
//! - [`InventorySource`] — the catalog store ("fetch available rows")
//!
//! Implementations live in their respective crates, so the relay can be
//! exercised end to end against in-process stubs.

pub mod error;
pub mod message;
pub mod provider;
pub mod channel;
pub mod inventory;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{ChannelError, Error, GenerationError, ProviderError, Result, StoreError};
pub use message::{Role, Turn};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use channel::{Channel, EventKind, InboundEvent, InboundMessage, Presence};
pub use inventory::{InventoryRow, InventorySource};
pub use event::{DomainEvent, EventBus};
