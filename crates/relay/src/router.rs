//! Message router — one pass per inbound message, from filter to reply.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use motoasesor_core::channel::{Channel, EventKind, InboundEvent, InboundMessage, Presence};
use motoasesor_core::error::ChannelError;
use motoasesor_core::event::{DomainEvent, EventBus};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::completion::CompletionClient;
use crate::session::SessionStore;

const PREVIEW_CHARS: usize = 40;

/// Messages waiting per identity. An entry exists while that identity's
/// worker is running.
type Queues = Arc<Mutex<HashMap<String, VecDeque<(EventKind, InboundMessage)>>>>;

/// Why a message was not answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// The event is a history sync or append, not a new notification
    NotNotify,
    /// Sent by the bot's own account
    FromSelf,
    MissingIdentity,
    Group,
    Broadcast,
    /// Media, sticker, reaction or blank text
    NoText,
}

/// What the router did with one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(Skip),
    /// A generated reply was recorded; `delivered` is false if the send failed
    Replied {
        identity: String,
        reply: String,
        delivered: bool,
    },
    /// Generation failed and the apology was sent instead
    Apologized { identity: String, delivered: bool },
}

/// Decide whether a message is answerable. Returns the identity and body.
pub fn screen<'a>(kind: &EventKind, message: &'a InboundMessage) -> Result<(&'a str, &'a str), Skip> {
    if *kind != EventKind::Notify {
        return Err(Skip::NotNotify);
    }
    if message.from_me {
        return Err(Skip::FromSelf);
    }
    if message.remote_jid.trim().is_empty() {
        return Err(Skip::MissingIdentity);
    }
    if message.is_group() {
        return Err(Skip::Group);
    }
    if message.is_broadcast() {
        return Err(Skip::Broadcast);
    }
    let body = message.body().ok_or(Skip::NoText)?;
    Ok((message.remote_jid.as_str(), body))
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Drives session store, completion client and channel for every message.
pub struct MessageRouter {
    store: Arc<SessionStore>,
    completion: CompletionClient,
    channel: Arc<dyn Channel>,
    events: Arc<EventBus>,
}

impl MessageRouter {
    pub fn new(
        store: Arc<SessionStore>,
        completion: CompletionClient,
        channel: Arc<dyn Channel>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            completion,
            channel,
            events,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Handle every message of an event, in order.
    pub async fn handle_event(&self, event: &InboundEvent) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(event.messages.len());
        for message in &event.messages {
            outcomes.push(self.handle_message(&event.kind, message).await);
        }
        outcomes
    }

    /// Filter, generate and reply to one message. Never retries.
    pub async fn handle_message(&self, kind: &EventKind, message: &InboundMessage) -> Outcome {
        let (identity, body) = match screen(kind, message) {
            Ok(accepted) => accepted,
            Err(skip) => {
                debug!(jid = %message.remote_jid, reason = ?skip, "Skipping message");
                return Outcome::Skipped(skip);
            }
        };

        info!(
            identity = %identity,
            name = message.push_name.as_deref().unwrap_or(""),
            chars = body.chars().count(),
            "Message received"
        );
        self.events.publish(DomainEvent::MessageReceived {
            identity: identity.to_string(),
            content_preview: preview(body),
            timestamp: Utc::now(),
        });

        let mut lease = self.store.get_or_create(identity).await;
        if lease.is_new() {
            self.events.publish(DomainEvent::SessionCreated {
                identity: identity.to_string(),
                catalog_rows: lease.session().catalog_rows(),
                timestamp: Utc::now(),
            });
        }

        self.presence(identity, Presence::Composing).await;

        let result = self.completion.complete(lease.turns(), body).await;
        match result {
            Ok(completion) => {
                lease.append_exchange(body, &completion.text);
                self.presence(identity, Presence::Paused).await;

                let delivered = self.deliver(identity, &completion.text).await;
                if delivered {
                    self.events.publish(DomainEvent::ReplySent {
                        identity: identity.to_string(),
                        model: completion.model,
                        tokens_used: completion.usage.map(|u| u.total_tokens).unwrap_or(0),
                        timestamp: Utc::now(),
                    });
                }
                Outcome::Replied {
                    identity: identity.to_string(),
                    reply: completion.text,
                    delivered,
                }
            }
            Err(e) => {
                warn!(identity = %identity, "Generation failed, sending apology: {e}");
                self.events.publish(DomainEvent::GenerationFailed {
                    identity: identity.to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });

                let apology = self.store.persona().apology.clone();
                let delivered = self.deliver(identity, &apology).await;
                Outcome::Apologized {
                    identity: identity.to_string(),
                    delivered,
                }
            }
        }
    }

    async fn presence(&self, identity: &str, presence: Presence) {
        if let Err(e) = self.channel.set_presence(identity, presence).await {
            debug!(identity = %identity, presence = presence.as_str(), "Presence update failed: {e}");
        }
    }

    async fn deliver(&self, identity: &str, text: &str) -> bool {
        match self.channel.send_text(identity, text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(identity = %identity, channel = %self.channel.name(), "Send failed: {e}");
                self.events.publish(DomainEvent::DeliveryFailed {
                    identity: identity.to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                false
            }
        }
    }

    /// Consume the channel's event stream.
    ///
    /// Each identity gets one worker task that answers its messages in
    /// arrival order; different identities are answered in parallel.
    /// Returns once the stream closes and every queued message is done.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<Result<InboundEvent, ChannelError>>) {
        let mut tasks = JoinSet::new();
        let queues: Queues = Arc::default();
        info!(channel = %self.channel.name(), "Message router started");

        while let Some(next) = rx.recv().await {
            match next {
                Ok(event) => {
                    for message in event.messages {
                        self.enqueue(&queues, &mut tasks, event.kind.clone(), message).await;
                    }
                }
                Err(e) => warn!(channel = %self.channel.name(), "Channel error: {e}"),
            }

            // Reap finished workers so the set does not grow unbounded.
            while tasks.try_join_next().is_some() {}
        }

        while tasks.join_next().await.is_some() {}
        info!("Message router stopped");
    }

    /// Queue an answerable message behind its identity's earlier ones,
    /// starting a worker if the identity has none.
    async fn enqueue(
        self: &Arc<Self>,
        queues: &Queues,
        tasks: &mut JoinSet<()>,
        kind: EventKind,
        message: InboundMessage,
    ) {
        let identity = match screen(&kind, &message) {
            Ok((identity, _)) => identity.to_string(),
            Err(skip) => {
                debug!(jid = %message.remote_jid, reason = ?skip, "Skipping message");
                return;
            }
        };

        let mut pending = queues.lock().await;
        if let Some(queue) = pending.get_mut(&identity) {
            queue.push_back((kind, message));
            return;
        }
        pending.insert(identity.clone(), VecDeque::from([(kind, message)]));
        drop(pending);

        let router = Arc::clone(self);
        let queues = Arc::clone(queues);
        tasks.spawn(async move { router.drain(&queues, &identity).await });
    }

    /// Answer `identity`'s queued messages one at a time until none remain.
    async fn drain(&self, queues: &Queues, identity: &str) {
        loop {
            let next = {
                let mut pending = queues.lock().await;
                match pending.get_mut(identity).and_then(VecDeque::pop_front) {
                    Some(item) => item,
                    None => {
                        // Removed under the same lock `enqueue` checks, so no
                        // message is left behind without a worker.
                        pending.remove(identity);
                        return;
                    }
                }
            };
            let (kind, message) = next;
            self.handle_message(&kind, &message).await;
        }
    }
}
