//! CLI channel — a local conversation in the terminal.
//!
//! Reads lines from stdin as messages from a single local identity and
//! prints replies to stdout. Used by `motoasesor chat`.

use async_trait::async_trait;
use motoasesor_core::channel::{Channel, InboundEvent, InboundMessage, Presence};
use motoasesor_core::error::ChannelError;
use std::io::Write;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Identity of the terminal user.
pub const LOCAL_IDENTITY: &str = "local@cli";

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    assistant_label: String,
}

impl CliChannel {
    pub fn new(assistant_label: impl Into<String>) -> Self {
        Self {
            assistant_label: assistant_label.into(),
        }
    }

    /// Turn a typed line into an event. `None` for blank lines and exit words.
    pub fn line_to_event(line: &str) -> Option<InboundEvent> {
        let line = line.trim();
        if line.is_empty() || is_exit(line) {
            return None;
        }
        Some(InboundEvent::notify(InboundMessage {
            push_name: Some("Tú".into()),
            ..InboundMessage::text(LOCAL_IDENTITY, line)
        }))
    }

    fn render(&self, text: &str) -> String {
        format!("\n🏍️  {}: {}\n", self.assistant_label, text)
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new("MotoAsesor")
    }
}

fn is_exit(line: &str) -> bool {
    matches!(line, "exit" | "quit" | "salir" | "/exit" | "/quit" | ":q")
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<InboundEvent, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if is_exit(line.trim()) {
                            break;
                        }
                        let Some(event) = CliChannel::line_to_event(&line) else {
                            continue;
                        };
                        if tx.send(Ok(event)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send_text(&self, _recipient: &str, text: &str) -> Result<(), ChannelError> {
        println!("{}", self.render(text));
        Ok(())
    }

    async fn set_presence(&self, _recipient: &str, presence: Presence) -> Result<(), ChannelError> {
        if presence == Presence::Composing {
            print!("   ✍️  escribiendo...\r");
            let _ = std::io::stdout().flush();
        }
        Ok(())
    }
}
