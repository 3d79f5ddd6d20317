//! WebSocket confirmation multiplexer (§4.5).
//!
//! A single upstream connection is shared by every subscriber. Each
//! subscriber gets a bounded channel; the read loop never blocks on a slow
//! subscriber, applying the three-tier backpressure policy below instead.

use std::collections::HashMap;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;

use nanorelay_core::{Address, Amount, BlockHash, Confirmation, WS_CHANNEL_CAPACITY};

#[derive(Clone, Debug)]
pub enum ConfirmationOrError {
    Confirmation(Confirmation),
    Error(String),
}

struct Subscriber {
    account_key: String,
    tx: mpsc::Sender<ConfirmationOrError>,
}

struct MuxState {
    subscribers: HashMap<u64, Subscriber>,
    next_id: u64,
    connected: bool,
    generation: u64,
}

/// Shared handle to the multiplexed upstream confirmation feed.
#[derive(Clone)]
pub struct WsMux {
    ws_url: String,
    state: Arc<Mutex<MuxState>>,
}

impl WsMux {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            state: Arc::new(Mutex::new(MuxState {
                subscribers: HashMap::new(),
                next_id: 0,
                connected: false,
                generation: 0,
            })),
        }
    }

    /// Subscribe to confirmations touching `account`, connecting the
    /// upstream lazily if it is not already up. Returns a fresh subscription
    /// id; subscribing the same account twice (e.g. a nested send-confirmation
    /// wait inside an outer receive wait) yields two independent subscribers,
    /// neither evicting the other (§4.5).
    pub async fn subscribe(&self, account: &Address) -> (u64, mpsc::Receiver<ConfirmationOrError>) {
        let (tx, rx) = mpsc::channel(WS_CHANNEL_CAPACITY);
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.insert(
            id,
            Subscriber {
                account_key: account.to_display(),
                tx,
            },
        );

        if !state.connected {
            state.connected = true;
            state.generation += 1;
            let generation = state.generation;
            drop(state);
            let this = self.clone();
            tokio::spawn(async move { this.run(generation).await });
        }

        (id, rx)
    }

    /// Detach a single subscriber without touching the upstream connection
    /// or any other subscriber on the same account (§4.5).
    pub async fn disconnect(&self, id: u64) {
        let mut state = self.state.lock().await;
        state.subscribers.remove(&id);
    }

    async fn run(&self, generation: u64) {
        match tokio_tungstenite::connect_async(&self.ws_url).await {
            Ok((mut stream, _)) => {
                let subscribe = json!({"action": "subscribe", "topic": "confirmation"});
                if stream.send(Message::Text(subscribe.to_string())).await.is_err() {
                    self.broadcast_error_and_reset(generation, "upstream send failed").await;
                    return;
                }

                while let Some(msg) = stream.next().await {
                    // A newer generation has superseded this loop; stop quietly.
                    if self.state.lock().await.generation != generation {
                        return;
                    }
                    match msg {
                        Ok(Message::Text(text)) => {
                            if let Some(confirmation) = parse_confirmation(&text) {
                                self.dispatch(confirmation).await;
                            }
                        }
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            self.broadcast_error_and_reset(generation, &e.to_string()).await;
                            return;
                        }
                    }
                }
                self.broadcast_error_and_reset(generation, "upstream closed").await;
            }
            Err(e) => {
                self.broadcast_error_and_reset(generation, &e.to_string()).await;
            }
        }
    }

    async fn broadcast_error_and_reset(&self, generation: u64, message: &str) {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            return;
        }
        for sub in state.subscribers.values() {
            let _ = sub.tx.try_send(ConfirmationOrError::Error(message.to_string()));
        }
        state.connected = false;
    }

    async fn dispatch(&self, confirmation: Confirmation) {
        let state = self.state.lock().await;
        let sender_key = confirmation.account.to_display();
        let receiver_key = confirmation.link_as_account.to_display();

        for sub in state.subscribers.values() {
            if sub.account_key == sender_key || sub.account_key == receiver_key {
                send_with_backpressure(&sub.tx, &confirmation);
            }
        }
    }
}

fn send_with_backpressure(tx: &mpsc::Sender<ConfirmationOrError>, confirmation: &Confirmation) {
    let free = tx.capacity();
    if free >= 2 {
        let _ = tx.try_send(ConfirmationOrError::Confirmation(confirmation.clone()));
    } else if free == 1 {
        let _ = tx.try_send(ConfirmationOrError::Error("channel buffer full".to_string()));
    }
    // free == 0: dropped silently.
}


fn parse_confirmation(text: &str) -> Option<Confirmation> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    if value.get("topic").and_then(|v| v.as_str()) != Some("confirmation") {
        return None;
    }
    let message = value.get("message")?;
    let account = Address::from_display(message.get("account")?.as_str()?).ok()?;
    let hash = BlockHash::from_hex(message.get("hash")?.as_str()?).ok()?;
    let amount: Amount = message.get("amount")?.as_str()?.parse().ok()?;
    let block = message.get("block")?;
    let link = hex::decode(block.get("link")?.as_str()?).ok()?;
    let link: [u8; 32] = link.try_into().ok()?;
    let link_as_account = Address::from_display(block.get("link_as_account")?.as_str()?).ok()?;
    let balance: Amount = block.get("balance")?.as_str()?.parse().ok()?;

    Some(Confirmation {
        account,
        link_as_account,
        amount,
        block_hash: hash,
        link,
        balance,
        link_block: None,
    })
}
