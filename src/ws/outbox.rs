//! Per-connection outbound message routing

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Outbound queue depth per connection
const OUTBOX_CAPACITY: usize = 256;

/// Routes server messages to the connection owning an identity.
///
/// The game task is the only producer; each websocket writer task drains its
/// own receiver. Sends never block the tick: a full or closed channel drops
/// the message.
pub struct Outbox {
    senders: DashMap<Uuid, mpsc::Sender<ServerMsg>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self {
            senders: DashMap::new(),
        }
    }

    /// Register a connection and return the receiving half of its queue
    pub fn register(&self, identity: Uuid) -> mpsc::Receiver<ServerMsg> {
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        self.senders.insert(identity, tx);
        rx
    }

    pub fn unregister(&self, identity: &Uuid) {
        self.senders.remove(identity);
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Send to one identity. Returns false if the message was dropped.
    pub fn send(&self, identity: Uuid, msg: ServerMsg) -> bool {
        let Some(tx) = self.senders.get(&identity) else {
            return false;
        };
        match tx.try_send(msg) {
            Ok(()) => true,
            Err(e) => {
                debug!(identity = %identity, error = %e, "Dropped outbound message");
                false
            }
        }
    }

    /// Send the same message to every listed identity
    pub fn send_all<'a>(&self, identities: impl IntoIterator<Item = &'a Uuid>, msg: &ServerMsg) {
        for identity in identities {
            self.send(*identity, msg.clone());
        }
    }

    /// Send to every live connection
    pub fn broadcast(&self, msg: &ServerMsg) {
        let identities: Vec<Uuid> = self.senders.iter().map(|e| *e.key()).collect();
        self.send_all(identities.iter(), msg);
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new()
    }
}
