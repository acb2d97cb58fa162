// In-process fan-out for board state. Every websocket connection subscribes
// to the broadcast channel; publishing never waits on a slow subscriber.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::protocol::ServerEvent;

const CHANNEL_CAPACITY: usize = 256;

/// A connected client, kept for bookkeeping only
#[derive(Debug, Clone)]
pub struct Peer {
    pub addr: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SyncManager {
    tx: broadcast::Sender<Arc<ServerEvent>>,
    peers: Arc<DashMap<Uuid, Peer>>,
}

impl SyncManager {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: Arc::new(DashMap::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ServerEvent>> {
        self.tx.subscribe()
    }

    /// Send to every subscriber; returns how many were reached
    pub fn publish(&self, event: Arc<ServerEvent>) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn register(&self, addr: Option<SocketAddr>) -> Uuid {
        let id = Uuid::new_v4();
        self.peers.insert(
            id,
            Peer {
                addr,
                connected_at: Utc::now(),
            },
        );
        id
    }

    pub fn unregister(&self, id: &Uuid) -> Option<Peer> {
        self.peers.remove(id).map(|(_, peer)| peer)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

impl Default for SyncManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Document;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let sync = SyncManager::new();
        let mut a = sync.subscribe();
        let mut b = sync.subscribe();

        let event = Arc::new(ServerEvent::DataUpdate(Document::default()));
        assert_eq!(sync.publish(event.clone()), 2);

        assert_eq!(a.recv().await.unwrap(), event);
        assert_eq!(b.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let sync = SyncManager::new();
        assert_eq!(
            sync.publish(Arc::new(ServerEvent::DataUpdate(Document::default()))),
            0
        );
    }

    #[test]
    fn test_peer_bookkeeping() {
        let sync = SyncManager::new();
        let first = sync.register(None);
        let before = Utc::now();
        let second = sync.register("127.0.0.1:9000".parse().ok());
        assert_eq!(sync.peer_count(), 2);

        let peer = sync.unregister(&second).unwrap();
        assert_eq!(peer.addr, "127.0.0.1:9000".parse().ok());
        assert!(peer.connected_at >= before && peer.connected_at <= Utc::now());
        assert_eq!(sync.peer_count(), 1);

        assert!(sync.unregister(&second).is_none());
        sync.unregister(&first);
        assert_eq!(sync.peer_count(), 0);
    }
}
