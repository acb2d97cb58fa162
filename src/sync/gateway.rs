use std::sync::Arc;

use anyhow::{anyhow, Result};

use super::manager::SyncManager;
use super::protocol::{ClientEvent, InitData, ServerEvent};
use crate::error::MutationError;
use crate::net::ServerAddress;
use crate::storage::{Document, Store, WifiEntry};

/// Bridges parsed client events to the store and fans results out.
///
/// Fire-and-forget: the sender never gets an error back. A dropped or rejected
/// event is only visible as the absence of a broadcast.
#[derive(Clone)]
pub struct Gateway {
    store: Arc<Store>,
    sync: SyncManager,
    address: ServerAddress,
}

impl Gateway {
    pub fn new(store: Arc<Store>, sync: SyncManager, address: ServerAddress) -> Self {
        Self {
            store,
            sync,
            address,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn sync(&self) -> &SyncManager {
        &self.sync
    }

    /// Snapshot read off the async runtime; the lock may be held across a disk write.
    pub async fn snapshot(&self) -> Result<Document> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.snapshot())
            .await
            .map_err(|err| anyhow!("failed to join snapshot task: {err}"))
    }

    /// The `init_data` event a freshly connected client receives
    pub async fn connect_event(&self) -> Result<ServerEvent> {
        let document = self.snapshot().await?;
        Ok(self.init_event(document))
    }

    fn init_event(&self, document: Document) -> ServerEvent {
        ServerEvent::InitData(InitData {
            document,
            server_ip: self.address.resolve(),
        })
    }

    /// Run `event` against the store and publish the result. Blocking.
    ///
    /// Publishing happens inside the store's critical section, so broadcasts
    /// leave in exactly the order mutations were committed and the last one a
    /// client sees always matches the store.
    pub fn apply(&self, event: ClientEvent) -> Result<Arc<ServerEvent>, MutationError> {
        // Resolve outside the lock; discovery touches the network stack
        let server_ip = matches!(event, ClientEvent::ResetData).then(|| self.address.resolve());

        self.store.mutate_with(
            |doc| apply_event(event, doc),
            |doc| {
                let update = Arc::new(match server_ip {
                    Some(server_ip) => ServerEvent::InitData(InitData {
                        document: doc.clone(),
                        server_ip,
                    }),
                    None => ServerEvent::DataUpdate(doc.clone()),
                });
                self.sync.publish(update.clone());
                update
            },
        )
    }

    /// Parse, apply and broadcast one inbound text frame.
    ///
    /// Returns the broadcast event, or `None` when the frame was dropped.
    pub async fn handle_frame(&self, text: &str) -> Option<Arc<ServerEvent>> {
        let event = match ClientEvent::parse(text) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!("dropping client frame: {err}");
                return None;
            }
        };

        let name = event.name();
        let gateway = self.clone();
        let outcome = match tokio::task::spawn_blocking(move || gateway.apply(event)).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(event = name, "mutation task failed: {err}");
                return None;
            }
        };

        match outcome {
            Ok(update) => {
                if matches!(*update, ServerEvent::InitData(_)) {
                    tracing::info!("board reset to defaults");
                }
                tracing::debug!(
                    event = name,
                    peers = self.sync.peer_count(),
                    "broadcast board state"
                );
                Some(update)
            }
            Err(err) if err.is_rejection() => {
                tracing::warn!(event = name, "mutation rejected: {err}");
                None
            }
            Err(err) => {
                tracing::error!(event = name, "mutation not broadcast: {err}");
                None
            }
        }
    }
}

fn apply_event(event: ClientEvent, doc: &mut Document) -> Result<(), MutationError> {
    match event {
        ClientEvent::UpdateKey(p) => doc.set_key(p.index, p.value)?,
        ClientEvent::UpdateKeyMarker(p) => doc.toggle_key_marker(p.key_index, p.marker_index)?,
        ClientEvent::UpdateNotes(p) => doc.notes = p.text,
        ClientEvent::UpdateSiteMarker(p) => doc.toggle_site_marker(&p.site_name, p.color),
        ClientEvent::Toggle1337(p) => doc.mode_1337 = p.enabled,
        ClientEvent::AddWifi(p) => doc.wifi.push(WifiEntry {
            ssid: p.ssid,
            password: p.password,
            location: p.location,
        }),
        ClientEvent::DeleteWifi(p) => {
            doc.delete_wifi(p.index)?;
        }
        ClientEvent::ResetData => *doc = Document::default(),
    }
    Ok(())
}
