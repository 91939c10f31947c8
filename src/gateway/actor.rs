use crate::framework::{Attributes, FieldNames};
use crate::gateway::message::StoreRequest;
use crate::gateway::store::Store;
use crate::gateway::ActorTransport;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The actor that owns the vault.
///
/// This struct is the "Server" half of the in-memory gateway. It owns the
/// [`Store`] and the receiver end of the channel and processes requests
/// sequentially, so the store needs no lock.
pub struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    store: Store,
}

impl StoreActor {
    pub fn new(buffer_size: usize) -> (Self, ActorTransport) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: Store::new(),
        };
        (actor, ActorTransport::new(sender))
    }

    /// Runs the event loop until the channel closes or `Shutdown` arrives.
    pub async fn run(mut self) {
        info!("Store actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::FetchOne {
                    kind,
                    scope,
                    id,
                    respond_to,
                } => {
                    let result = self.store.fetch_one(&kind, scope.as_ref(), &id);
                    debug!(%kind, %id, found = result.is_ok(), "Get");
                    let _ = respond_to.send(result);
                }
                StoreRequest::FetchList {
                    kind,
                    scope,
                    filter,
                    respond_to,
                } => {
                    let result = self.store.fetch_list(&kind, scope.as_ref(), filter.as_ref());
                    match &result {
                        Ok(list) => debug!(%kind, owner = ?scope, count = list.len(), "List"),
                        Err(e) => warn!(%kind, owner = ?scope, error = %e, "List failed"),
                    }
                    let _ = respond_to.send(result);
                }
                StoreRequest::Create {
                    kind,
                    scope,
                    attrs,
                    respond_to,
                } => {
                    debug!(%kind, fields = ?FieldNames(&attrs), "Create");
                    let result = self.store.create(&kind, scope.as_ref(), attrs);
                    match &result {
                        Ok(entity) => {
                            info!(%kind, id = %display_id(entity), size = self.store.len(), "Created")
                        }
                        Err(e) => warn!(%kind, error = %e, "Create failed"),
                    }
                    let _ = respond_to.send(result);
                }
                StoreRequest::Update {
                    kind,
                    scope,
                    id,
                    attrs,
                    respond_to,
                } => {
                    debug!(%kind, %id, fields = ?FieldNames(&attrs), "Update");
                    let result = self.store.update(&kind, scope.as_ref(), &id, attrs);
                    match &result {
                        Ok(_) => info!(%kind, %id, "Updated"),
                        Err(e) => warn!(%kind, %id, error = %e, "Update failed"),
                    }
                    let _ = respond_to.send(result);
                }
                StoreRequest::Delete {
                    kind,
                    scope,
                    id,
                    respond_to,
                } => {
                    debug!(%kind, %id, "Delete");
                    let result = self.store.delete(&kind, scope.as_ref(), &id);
                    match &result {
                        Ok(()) => info!(%kind, %id, size = self.store.len(), "Deleted"),
                        Err(e) => warn!(%kind, %id, error = %e, "Delete failed"),
                    }
                    let _ = respond_to.send(result);
                }
                StoreRequest::Shutdown => break,
            }
        }

        info!(size = self.store.len(), "Shutdown");
    }
}

fn display_id(entity: &Attributes) -> String {
    ["id", "token"]
        .iter()
        .find_map(|key| entity.get(*key).and_then(|v| v.as_identifier()))
        .unwrap_or_default()
}
