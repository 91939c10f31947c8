use crate::framework::{Attributes, Entity, OwnerRef, TransportError};
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the store actor.
pub type Response<T> = oneshot::Sender<Result<T, TransportError>>;

/// Request sent to the [`StoreActor`](super::StoreActor).
///
/// One variant per [`Transport`](crate::framework::Transport) operation, each
/// carrying the resource kind and the owner scope, plus `Shutdown` to stop the
/// loop while handles are still alive.
#[derive(Debug)]
pub enum StoreRequest {
    FetchOne {
        kind: String,
        scope: Option<OwnerRef>,
        id: String,
        respond_to: Response<Entity>,
    },
    FetchList {
        kind: String,
        scope: Option<OwnerRef>,
        filter: Option<Attributes>,
        respond_to: Response<Vec<Entity>>,
    },
    Create {
        kind: String,
        scope: Option<OwnerRef>,
        attrs: Attributes,
        respond_to: Response<Entity>,
    },
    Update {
        kind: String,
        scope: Option<OwnerRef>,
        id: String,
        attrs: Attributes,
        respond_to: Response<Entity>,
    },
    Delete {
        kind: String,
        scope: Option<OwnerRef>,
        id: String,
        respond_to: Response<()>,
    },
    Shutdown,
}
