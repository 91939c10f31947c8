use crate::framework::{ApiError, Attributes, Entity, OwnerRef, Transport, TransportError};
use crate::gateway::message::{Response, StoreRequest};
use tokio::sync::{mpsc, oneshot};

/// Blocking [`Transport`] over the store actor's channel.
///
/// Each call sends one request and blocks until the actor answers. Must not
/// be used from inside an async context.
#[derive(Clone, Debug)]
pub struct ActorTransport {
    sender: mpsc::Sender<StoreRequest>,
}

impl ActorTransport {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    /// Asks the actor to stop after the requests already queued.
    pub fn shutdown(&self) -> Result<(), ApiError> {
        self.sender
            .blocking_send(StoreRequest::Shutdown)
            .map_err(|_| ApiError::transport("Actor closed"))
    }

    fn call<T>(
        &self,
        request: impl FnOnce(Response<T>) -> StoreRequest,
    ) -> Result<T, TransportError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .blocking_send(request(respond_to))
            .map_err(|_| ApiError::transport("Actor closed"))?;
        response
            .blocking_recv()
            .map_err(|_| ApiError::transport("Actor dropped response channel"))?
    }
}

impl Transport for ActorTransport {
    fn fetch_one(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        id: &str,
    ) -> Result<Entity, TransportError> {
        self.call(|respond_to| StoreRequest::FetchOne {
            kind: kind.to_string(),
            scope: scope.cloned(),
            id: id.to_string(),
            respond_to,
        })
    }

    fn fetch_list(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        filter: Option<&Attributes>,
    ) -> Result<Vec<Entity>, TransportError> {
        self.call(|respond_to| StoreRequest::FetchList {
            kind: kind.to_string(),
            scope: scope.cloned(),
            filter: filter.cloned(),
            respond_to,
        })
    }

    fn create(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        attrs: &Attributes,
    ) -> Result<Entity, TransportError> {
        self.call(|respond_to| StoreRequest::Create {
            kind: kind.to_string(),
            scope: scope.cloned(),
            attrs: attrs.clone(),
            respond_to,
        })
    }

    fn update(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        id: &str,
        attrs: &Attributes,
    ) -> Result<Entity, TransportError> {
        self.call(|respond_to| StoreRequest::Update {
            kind: kind.to_string(),
            scope: scope.cloned(),
            id: id.to_string(),
            attrs: attrs.clone(),
            respond_to,
        })
    }

    fn delete(&self, kind: &str, scope: Option<&OwnerRef>, id: &str) -> Result<(), TransportError> {
        self.call(|respond_to| StoreRequest::Delete {
            kind: kind.to_string(),
            scope: scope.cloned(),
            id: id.to_string(),
            respond_to,
        })
    }
}
