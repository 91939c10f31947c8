//! # Remote Transport
//!
//! The [`Transport`] trait is the only way the framework talks to the remote
//! payment service. Every operation is owner-scoped: a [`OwnerRef`] names the
//! parent record (e.g. the customer an address belongs to), or `None` for
//! unscoped calls.
//!
//! Records and collections never hold a transport directly; they hold a
//! [`Gateway`], a cheap-to-clone handle that adds tracing and error mapping on
//! top of whichever transport was plugged in (the in-memory gateway, a mock, or
//! a real wire client).

use crate::framework::error::{ApiError, ApiErrorKind, TransportError};
use crate::framework::value::{Attributes, Entity, FieldNames};
use std::fmt::{self, Debug, Display};
use std::rc::Rc;
use tracing::{debug, instrument, warn};

/// Identifies the owner that scopes a remote operation.
///
/// `key` is the attribute on child entities that holds the owner's identifier
/// (`customer_id` for addresses, `payment_method_token` for card transactions).
/// This is a snapshot of the owner's identity, never a handle that keeps the
/// owner alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    kind: &'static str,
    key: &'static str,
    id: String,
}

impl OwnerRef {
    pub fn new(kind: &'static str, key: &'static str, id: impl Into<String>) -> Self {
        Self {
            kind,
            key,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// False while the owner has not been assigned an identifier yet.
    pub fn has_identity(&self) -> bool {
        !self.id.is_empty()
    }
}

impl Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Blocking interface to the remote service.
///
/// Implementations own the wire format, authentication and retries. Each call
/// blocks until a response or failure arrives.
pub trait Transport {
    fn fetch_one(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        id: &str,
    ) -> Result<Entity, TransportError>;

    fn fetch_list(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        filter: Option<&Attributes>,
    ) -> Result<Vec<Entity>, TransportError>;

    fn create(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        attrs: &Attributes,
    ) -> Result<Entity, TransportError>;

    fn update(
        &self,
        kind: &str,
        scope: Option<&OwnerRef>,
        id: &str,
        attrs: &Attributes,
    ) -> Result<Entity, TransportError>;

    fn delete(&self, kind: &str, scope: Option<&OwnerRef>, id: &str) -> Result<(), TransportError>;
}

/// Shared handle to a [`Transport`].
///
/// Single-threaded by design: records are not `Send`, so an `Rc` is enough.
#[derive(Clone)]
pub struct Gateway {
    transport: Rc<dyn Transport>,
}

impl Gateway {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Rc::new(transport),
        }
    }

    pub fn from_shared(transport: Rc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Reads can only fail at the infrastructure level.
    fn map_error(kind: &str, e: TransportError) -> ApiError {
        match e {
            TransportError::Api(api) => api,
            TransportError::Validation(errors) => {
                warn!(kind, count = errors.len(), "Validation response to a read");
                ApiError::with_kind(
                    ApiErrorKind::Unexpected,
                    format!("unexpected validation response for {kind}"),
                )
            }
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn fetch_one(
        &self,
        kind: &'static str,
        scope: Option<&OwnerRef>,
        id: &str,
    ) -> Result<Entity, ApiError> {
        debug!("Sending request");
        self.transport
            .fetch_one(kind, scope, id)
            .map_err(|e| Self::map_error(kind, e))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn fetch_list(
        &self,
        kind: &'static str,
        scope: Option<&OwnerRef>,
        filter: Option<&Attributes>,
    ) -> Result<Vec<Entity>, ApiError> {
        debug!("Sending request");
        self.transport
            .fetch_list(kind, scope, filter)
            .map_err(|e| Self::map_error(kind, e))
    }

    #[instrument(level = "debug", skip(self, attrs))]
    pub fn create(
        &self,
        kind: &'static str,
        scope: Option<&OwnerRef>,
        attrs: &Attributes,
    ) -> Result<Entity, TransportError> {
        debug!(fields = ?FieldNames(attrs), "Sending request");
        self.transport.create(kind, scope, attrs)
    }

    #[instrument(level = "debug", skip(self, attrs))]
    pub fn update(
        &self,
        kind: &'static str,
        scope: Option<&OwnerRef>,
        id: &str,
        attrs: &Attributes,
    ) -> Result<Entity, TransportError> {
        debug!(fields = ?FieldNames(attrs), "Sending request");
        self.transport.update(kind, scope, id, attrs)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn delete(
        &self,
        kind: &'static str,
        scope: Option<&OwnerRef>,
        id: &str,
    ) -> Result<(), ApiError> {
        debug!("Sending request");
        self.transport
            .delete(kind, scope, id)
            .map_err(|e| Self::map_error(kind, e))
    }
}

impl Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway").finish_non_exhaustive()
    }
}
