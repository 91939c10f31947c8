//! Generic record framework for remote resources.
//!
//! This module provides the building blocks every resource kind is made of:
//! a record type with a uniform persistence protocol, declarative associations
//! and lazily loaded collections, all talking to the remote service through a
//! pluggable [`Transport`].
//!
//! # Main Components
//!
//! - [`Resource`] - Static description of a resource kind (attributes, validation, associations)
//! - [`Record`] - Local view of one remote entity
//! - [`SingleAssociation`] / [`HasMany`] - Typed association descriptors
//! - [`Collection`] - Owner-scoped, lazily loaded child list
//! - [`Gateway`] - Shared transport handle
//! - [`RecordError`] - Everything a record operation can fail with
//!
//! # Testing
//!
//! See [`mock`] module for a scriptable transport.

pub mod association;
pub mod collection;
pub mod error;
pub mod mock;
pub mod record;
pub mod transport;
pub mod value;

pub use association::{
    AssociationDescriptor, AssociationKind, AssociationTable, HasMany, SingleAssociation,
};
pub use collection::{Collection, CollectionScope, Entry};
pub use error::{
    ApiError, ApiErrorKind, Errors, FieldError, ImmutableRecordError, RecordError, RecordInvalid,
    RecordResult, TransportError,
};
pub use mock::MockTransport;
pub use record::{AttributeSource, Record, RecordInput, Resource, PERSISTED_KEY};
pub use transport::{Gateway, OwnerRef, Transport};
pub use value::{Attributes, Entity, FieldNames, Value};
