//! In-memory payment vault.
//!
//! Stands in for the remote service: a [`StoreActor`] owns every stored entity
//! and answers [`StoreRequest`]s one at a time, while [`ActorTransport`] gives
//! the synchronous record layer a blocking [`Transport`](crate::framework::Transport)
//! over the actor's channel. [`GatewaySystem`](crate::lifecycle::GatewaySystem)
//! wires the two together on a tokio runtime.

pub mod actor;
pub mod client;
pub mod message;
pub mod schema;
pub mod store;

pub use actor::StoreActor;
pub use client::ActorTransport;
pub use message::StoreRequest;
pub use store::Store;
