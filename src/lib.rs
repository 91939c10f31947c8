//! # Gateway Records
//!
//! > **Active records for a remote payment vault.**
//!
//! This crate lets applications work with customers, addresses, credit cards
//! and transactions stored by a payment service as if they were local
//! records: read and write attributes, validate locally, save, reload and
//! destroy, and navigate between related records.
//!
//! ## Core Concepts
//!
//! ### Records
//! A [`Record<R>`](framework::Record) holds one entity's attributes, its
//! persisted/destroyed flags and the validation errors of the last attempt.
//! The marker type `R` implements [`Resource`](framework::Resource) and
//! declares the kind: attribute names, read-only fields, validation rules and
//! associations.
//!
//! ### Associations
//! Related records are declared once as typed constants
//! ([`SingleAssociation`](framework::SingleAssociation),
//! [`HasMany`](framework::HasMany)) and resolved lazily. A resolved relation
//! is cached on the record; a [`Collection`](framework::Collection) loads its
//! members on first access and pre-fills new members with the owner's key.
//!
//! ### Transport
//! Every remote call goes through the [`Transport`](framework::Transport)
//! trait. The crate ships two implementations: the in-memory vault in
//! [`gateway`] and [`MockTransport`](framework::MockTransport) for tests.
//!
//! ## Module Tour
//!
//! - [`framework`]: records, associations, collections, errors, transport.
//! - [`resources`]: the concrete kinds ([`Customer`](resources::Customer),
//!   [`Address`](resources::Address), [`CreditCard`](resources::CreditCard),
//!   [`Transaction`](resources::Transaction)).
//! - [`validation`]: reusable field rules.
//! - [`gateway`]: the in-memory vault, run as an actor.
//! - [`lifecycle`]: configuration, [`GatewaySystem`](lifecycle::GatewaySystem)
//!   and tracing setup.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gateway_records::attrs;
//! use gateway_records::lifecycle::{GatewayConfig, GatewaySystem};
//! use gateway_records::resources::CustomerRecord;
//!
//! let system = GatewaySystem::start(GatewayConfig::default()).unwrap();
//! let gateway = system.gateway();
//!
//! let mut customer =
//!     CustomerRecord::create(&gateway, attrs! { "first_name" => "Ada" }).unwrap();
//! let address = customer
//!     .addresses()
//!     .create(attrs! { "postal_code" => "60622" })
//!     .unwrap();
//! assert!(address.is_persisted());
//!
//! drop(address);
//! system.shutdown().unwrap();
//! ```
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

pub mod framework;
pub mod gateway;
pub mod lifecycle;
pub mod resources;
pub mod validation;
