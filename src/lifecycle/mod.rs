//! Runtime orchestration and lifecycle management.
//!
//! This module contains the infrastructure around the in-memory vault:
//!
//! - **Configuration**: [`GatewayConfig`], read from the environment
//! - **System orchestration**: [`GatewaySystem`] starts the store actor on its
//!   own runtime and shuts it down again
//! - **Observability setup**: [`setup_tracing`] initializes logging

pub mod config;
pub mod system;
pub mod tracing;

pub use self::config::*;
pub use self::system::*;
pub use self::tracing::*;
