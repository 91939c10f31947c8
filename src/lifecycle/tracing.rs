//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a `tracing-subscriber` fmt subscriber for the
//! binary and for anyone embedding the crate who wants the same output.
//!
//! The level is taken from `RUST_LOG`. The format is compact and hides the
//! module prefix (`with_target(false)`); every event carries `kind` and `id`
//! fields instead.
//!
//! ## What Gets Traced
//!
//! - **Gateway calls**: one span per remote operation (`fetch_one`, `create`, ...)
//! - **Record lifecycle**: `Saved`, `Destroyed`, `Loaded` and validation failures
//! - **Store actor**: startup, `Created` / `Updated` / `Deleted` with the store
//!   size, and shutdown
//!
//! ## Usage
//!
//! ```bash
//! # State transitions only
//! RUST_LOG=info cargo run
//!
//! # Payloads sent to the vault as well
//! RUST_LOG=debug cargo run
//!
//! # Only the record layer
//! RUST_LOG=gateway_records::framework=debug cargo run
//! ```
//!
//! With `RUST_LOG=info` a customer signup looks like:
//!
//! ```text
//! INFO Store actor started
//! INFO Created kind="customer" id="1" size=1
//! INFO Created kind="credit_card" id="card_2" size=2
//! INFO Saved kind="customer" id="1" created=true
//! ```

/// Initializes the global subscriber. Panics if one is already set.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
