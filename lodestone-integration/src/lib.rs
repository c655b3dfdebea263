#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Lodestone-Integration
//! Low-level transport plumbing shared by every Lodestone venue connector:
//! * [`SocketError`](error::SocketError) - the transport error taxonomy.
//! * [`protocol::websocket`] - tungstenite type aliases, an async `connect`, and frame
//!   payload extraction for data handlers.
//! * [`protocol::rest`] - a minimal timeout-bounded HTTP GET client returning
//!   `(StatusCode, Bytes)` so callers parse payloads exactly once.
//!
//! Venue specific wire schemas live in `lodestone-data`; this crate does not care what
//! bytes mean, only how they move.

/// All socket IO related errors generated in `lodestone-integration`.
pub mod error;

/// Contains useful WebSocket and HTTP abstractions.
pub mod protocol;
