//! Tokio-based UDP transport for a NatNet session.
//!
//! This layer owns the two sockets of a session:
//! - the command channel (handshake, control requests, keepalives),
//! - the data channel (the FRAMEOFDATA stream).
//!
//! Each channel runs its own receive loop as a spawned task; both
//! select against a shared shutdown signal so cancellation unblocks
//! the pending receive deterministically instead of closing sockets
//! out from under a reader. All decoding is delegated to the
//! `protocol` module.

mod client;
mod command;
mod config;
mod data;
mod socket;

pub use client::NatnetClient;
pub use config::ClientConfig;
