//! NatNet protocol primitives, control packets, and frame records.
//!
//! This module houses constants, version gates, encoding helpers and
//! the packet definitions used by the higher-level session and
//! transport layers.

pub mod constants;
pub mod packet;
pub mod version;
pub mod wire;
