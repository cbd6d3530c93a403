//! mcstat-core — Minecraft server metrics library.
//!
//! Provides:
//! - `collector` — per-player state from the world directory, server-wide
//!   reports over RCON, player name resolution
//! - `model` — canonical metric samples and snapshots
//! - `exposition` — Prometheus text rendering

pub mod collector;
pub mod exposition;
pub mod model;

/// Library version, shared by the binaries.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
