//! Minecraft server metrics collector.
//!
//! This module reads per-player state from the world directory and
//! server-wide reports over RCON, with support for mocking both sources in
//! tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Collector                           │
//! │  ┌──────────────────────┐  ┌─────────────────────────────┐   │
//! │  │   PlayerCollector    │  │         RconSession         │   │
//! │  │  - stats/*.json      │  │  - tps, forge tps           │   │
//! │  │  - playerdata/*.dat  │  │  - forge entity list        │   │
//! │  │  - advancements/*    │  │  - dynmap stats, list       │   │
//! │  └──────────┬───────────┘  └──────────────┬──────────────┘   │
//! │             │      ┌──────────────────┐   │                  │
//! │             │      │ IdentityResolver │   │                  │
//! │             │      │  (shared, Arc)   │   │                  │
//! │             │      └──────────────────┘   │                  │
//! │      ┌──────▼──────┐               ┌──────▼──────┐           │
//! │      │  FileSystem │ (trait)       │  Connector  │ (trait)   │
//! │      └──────┬──────┘               └──────┬──────┘           │
//! └─────────────┼─────────────────────────────┼──────────────────┘
//!        ┌──────┴──────┐               ┌──────┴───────┐
//!        │             │               │              │
//!  ┌─────▼────┐ ┌──────▼─────┐  ┌──────▼───────┐ ┌────▼─────┐
//!  │  RealFs  │ │   MockFs   │  │ TcpConnector │ │ (tests)  │
//!  └──────────┘ └────────────┘  └──────────────┘ └──────────┘
//! ```
//!
//! # Usage
//!
//! ## Production
//!
//! ```ignore
//! use mcstat_core::collector::{Collector, RconConfig, RconSession, RealFs};
//!
//! let rcon = RconSession::from_config(&RconConfig::default());
//! let mut collector = Collector::new(RealFs::new(), "/world").with_rcon(rcon);
//! let snapshot = collector.collect_snapshot();
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use mcstat_core::collector::{Collector, IdentityResolver, MockFs};
//!
//! let names = HashMap::from([(
//!     "853c80ef-3c37-49fd-aa49-938b674adae6".to_string(),
//!     "jeb_".to_string(),
//! )]);
//! let identity = Arc::new(IdentityResolver::new().with_local(names));
//! let mut collector = Collector::new(MockFs::modern_world(), "/world").with_identity(identity);
//! let snapshot = collector.collect_snapshot();
//! assert!(snapshot.samples_named("player_jumps").count() == 1);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod identity;
pub mod mock;
pub mod player;
pub mod rcon;
pub mod traits;

pub use collector::{Collector, CollectorTiming};
pub use identity::{IdentityResolver, LookupError, MojangLookup, ProfileLookup};
pub use mock::MockFs;
pub use player::{CollectError, PlayerCollector};
pub use rcon::{RconConfig, RconError, RconSession, ReportToggles, SessionState};
pub use traits::{FileSystem, RealFs};
