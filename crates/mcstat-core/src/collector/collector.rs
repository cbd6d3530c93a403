//! Main collector that combines player and server-wide collection.
//!
//! The `Collector` struct provides a unified interface for running one
//! collection cycle into a `Snapshot` for exposition.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::collector::identity::IdentityResolver;
use crate::collector::player::{PlayerCollector, mapper};
use crate::collector::rcon::{Connector, REPORTS, RconSession, ReportToggles, TcpConnector};
use crate::collector::traits::FileSystem;
use crate::model::{PlayerIdentity, Snapshot};

/// Timing information for each collection phase.
///
/// Used for debugging and performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct CollectorTiming {
    /// Total cycle time.
    pub total: Duration,
    /// Time to resolve, read and map all players.
    pub players: Duration,
    /// Time spent on RCON reports.
    pub rcon: Duration,
    /// Players that produced metrics.
    pub players_collected: usize,
    /// Players skipped: unresolved name or unreadable sources.
    pub players_skipped: usize,
}

/// Main collector that gathers all exporter metrics.
///
/// Owns the RCON session and shares the identity resolver, so it must not run
/// two cycles at once; `collect_snapshot` takes `&mut self`.
pub struct Collector<F: FileSystem, C: Connector = TcpConnector> {
    players: PlayerCollector<F>,
    identity: Arc<IdentityResolver>,
    rcon: RconSession<C>,
    reports: ReportToggles,
    last_timing: Option<CollectorTiming>,
}

impl<F: FileSystem> Collector<F, TcpConnector> {
    /// Creates a new collector with RCON disabled and no name sources.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `world_path` - World directory (usually "/world")
    pub fn new(fs: F, world_path: impl AsRef<Path>) -> Self {
        Self {
            players: PlayerCollector::new(fs, world_path),
            identity: Arc::new(IdentityResolver::new()),
            rcon: RconSession::disabled(),
            reports: ReportToggles::default(),
            last_timing: None,
        }
    }
}

impl<F: FileSystem, C: Connector> Collector<F, C> {
    /// Sets the identity resolver. The same resolver can be shared with the
    /// task that flushes its cache.
    pub fn with_identity(mut self, identity: Arc<IdentityResolver>) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the RCON session used for server-wide reports.
    pub fn with_rcon<C2: Connector>(self, rcon: RconSession<C2>) -> Collector<F, C2> {
        Collector {
            players: self.players,
            identity: self.identity,
            rcon,
            reports: self.reports,
            last_timing: self.last_timing,
        }
    }

    /// Enables optional reports.
    pub fn with_reports(mut self, reports: ReportToggles) -> Self {
        self.reports = reports;
        self
    }

    /// Returns the shared identity resolver.
    pub fn identity(&self) -> Arc<IdentityResolver> {
        Arc::clone(&self.identity)
    }

    pub fn rcon(&self) -> &RconSession<C> {
        &self.rcon
    }

    /// Returns timing information from the last collect_snapshot call.
    pub fn last_timing(&self) -> Option<&CollectorTiming> {
        self.last_timing.as_ref()
    }

    /// Runs one collection cycle.
    ///
    /// Never fails as a whole: unresolved or unreadable players are skipped,
    /// failed or unparseable reports contribute nothing.
    pub fn collect_snapshot(&mut self) -> Snapshot {
        let total_start = Instant::now();
        let mut timing = CollectorTiming::default();

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        self.rcon.begin_cycle();
        let mut samples = Vec::new();

        let start = Instant::now();
        for id in self.players.players() {
            let mut player = PlayerIdentity::new(id);
            // Resolve first: without a name nothing is exposed for this player.
            player.name = self.identity.resolve(&player.id);
            let Some(name) = player.name.as_deref() else {
                debug!(player = %player.id, "player name unresolved, skipping this cycle");
                timing.players_skipped += 1;
                continue;
            };

            match self.players.read(&player.id) {
                Ok(bag) => {
                    samples.extend(mapper::map(name, &bag));
                    timing.players_collected += 1;
                }
                Err(e) => {
                    warn!(player = %player.id, error = %e, "skipping player");
                    timing.players_skipped += 1;
                }
            }
        }
        timing.players = start.elapsed();

        let start = Instant::now();
        if self.rcon.is_enabled() {
            for report in REPORTS.iter().filter(|r| r.kind.enabled(&self.reports)) {
                let Some(response) = self.rcon.execute(report.command) else {
                    continue;
                };
                let parsed = (report.parse)(&response);
                if parsed.is_empty() {
                    debug!(command = report.command, "report produced no samples");
                }
                samples.extend(parsed);
            }
        }
        timing.rcon = start.elapsed();

        timing.total = total_start.elapsed();
        debug!(
            total_ms = timing.total.as_millis() as u64,
            players_ms = timing.players.as_millis() as u64,
            rcon_ms = timing.rcon.as_millis() as u64,
            collected = timing.players_collected,
            skipped = timing.players_skipped,
            samples = samples.len(),
            "collection cycle finished"
        );
        self.last_timing = Some(timing);

        Snapshot { timestamp, samples }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::collector::identity::{LookupError, ProfileLookup};
    use crate::collector::mock::{MockFs, PlayerFixture};
    use crate::collector::rcon::testing::{Reply, ScriptedConnector};

    const NOTCH: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";
    const JEB: &str = "853c80ef-3c37-49fd-aa49-938b674adae6";
    const DINNERBONE: &str = "61699b2e-d327-4a01-9f1e-0ea8c3f06bc6";

    fn ledger(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect()
    }

    fn resolver(entries: &[(&str, &str)]) -> Arc<IdentityResolver> {
        Arc::new(IdentityResolver::new().with_local(ledger(entries)))
    }

    /// Remote lookup whose answers can change between cycles.
    #[derive(Clone, Default)]
    struct SwitchableLookup(Arc<std::sync::Mutex<HashMap<String, String>>>);

    impl ProfileLookup for SwitchableLookup {
        fn lookup(&self, id: &str) -> Result<String, LookupError> {
            self.0
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or(LookupError::NotFound)
        }
    }

    #[test]
    fn test_collect_snapshot_modern_world() {
        let mut collector = Collector::new(MockFs::modern_world(), "/world")
            .with_identity(resolver(&[(NOTCH, "Notch"), (JEB, "jeb_")]));

        let snapshot = collector.collect_snapshot();
        assert!(snapshot.timestamp > 0);

        let jumps: Vec<_> = snapshot.samples_named("player_jumps").collect();
        assert_eq!(jumps.len(), 2);
        assert!(
            jumps
                .iter()
                .any(|s| s.label_value("player") == Some("jeb_") && s.value == 5.0)
        );

        let health = snapshot
            .samples_named("player_health")
            .find(|s| s.label_value("player") == Some("jeb_"))
            .unwrap();
        assert_eq!(health.value, 14.5);

        let timing = collector.last_timing().unwrap();
        assert_eq!(timing.players_collected, 2);
        assert_eq!(timing.players_skipped, 0);
    }

    #[test]
    fn test_collect_snapshot_legacy_world() {
        let mut collector = Collector::new(MockFs::legacy_world(), "/world")
            .with_identity(resolver(&[(DINNERBONE, "Dinnerbone")]));

        let snapshot = collector.collect_snapshot();
        let mined = snapshot.samples_named("blocks_mined").next().unwrap();
        assert_eq!(mined.label_value("block"), Some("minecraft.stone"));
        assert_eq!(mined.value, 230.0);
        assert_eq!(snapshot.samples_named("player_advancements").next().unwrap().value, 1.0);
    }

    #[test]
    fn test_unresolved_player_suppressed_and_retried() {
        const STRANGER: &str = "deadbeef-0000-4000-8000-000000000001";
        let mut fs = MockFs::new();
        PlayerFixture::new(STRANGER)
            .stats(r#"{"stats": {"minecraft:custom": {"minecraft:jump": 5}}, "DataVersion": 2586}"#)
            .install(&mut fs, "/world");

        let remote = SwitchableLookup::default();
        let identity = Arc::new(IdentityResolver::new().with_remote(remote.clone()));
        let mut collector = Collector::new(fs, "/world").with_identity(identity.clone());

        let first = collector.collect_snapshot();
        assert!(first.samples.is_empty());
        assert_eq!(collector.last_timing().unwrap().players_skipped, 1);
        assert_eq!(identity.cached(), 0);

        remote
            .0
            .lock()
            .unwrap()
            .insert(STRANGER.replace('-', ""), "Stranger".to_string());

        let second = collector.collect_snapshot();
        let jump = second.samples_named("player_jumps").next().unwrap();
        assert_eq!(jump.label_value("player"), Some("Stranger"));
        assert_eq!(jump.value, 5.0);
    }

    #[test]
    fn test_unreadable_player_skipped() {
        let mut fs = MockFs::modern_world();
        fs.remove_file(format!("/world/playerdata/{JEB}.dat"));
        let mut collector = Collector::new(fs, "/world")
            .with_identity(resolver(&[(NOTCH, "Notch"), (JEB, "jeb_")]));

        let snapshot = collector.collect_snapshot();
        assert!(
            snapshot
                .samples
                .iter()
                .all(|s| s.label_value("player") == Some("Notch"))
        );
        let timing = collector.last_timing().unwrap();
        assert_eq!(timing.players_collected, 1);
        assert_eq!(timing.players_skipped, 1);
    }

    #[test]
    fn test_reports_follow_toggles_and_order() {
        let connector = ScriptedConnector::default();
        connector
            .respond("tps", "TPS from last 1m, 5m, 15m: 20.0, 20.0, 20.0")
            .respond(
                "forge tps",
                "Dim 0 (overworld) : Mean tick time: 5.2 ms. Mean TPS: 20.0\n\
                 Overall: Mean tick time: 4.8 ms. Mean TPS: 20.0",
            )
            .respond("forge entity list", "Total: 3\n  3: minecraft:cow\n")
            .respond("list", "There are 2/20 players online: Alice, Bob");

        let mut collector = Collector::new(MockFs::new(), "/world")
            .with_rcon(RconSession::new(connector.clone()))
            .with_reports(ReportToggles {
                forge: true,
                ..ReportToggles::default()
            });

        let snapshot = collector.collect_snapshot();
        assert_eq!(connector.sent(), vec!["forge tps", "forge entity list", "list"]);

        let names: Vec<&str> = snapshot.samples.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "dim_ticktime",
                "dim_tps",
                "overall_ticktime",
                "overall_tps",
                "entities",
                "player_online",
                "player_online",
            ]
        );
    }

    #[test]
    fn test_rcon_failure_skips_rest_of_cycle_then_recovers() {
        let connector = ScriptedConnector::default();
        connector
            .queue("forge tps", Reply::Drop)
            .respond("forge tps", "Overall: Mean tick time: 4.8 ms. Mean TPS: 20.0")
            .respond("list", "There are 1/20 players online: Alice");

        let mut collector = Collector::new(MockFs::new(), "/world")
            .with_rcon(RconSession::new(connector.clone()))
            .with_reports(ReportToggles {
                forge: true,
                ..ReportToggles::default()
            });

        let first = collector.collect_snapshot();
        assert!(first.samples.is_empty());
        assert_eq!(connector.connects(), 1);

        let second = collector.collect_snapshot();
        assert_eq!(connector.connects(), 2);
        assert_eq!(second.samples_named("overall_tps").count(), 1);
        assert_eq!(second.samples_named("player_online").count(), 1);
    }

    #[test]
    fn test_rcon_disabled_sends_nothing() {
        let mut collector = Collector::new(MockFs::new(), "/world").with_reports(ReportToggles {
            paper: true,
            forge: true,
            dynmap: true,
        });
        let snapshot = collector.collect_snapshot();
        assert!(snapshot.samples.is_empty());
        assert!(!collector.rcon().is_enabled());
    }
}
