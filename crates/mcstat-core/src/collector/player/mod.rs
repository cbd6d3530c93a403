//! Per-player state collection from the world directory.
//!
//! Every known player has up to four source files:
//! - `stats/<id>.json` — gameplay counters, legacy or nested schema
//! - `playerdata/<id>.dat` — gzip-compressed NBT player record
//! - `advancements/<id>.json` — advancement ledger
//! - `betterquesting/QuestProgress.json` — shared quest ledger (optional mod)

pub mod mapper;
pub mod parser;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::collector::traits::FileSystem;
use crate::model::{PlayerScalars, RawAttributeBag};

use parser::ParseError;

/// Error type for per-player collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// A required source file is missing or unreadable.
    Io(PathBuf, std::io::Error),
    /// A source file exists but could not be decoded.
    Parse(PathBuf, ParseError),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io(path, e) => write!(f, "cannot read {}: {}", path.display(), e),
            CollectError::Parse(path, e) => write!(f, "{}: {}", path.display(), e.message),
        }
    }
}

impl std::error::Error for CollectError {}

/// Reads and merges the per-player source files.
pub struct PlayerCollector<F: FileSystem> {
    fs: F,
    stats_dir: PathBuf,
    playerdata_dir: PathBuf,
    advancements_dir: PathBuf,
    /// Quest ledger path, set only if the quest mod directory existed at startup.
    quest_ledger: Option<PathBuf>,
}

impl<F: FileSystem> PlayerCollector<F> {
    const QUEST_DIR: &'static str = "betterquesting";
    const QUEST_FILE: &'static str = "QuestProgress.json";

    /// Creates a new player collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `world_path` - World directory (usually "/world")
    ///
    /// Quest counting is enabled when `<world>/betterquesting` is a directory
    /// at this point; it is not re-checked later.
    pub fn new(fs: F, world_path: impl AsRef<Path>) -> Self {
        let world = world_path.as_ref();
        let quest_dir = world.join(Self::QUEST_DIR);
        let quest_ledger = fs
            .is_dir(&quest_dir)
            .then(|| quest_dir.join(Self::QUEST_FILE));

        Self {
            stats_dir: world.join("stats"),
            playerdata_dir: world.join("playerdata"),
            advancements_dir: world.join("advancements"),
            quest_ledger,
            fs,
        }
    }

    /// Returns whether the quest ledger is consulted.
    pub fn quests_enabled(&self) -> bool {
        self.quest_ledger.is_some()
    }

    /// Lists the identifiers of all known players.
    ///
    /// One statistics file per player; online status does not matter. A
    /// missing statistics directory means no players yet.
    pub fn players(&self) -> Vec<String> {
        let entries = match self.fs.read_dir(&self.stats_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = %self.stats_dir.display(), error = %e, "statistics directory not readable");
                return Vec::new();
            }
        };

        let mut players: Vec<String> = entries
            .iter()
            .filter(|path| !self.fs.is_dir(path))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .collect();
        players.sort();
        players
    }

    /// Reads all sources for one player into a single attribute bag.
    pub fn read(&self, id: &str) -> Result<RawAttributeBag, CollectError> {
        let stats_path = self.stats_dir.join(format!("{id}.json"));
        let stats = parser::parse_stats(&self.read_string(&stats_path)?)
            .map_err(|e| CollectError::Parse(stats_path, e))?;

        let record_path = self.playerdata_dir.join(format!("{id}.dat"));
        let bytes = self
            .fs
            .read(&record_path)
            .map_err(|e| CollectError::Io(record_path.clone(), e))?;
        let record = parser::parse_player_record(&bytes)
            .map_err(|e| CollectError::Parse(record_path, e))?;

        let advancements_path = self.advancements_dir.join(format!("{id}.json"));
        let advancements = parser::count_advancements(&self.read_string(&advancements_path)?)
            .map_err(|e| CollectError::Parse(advancements_path, e))?;

        let quests_finished = match &self.quest_ledger {
            Some(path) => Some(
                parser::count_quests(&self.read_string(path)?, id)
                    .map_err(|e| CollectError::Parse(path.clone(), e))?,
            ),
            None => None,
        };

        Ok(RawAttributeBag {
            stats,
            scalars: PlayerScalars {
                xp_total: f64::from(record.xp_total),
                xp_level: f64::from(record.xp_level),
                score: f64::from(record.score),
                health: f64::from(record.health),
                food_level: f64::from(record.food_level),
                advancements,
                quests_finished,
            },
        })
    }

    fn read_string(&self, path: &Path) -> Result<String, CollectError> {
        self.fs
            .read_to_string(path)
            .map_err(|e| CollectError::Io(path.to_path_buf(), e))
    }
}
