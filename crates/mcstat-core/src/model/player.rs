//! Per-player raw state, before it is mapped into metrics.

use std::collections::BTreeMap;

/// A known player: stable identifier plus the display name once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerIdentity {
    /// UUID-shaped identifier, as found in the statistics file name.
    pub id: String,
    /// Display name. Never used as a lookup key.
    pub name: Option<String>,
}

impl PlayerIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// Statistics file content, tagged by the schema era it was written in.
///
/// The schema is sniffed once while parsing and never re-examined.
#[derive(Debug, Clone, PartialEq)]
pub enum StatSchema {
    /// Flat `stat.<category>.<rest>` keys (before 1.13).
    Legacy(BTreeMap<String, f64>),
    /// `{"stats": {"minecraft:<category>": {...}}}` (1.13 and later).
    Nested(NestedStats),
}

/// Category → (namespaced id → count), from the nested schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedStats {
    pub categories: BTreeMap<String, BTreeMap<String, f64>>,
}

impl NestedStats {
    /// Returns the entries of a category, if the file has it.
    pub fn category(&self, name: &str) -> Option<&BTreeMap<String, f64>> {
        self.categories.get(name)
    }
}

/// Scalar fields merged in from the player record and the ledgers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerScalars {
    pub xp_total: f64,
    pub xp_level: f64,
    pub score: f64,
    pub health: f64,
    pub food_level: f64,
    /// Completed advancements.
    pub advancements: u64,
    /// Finished quests; `None` when no quest subsystem is installed.
    pub quests_finished: Option<u64>,
}

/// Everything known about one player for one collection cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAttributeBag {
    pub stats: StatSchema,
    pub scalars: PlayerScalars,
}
