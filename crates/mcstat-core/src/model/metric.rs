//! Canonical metric samples produced by a collection cycle.

use std::collections::BTreeMap;

/// One named, labeled observation.
///
/// Names are fixed at compile time; every sample the exporter can emit is
/// listed in [`METRICS`]. Label keys are stable per name, values vary per
/// observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTuple {
    pub name: &'static str,
    pub value: f64,
    pub labels: BTreeMap<String, String>,
}

impl MetricTuple {
    /// Creates an unlabeled sample.
    pub fn new(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value,
            labels: BTreeMap::new(),
        }
    }

    /// Adds a label, returning the sample for chaining.
    pub fn label(mut self, key: &str, value: impl Into<String>) -> Self {
        self.labels.insert(key.to_string(), value.into());
        self
    }

    /// Returns the value of a label, if present.
    pub fn label_value(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Help text for every metric name the exporter emits.
///
/// The names and label sets match what existing scrape configurations expect,
/// so they must not be renamed.
pub const METRICS: &[(&str, &str)] = &[
    // per player
    ("blocks_mined", "Blocks a Player mined"),
    ("blocks_picked_up", "Blocks a Player picked up"),
    ("blocks_crafted", "Items a Player crafted"),
    ("player_deaths", "How often a Player died"),
    ("player_jumps", "How often a Player has jumped"),
    ("cm_traveled", "How many cm a Player traveled"),
    ("player_xp_total", "How much total XP a player has"),
    ("player_current_level", "How much current XP a player has"),
    ("player_food_level", "How much food the player currently has"),
    ("player_health", "How much Health the player currently has"),
    ("player_score", "The Score of the player"),
    ("entities_killed", "Entities killed by player"),
    ("damage_taken", "Damage Taken by Player"),
    ("damage_dealt", "Damage dealt by Player"),
    ("player_playtime", "Time in Minutes a Player was online"),
    ("player_advancements", "Number of completed advances of a player"),
    ("player_slept", "Times a Player slept in a bed"),
    ("player_quests_finished", "Number of quests a Player has finished"),
    ("player_used_crafting_table", "Times a Player used a Crafting Table"),
    ("mc_custom", "Custom Minecraft stat"),
    // server wide
    ("paper_tps_1m", "1 Minute TPS"),
    ("paper_tps_5m", "5 Minute TPS"),
    ("paper_tps_15m", "15 Minute TPS"),
    ("dim_tps", "TPS of a dimension"),
    ("dim_ticktime", "Time a Tick took in a Dimension"),
    ("overall_tps", "overall TPS"),
    ("overall_ticktime", "overall Ticktime"),
    ("entities", "type and count of active entites"),
    (
        "dynmap_tile_render_statistics",
        "Tile Render Statistics reported by Dynmap",
    ),
    (
        "dynmap_chunk_loading_statistics",
        "Chunk Loading Statistics reported by Dynmap",
    ),
    (
        "dynmap_chunk_loading_duration",
        "Chunk Loading Duration reported by Dynmap",
    ),
    ("player_online", "is 1 if player is online"),
];

/// Looks up the help text for a metric name.
pub fn help_for(name: &str) -> &'static str {
    METRICS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, help)| *help)
        .unwrap_or("")
}
