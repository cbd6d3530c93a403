//! Translation of a player's raw attributes into canonical metrics.
//!
//! Both statistics schema eras map onto the same metric names, so a server
//! upgrade does not break dashboards.

use std::collections::BTreeMap;

use crate::model::{MetricTuple, NestedStats, PlayerScalars, RawAttributeBag, StatSchema};

/// How the trailing segments of a legacy key become a label.
#[derive(Debug, Clone, Copy)]
enum LegacyLabel {
    /// No label besides `player`.
    PlayerOnly,
    /// Fixed label value.
    Fixed(&'static str, &'static str),
    /// `seg2.seg3`, recovering a namespaced id such as `minecraft.stone`.
    Namespaced(&'static str),
    /// `seg2.seg3` when the key has four segments, `seg2` otherwise.
    NamespacedOrBare(&'static str),
    /// `seg2` only.
    Bare(&'static str),
}

/// Legacy `stat.<category>` → metric table.
///
/// `damageTaken` goes to `damage_taken`; some older exporter releases filed it
/// under the `damage_dealt` family.
const LEGACY_TABLE: &[(&str, &str, LegacyLabel)] = &[
    ("mineBlock", "blocks_mined", LegacyLabel::Namespaced("block")),
    ("pickup", "blocks_picked_up", LegacyLabel::Namespaced("block")),
    ("craftItem", "blocks_crafted", LegacyLabel::Namespaced("block")),
    ("entityKilledBy", "player_deaths", LegacyLabel::NamespacedOrBare("cause")),
    ("killEntity", "entities_killed", LegacyLabel::Bare("entity")),
    ("jump", "player_jumps", LegacyLabel::PlayerOnly),
    ("walkOneCm", "cm_traveled", LegacyLabel::Fixed("method", "walking")),
    ("swimOneCm", "cm_traveled", LegacyLabel::Fixed("method", "swimming")),
    ("sprintOneCm", "cm_traveled", LegacyLabel::Fixed("method", "sprinting")),
    ("diveOneCm", "cm_traveled", LegacyLabel::Fixed("method", "diving")),
    ("fallOneCm", "cm_traveled", LegacyLabel::Fixed("method", "falling")),
    ("flyOneCm", "cm_traveled", LegacyLabel::Fixed("method", "flying")),
    ("boatOneCm", "cm_traveled", LegacyLabel::Fixed("method", "boat")),
    ("horseOneCm", "cm_traveled", LegacyLabel::Fixed("method", "horse")),
    ("climbOneCm", "cm_traveled", LegacyLabel::Fixed("method", "climbing")),
    ("damageDealt", "damage_dealt", LegacyLabel::PlayerOnly),
    ("damageTaken", "damage_taken", LegacyLabel::PlayerOnly),
    ("playOneMinute", "player_playtime", LegacyLabel::PlayerOnly),
    ("sleepInBed", "player_slept", LegacyLabel::PlayerOnly),
    ("craftingTableInteraction", "player_used_crafting_table", LegacyLabel::PlayerOnly),
];

/// Nested `minecraft:<category>` → (metric, label key) for the id-keyed categories.
const NESTED_CATEGORIES: &[(&str, &str, &str)] = &[
    ("minecraft:crafted", "blocks_crafted", "block"),
    ("minecraft:mined", "blocks_mined", "block"),
    ("minecraft:picked_up", "blocks_picked_up", "block"),
    ("minecraft:killed", "entities_killed", "entity"),
    ("minecraft:killed_by", "player_deaths", "cause"),
];

const NESTED_CUSTOM: &str = "minecraft:custom";

/// Known `minecraft:custom` keys → (metric, optional fixed label).
const CUSTOM_TABLE: &[(&str, &str, Option<(&str, &str)>)] = &[
    ("minecraft:jump", "player_jumps", None),
    ("minecraft:deaths", "player_deaths", None),
    ("minecraft:damage_taken", "damage_taken", None),
    ("minecraft:damage_dealt", "damage_dealt", None),
    ("minecraft:play_time", "player_playtime", None),
    // name used before 1.17
    ("minecraft:play_one_minute", "player_playtime", None),
    ("minecraft:walk_one_cm", "cm_traveled", Some(("method", "walking"))),
    ("minecraft:walk_on_water_one_cm", "cm_traveled", Some(("method", "swimming"))),
    ("minecraft:sprint_one_cm", "cm_traveled", Some(("method", "sprinting"))),
    ("minecraft:walk_under_water_one_cm", "cm_traveled", Some(("method", "diving"))),
    ("minecraft:fall_one_cm", "cm_traveled", Some(("method", "falling"))),
    ("minecraft:fly_one_cm", "cm_traveled", Some(("method", "flying"))),
    ("minecraft:boat_one_cm", "cm_traveled", Some(("method", "boat"))),
    ("minecraft:horse_one_cm", "cm_traveled", Some(("method", "horse"))),
    ("minecraft:climb_one_cm", "cm_traveled", Some(("method", "climbing"))),
    ("minecraft:sleep_in_bed", "player_slept", None),
    ("minecraft:interact_with_crafting_table", "player_used_crafting_table", None),
];

/// Maps one player's attributes into metric samples, all labeled with `player`.
pub fn map(player: &str, bag: &RawAttributeBag) -> Vec<MetricTuple> {
    let mut out = match &bag.stats {
        StatSchema::Legacy(flat) => map_legacy(player, flat),
        StatSchema::Nested(nested) => map_nested(player, nested),
    };
    out.extend(map_scalars(player, &bag.scalars));
    out
}

fn map_legacy(player: &str, flat: &BTreeMap<String, f64>) -> Vec<MetricTuple> {
    let mut out = Vec::new();
    for (key, &value) in flat {
        let segments: Vec<&str> = key.split('.').collect();
        let Some(category) = segments.get(1) else {
            continue;
        };
        let Some(&(_, metric, label)) = LEGACY_TABLE.iter().find(|(c, _, _)| c == category)
        else {
            continue;
        };

        let sample = MetricTuple::new(metric, value).label("player", player);
        let sample = match label {
            LegacyLabel::PlayerOnly => sample,
            LegacyLabel::Fixed(k, v) => sample.label(k, v),
            LegacyLabel::Namespaced(k) => sample.label(k, join_trailing(&segments, 2)),
            LegacyLabel::NamespacedOrBare(k) if segments.len() == 4 => {
                sample.label(k, join_trailing(&segments, 2))
            }
            LegacyLabel::NamespacedOrBare(k) | LegacyLabel::Bare(k) => {
                sample.label(k, segments.get(2).copied().unwrap_or_default())
            }
        };
        out.push(sample);
    }
    out
}

/// Joins up to two segments starting at `from` with a dot.
fn join_trailing(segments: &[&str], from: usize) -> String {
    segments
        .iter()
        .skip(from)
        .take(2)
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}

fn map_nested(player: &str, nested: &NestedStats) -> Vec<MetricTuple> {
    let mut out = Vec::new();

    for &(category, metric, label) in NESTED_CATEGORIES {
        let Some(entries) = nested.category(category) else {
            continue;
        };
        for (id, &value) in entries {
            out.push(
                MetricTuple::new(metric, value)
                    .label("player", player)
                    .label(label, id.as_str()),
            );
        }
    }

    if let Some(custom) = nested.category(NESTED_CUSTOM) {
        for (key, &value) in custom {
            let sample = match CUSTOM_TABLE.iter().find(|(k, _, _)| *k == key.as_str()) {
                Some(&(_, metric, Some((lk, lv)))) => MetricTuple::new(metric, value).label(lk, lv),
                Some(&(_, metric, None)) => MetricTuple::new(metric, value),
                None => MetricTuple::new("mc_custom", value).label("stat", key.as_str()),
            };
            out.push(sample.label("player", player));
        }
    }

    out
}

fn map_scalars(player: &str, scalars: &PlayerScalars) -> Vec<MetricTuple> {
    let mut out = vec![
        MetricTuple::new("player_xp_total", scalars.xp_total),
        MetricTuple::new("player_current_level", scalars.xp_level),
        MetricTuple::new("player_food_level", scalars.food_level),
        MetricTuple::new("player_health", scalars.health),
        MetricTuple::new("player_score", scalars.score),
        MetricTuple::new("player_advancements", scalars.advancements as f64),
    ];
    if let Some(quests) = scalars.quests_finished {
        out.push(MetricTuple::new("player_quests_finished", quests as f64));
    }
    out.into_iter().map(|m| m.label("player", player)).collect()
}
