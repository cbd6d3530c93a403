//! Pre-built mock world directories for testing.
//!
//! These scenarios provide realistic world directory states for both
//! statistics schema eras.

use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;

use super::filesystem::MockFs;

/// NBT layout of the player record fields the collector reads.
#[derive(Debug, Clone, Serialize)]
struct PlayerRecordNbt {
    #[serde(rename = "XpTotal")]
    xp_total: i32,
    #[serde(rename = "XpLevel")]
    xp_level: i32,
    #[serde(rename = "Score")]
    score: i32,
    #[serde(rename = "Health")]
    health: f32,
    #[serde(rename = "foodLevel")]
    food_level: i32,
}

/// Builder for one player's files inside a mock world.
#[derive(Debug, Clone)]
pub struct PlayerFixture {
    id: String,
    stats: String,
    advancements: String,
    record: PlayerRecordNbt,
}

impl PlayerFixture {
    /// A player with empty nested statistics, no advancements and a full
    /// health/food bar at level 30.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stats: r#"{"stats": {}, "DataVersion": 2586}"#.to_string(),
            advancements: r#"{"DataVersion": 2586}"#.to_string(),
            record: PlayerRecordNbt {
                xp_total: 1395,
                xp_level: 30,
                score: 1395,
                health: 20.0,
                food_level: 20,
            },
        }
    }

    /// Sets the statistics file content.
    pub fn stats(mut self, content: impl Into<String>) -> Self {
        self.stats = content.into();
        self
    }

    /// Sets the advancement ledger content.
    pub fn advancements(mut self, content: impl Into<String>) -> Self {
        self.advancements = content.into();
        self
    }

    /// Sets health and food level in the player record.
    pub fn vitals(mut self, health: f32, food_level: i32) -> Self {
        self.record.health = health;
        self.record.food_level = food_level;
        self
    }

    /// Writes the player's files below `world`.
    pub fn install(&self, fs: &mut MockFs, world: impl AsRef<Path>) {
        let world = world.as_ref();
        fs.add_file(world.join(format!("stats/{}.json", self.id)), self.stats.clone());
        fs.add_file(
            world.join(format!("advancements/{}.json", self.id)),
            self.advancements.clone(),
        );
        fs.add_file(
            world.join(format!("playerdata/{}.dat", self.id)),
            encode_record(&self.record),
        );
    }
}

/// Encodes a player record the way the server writes it: gzip-compressed NBT.
fn encode_record(record: &PlayerRecordNbt) -> Vec<u8> {
    let nbt = fastnbt::to_bytes(record).unwrap_or_default();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    if encoder.write_all(&nbt).is_err() {
        return Vec::new();
    }
    encoder.finish().unwrap_or_default()
}

impl MockFs {
    /// A 1.16 world with two players using the nested statistics schema.
    pub fn modern_world() -> Self {
        let mut fs = Self::new();

        PlayerFixture::new("069a79f4-44e9-4726-a5be-fca90e38aaf5")
            .stats(
                r#"{
    "stats": {
        "minecraft:mined": {"minecraft:stone": 412, "minecraft:diamond_ore": 7},
        "minecraft:crafted": {"minecraft:torch": 64},
        "minecraft:picked_up": {"minecraft:cobblestone": 398},
        "minecraft:killed": {"minecraft:zombie": 12},
        "minecraft:killed_by": {"minecraft:creeper": 1},
        "minecraft:custom": {
            "minecraft:jump": 1520,
            "minecraft:deaths": 1,
            "minecraft:play_time": 288000,
            "minecraft:walk_one_cm": 1250000,
            "minecraft:sleep_in_bed": 3,
            "minecraft:open_chest": 41
        }
    },
    "DataVersion": 2586
}"#,
            )
            .advancements(
                r#"{
    "minecraft:story/root": {"criteria": {"crafting_table": "2020-07-01 10:00:00 +0000"}, "done": true},
    "minecraft:story/mine_stone": {"criteria": {"stone": "2020-07-01 10:05:00 +0000"}, "done": true},
    "minecraft:story/smelt_iron": {"criteria": {}, "done": false},
    "DataVersion": 2586
}"#,
            )
            .install(&mut fs, "/world");

        PlayerFixture::new("853c80ef-3c37-49fd-aa49-938b674adae6")
            .stats(r#"{"stats": {"minecraft:custom": {"minecraft:jump": 5}}, "DataVersion": 2586}"#)
            .vitals(14.5, 17)
            .install(&mut fs, "/world");

        fs
    }

    /// A 1.12 world with one player using the flat legacy statistics schema.
    pub fn legacy_world() -> Self {
        let mut fs = Self::new();

        PlayerFixture::new("61699b2e-d327-4a01-9f1e-0ea8c3f06bc6")
            .stats(
                r#"{
    "stat.mineBlock.minecraft.stone": 230,
    "stat.craftItem.minecraft.torch": 32,
    "stat.entityKilledBy.minecraft.skeleton": 2,
    "stat.killEntity.Zombie": 9,
    "stat.jump": 811,
    "stat.walkOneCm": 540000,
    "stat.damageTaken": 310,
    "stat.damageDealt": 905,
    "stat.playOneMinute": 144000,
    "achievement.openInventory": 1,
    "achievement.exploreAllBiomes": {"value": 0, "progress": ["Beach"]}
}"#,
            )
            .advancements(r#"{"minecraft:story/root": {"done": true}, "DataVersion": 1343}"#)
            .install(&mut fs, "/world");

        fs
    }
}
