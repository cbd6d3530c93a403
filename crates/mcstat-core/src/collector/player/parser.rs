//! Parsers for the per-player files of a world directory.
//!
//! These are pure functions over file contents so they can be tested with
//! string and byte fixtures.

use std::collections::BTreeMap;
use std::io::Read;

use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;

use crate::model::{NestedStats, StatSchema};

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<serde_json::Error> for ParseError {
    fn from(e: serde_json::Error) -> Self {
        ParseError::new(format!("invalid JSON: {}", e))
    }
}

/// Key of the version marker present in every modern JSON file.
const DATA_VERSION: &str = "DataVersion";

// ============ Statistics file ============

/// Parses a statistics file, detecting its schema.
///
/// A top-level `"stats"` object selects the nested schema; anything else is
/// read as the flat legacy schema. Legacy entries whose value is not a number
/// (old achievement progress objects) are dropped.
pub fn parse_stats(content: &str) -> Result<StatSchema, ParseError> {
    let root: Value = serde_json::from_str(content)?;
    let Value::Object(root) = root else {
        return Err(ParseError::new("statistics file is not a JSON object"));
    };

    if let Some(stats) = root.get("stats") {
        let Value::Object(stats) = stats else {
            return Err(ParseError::new("\"stats\" is not a JSON object"));
        };
        let mut nested = NestedStats::default();
        for (category, entries) in stats {
            let Value::Object(entries) = entries else {
                continue;
            };
            let counts: BTreeMap<String, f64> = entries
                .iter()
                .filter_map(|(key, value)| value.as_f64().map(|v| (key.clone(), v)))
                .collect();
            nested.categories.insert(category.clone(), counts);
        }
        return Ok(StatSchema::Nested(nested));
    }

    let flat = root
        .iter()
        .filter(|(key, _)| key.as_str() != DATA_VERSION)
        .filter_map(|(key, value)| value.as_f64().map(|v| (key.clone(), v)))
        .collect();
    Ok(StatSchema::Legacy(flat))
}

// ============ Player record ============

/// Scalar fields decoded from `playerdata/<id>.dat`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerRecord {
    #[serde(rename = "XpTotal")]
    pub xp_total: i32,
    #[serde(rename = "XpLevel")]
    pub xp_level: i32,
    #[serde(rename = "Score")]
    pub score: i32,
    #[serde(rename = "Health")]
    pub health: f32,
    #[serde(rename = "foodLevel")]
    pub food_level: i32,
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decodes a player record.
///
/// The server writes gzip-compressed NBT; uncompressed NBT is accepted too.
pub fn parse_player_record(bytes: &[u8]) -> Result<PlayerRecord, ParseError> {
    let raw = if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .map_err(|e| ParseError::new(format!("invalid gzip stream: {}", e)))?;
        decoded
    } else {
        bytes.to_vec()
    };

    fastnbt::from_bytes(&raw).map_err(|e| ParseError::new(format!("invalid NBT: {}", e)))
}

// ============ Advancement ledger ============

/// Counts completed advancements in `advancements/<id>.json`.
///
/// Entries are objects with a boolean `done`; the version marker and any
/// malformed entry are not counted.
pub fn count_advancements(content: &str) -> Result<u64, ParseError> {
    let root: Value = serde_json::from_str(content)?;
    let Value::Object(root) = root else {
        return Err(ParseError::new("advancement ledger is not a JSON object"));
    };

    let done = root
        .iter()
        .filter(|(key, _)| key.as_str() != DATA_VERSION)
        .filter(|(_, value)| value.get("done").and_then(Value::as_bool) == Some(true))
        .count();
    Ok(done as u64)
}

// ============ Quest ledger ============

/// Counts the quests `player_id` has finished in BetterQuesting's
/// `QuestProgress.json`.
///
/// Only the first task (`0:10`) of each quest is consulted, which is how the
/// mod records a completed single-task quest.
pub fn count_quests(content: &str, player_id: &str) -> Result<u64, ParseError> {
    let root: Value = serde_json::from_str(content)?;
    let progress = root
        .get("questProgress:9")
        .and_then(Value::as_object)
        .ok_or_else(|| ParseError::new("missing questProgress:9"))?;

    let mut finished = 0;
    for quest in progress.values() {
        let Some(users) = quest
            .pointer("/tasks:9/0:10/completeUsers:9")
            .and_then(Value::as_object)
        else {
            continue;
        };
        finished += users
            .values()
            .filter(|user| user.as_str() == Some(player_id))
            .count() as u64;
    }
    Ok(finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use serde::Serialize;
    use std::io::Write;

    #[derive(Serialize)]
    struct RecordFixture {
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
        #[serde(rename = "Dimension")]
        dimension: String,
    }

    fn fixture() -> RecordFixture {
        RecordFixture {
            xp_total: 1234,
            xp_level: 30,
            score: 77,
            health: 19.5,
            food_level: 18,
            dimension: "minecraft:overworld".to_string(),
        }
    }

    #[test]
    fn test_parse_stats_nested() {
        let content = r#"{
            "stats": {
                "minecraft:custom": {"minecraft:jump": 5, "minecraft:deaths": 2},
                "minecraft:mined": {"minecraft:stone": 64}
            },
            "DataVersion": 2586
        }"#;
        let StatSchema::Nested(nested) = parse_stats(content).unwrap() else {
            panic!("expected nested schema");
        };
        let custom = nested.category("minecraft:custom").unwrap();
        assert_eq!(custom.get("minecraft:jump"), Some(&5.0));
        assert_eq!(custom.get("minecraft:deaths"), Some(&2.0));
        assert_eq!(
            nested.category("minecraft:mined").unwrap().get("minecraft:stone"),
            Some(&64.0)
        );
        assert!(nested.category("minecraft:crafted").is_none());
    }

    #[test]
    fn test_parse_stats_legacy_drops_non_numeric() {
        let content = r#"{
            "stat.jump": 12,
            "stat.mineBlock.minecraft.dirt": 3,
            "achievement.exploreAllBiomes": {"value": 0, "progress": ["Beach"]},
            "DataVersion": 1343
        }"#;
        let StatSchema::Legacy(flat) = parse_stats(content).unwrap() else {
            panic!("expected legacy schema");
        };
        assert_eq!(flat.len(), 2);
        assert_eq!(flat.get("stat.jump"), Some(&12.0));
        assert_eq!(flat.get("stat.mineBlock.minecraft.dirt"), Some(&3.0));
    }

    #[test]
    fn test_parse_stats_rejects_garbage() {
        assert!(parse_stats("not json").is_err());
        assert!(parse_stats("[1, 2]").is_err());
        assert!(parse_stats(r#"{"stats": 3}"#).is_err());
    }

    #[test]
    fn test_parse_player_record_gzip() {
        let nbt = fastnbt::to_bytes(&fixture()).unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&nbt).unwrap();
        let compressed = encoder.finish().unwrap();

        let record = parse_player_record(&compressed).unwrap();
        assert_eq!(record.xp_total, 1234);
        assert_eq!(record.xp_level, 30);
        assert_eq!(record.score, 77);
        assert_eq!(record.health, 19.5);
        assert_eq!(record.food_level, 18);
    }

    #[test]
    fn test_parse_player_record_uncompressed() {
        let nbt = fastnbt::to_bytes(&fixture()).unwrap();
        let record = parse_player_record(&nbt).unwrap();
        assert_eq!(record.xp_level, 30);
    }

    #[test]
    fn test_parse_player_record_truncated() {
        let nbt = fastnbt::to_bytes(&fixture()).unwrap();
        assert!(parse_player_record(&nbt[..nbt.len() / 2]).is_err());
        assert!(parse_player_record(&[0x1f, 0x8b, 0x08]).is_err());
    }

    #[test]
    fn test_count_advancements() {
        let content = r#"{
            "minecraft:story/root": {"criteria": {}, "done": true},
            "minecraft:story/mine_stone": {"criteria": {}, "done": true},
            "minecraft:recipes/misc/bread": {"criteria": {}, "done": false},
            "minecraft:adventure/root": {"criteria": {}},
            "DataVersion": 2586
        }"#;
        assert_eq!(count_advancements(content).unwrap(), 2);
        assert_eq!(count_advancements(r#"{"DataVersion": 1}"#).unwrap(), 0);
        assert!(count_advancements("{").is_err());
    }

    #[test]
    fn test_count_quests() {
        let content = r#"{
            "questProgress:9": {
                "0:10": {"tasks:9": {"0:10": {"completeUsers:9": {
                    "0:8": "aaaa-1111", "1:8": "bbbb-2222"}}}},
                "1:10": {"tasks:9": {"0:10": {"completeUsers:9": {
                    "0:8": "aaaa-1111"}}}},
                "2:10": {"tasks:9": {}},
                "3:10": {"tasks:9": {"1:10": {"completeUsers:9": {
                    "0:8": "aaaa-1111"}}}}
            }
        }"#;
        assert_eq!(count_quests(content, "aaaa-1111").unwrap(), 2);
        assert_eq!(count_quests(content, "bbbb-2222").unwrap(), 1);
        assert_eq!(count_quests(content, "cccc-3333").unwrap(), 0);
        assert!(count_quests("{}", "aaaa-1111").is_err());
    }
}
