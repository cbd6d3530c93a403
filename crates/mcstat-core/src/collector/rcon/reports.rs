//! Server-wide text reports and their parsers.
//!
//! Each report is one RCON command plus a pure parser from the response text
//! to metric tuples. Parsers never fail: text that does not match yields no
//! tuples.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::MetricTuple;

/// Server flavors whose optional reports are enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportToggles {
    /// Paper-style `tps` command.
    pub paper: bool,
    /// Forge `forge tps` and `forge entity list`.
    pub forge: bool,
    /// Dynmap plugin `dynmap stats`.
    pub dynmap: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    TickRate,
    DimensionTicks,
    EntityCensus,
    MapRender,
    OnlinePlayers,
}

impl ReportKind {
    /// Returns whether this report runs under the given toggles.
    pub fn enabled(self, toggles: &ReportToggles) -> bool {
        match self {
            ReportKind::TickRate => toggles.paper,
            ReportKind::DimensionTicks | ReportKind::EntityCensus => toggles.forge,
            ReportKind::MapRender => toggles.dynmap,
            ReportKind::OnlinePlayers => true,
        }
    }
}

/// One report: command to send and parser for the response.
#[derive(Debug, Clone, Copy)]
pub struct ReportSpec {
    pub kind: ReportKind,
    pub command: &'static str,
    pub parse: fn(&str) -> Vec<MetricTuple>,
}

/// All reports, in collection order.
pub const REPORTS: &[ReportSpec] = &[
    ReportSpec {
        kind: ReportKind::TickRate,
        command: "tps",
        parse: parse_tick_rate,
    },
    ReportSpec {
        kind: ReportKind::DimensionTicks,
        command: "forge tps",
        parse: parse_dimension_ticks,
    },
    ReportSpec {
        kind: ReportKind::EntityCensus,
        command: "forge entity list",
        parse: parse_entity_census,
    },
    ReportSpec {
        kind: ReportKind::MapRender,
        command: "dynmap stats",
        parse: parse_map_render,
    },
    ReportSpec {
        kind: ReportKind::OnlinePlayers,
        command: "list",
        parse: parse_online_players,
    },
];

static FORMATTING_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"§.").expect("invalid regex"));

static TICK_RATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"TPS from last 1m, 5m, 15m:\s*\*?(\d+(?:\.\d+)?),\s*\*?(\d+(?:\.\d+)?),\s*\*?(\d+(?:\.\d+)?)",
    )
    .expect("invalid regex")
});

static DIMENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Dim\s+([\w:.\-]+)\s*\((.*?)\)\s*:\s*Mean tick time:\s*(\d+(?:\.\d+)?)\s*ms\.\s*Mean TPS:\s*(\d+(?:\.\d+)?)",
    )
    .expect("invalid regex")
});

static OVERALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Overall\s*:\s*Mean tick time:\s*(\d+(?:\.\d+)?)\s*ms\.\s*Mean TPS:\s*(\d+(?:\.\d+)?)",
    )
    .expect("invalid regex")
});

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+):\s+([^\s:]+:\S+)").expect("invalid regex"));

static TILE_RENDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*([^:\n]+?): processed=(\d+), rendered=(\d+), updated=(\d+)")
        .expect("invalid regex")
});

static CHUNK_LOADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Chunks processed: ([^:\n]+?): count=(\d+), (\d+(?:\.\d+)?)")
        .expect("invalid regex")
});

static ONLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"players online:(.*)").expect("invalid regex"));

fn number(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

/// Parses the Paper `tps` report.
pub fn parse_tick_rate(text: &str) -> Vec<MetricTuple> {
    let clean = FORMATTING_CODE.replace_all(text, "");
    let mut out = Vec::new();
    for caps in TICK_RATE.captures_iter(&clean) {
        let windows = [("paper_tps_1m", "1m"), ("paper_tps_5m", "5m"), ("paper_tps_15m", "15m")];
        for (i, (name, window)) in windows.into_iter().enumerate() {
            if let Some(value) = number(&caps[i + 1]) {
                out.push(MetricTuple::new(name, value).label("tps", window));
            }
        }
    }
    out
}

/// Parses the Forge `forge tps` report: one pair per dimension plus the
/// unlabeled overall pair.
pub fn parse_dimension_ticks(text: &str) -> Vec<MetricTuple> {
    let mut out = Vec::new();
    for caps in DIMENSION.captures_iter(text) {
        let (id, name) = (&caps[1], &caps[2]);
        if let Some(tick_time) = number(&caps[3]) {
            out.push(
                MetricTuple::new("dim_ticktime", tick_time)
                    .label("dimension_id", id)
                    .label("dimension_name", name),
            );
        }
        if let Some(tps) = number(&caps[4]) {
            out.push(
                MetricTuple::new("dim_tps", tps)
                    .label("dimension_id", id)
                    .label("dimension_name", name),
            );
        }
    }
    if let Some(caps) = OVERALL.captures(text) {
        if let Some(tick_time) = number(&caps[1]) {
            out.push(MetricTuple::new("overall_ticktime", tick_time));
        }
        if let Some(tps) = number(&caps[2]) {
            out.push(MetricTuple::new("overall_tps", tps));
        }
    }
    out
}

/// Parses the Forge `forge entity list` census.
pub fn parse_entity_census(text: &str) -> Vec<MetricTuple> {
    ENTITY
        .captures_iter(text)
        .filter_map(|caps| {
            let count = number(&caps[1])?;
            Some(MetricTuple::new("entities", count).label("entity", &caps[2]))
        })
        .collect()
}

/// Parses `dynmap stats`: tile render counters per map file and chunk
/// loading counters per chunk state.
pub fn parse_map_render(text: &str) -> Vec<MetricTuple> {
    let mut out = Vec::new();
    for caps in TILE_RENDER.captures_iter(text) {
        let file = caps[1].trim();
        for (kind, idx) in [("processed", 2usize), ("rendered", 3), ("updated", 4)] {
            if let Some(value) = number(&caps[idx]) {
                out.push(
                    MetricTuple::new("dynmap_tile_render_statistics", value)
                        .label("type", kind)
                        .label("file", file),
                );
            }
        }
    }
    for caps in CHUNK_LOADING.captures_iter(text) {
        let state = caps[1].trim();
        if let Some(count) = number(&caps[2]) {
            out.push(MetricTuple::new("dynmap_chunk_loading_statistics", count).label("type", state));
        }
        if let Some(duration) = number(&caps[3]) {
            out.push(MetricTuple::new("dynmap_chunk_loading_duration", duration).label("type", state));
        }
    }
    out
}

/// Parses `list`: one tuple with value 1 per online player.
pub fn parse_online_players(text: &str) -> Vec<MetricTuple> {
    let Some(caps) = ONLINE.captures(text) else {
        return Vec::new();
    };
    caps[1]
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| MetricTuple::new("player_online", 1.0).label("player", name))
        .collect()
}
