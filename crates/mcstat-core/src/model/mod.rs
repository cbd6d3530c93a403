//! Data model shared by the collectors and the exposition layer.

mod metric;
mod player;

pub use metric::{METRICS, MetricTuple, help_for};
pub use player::{NestedStats, PlayerIdentity, PlayerScalars, RawAttributeBag, StatSchema};

/// Output of one collection cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Unix timestamp (seconds) at the start of the cycle.
    pub timestamp: i64,
    pub samples: Vec<MetricTuple>,
}

impl Snapshot {
    /// Returns samples with the given metric name.
    pub fn samples_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricTuple> {
        self.samples.iter().filter(move |s| s.name == name)
    }
}
