//! Prometheus text exposition of a snapshot.
//!
//! Samples are grouped into one family per metric name, in order of first
//! appearance, and encoded with the `prometheus` text encoder. Every family is
//! typed as a counter.

use prometheus::proto::{Counter, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::TextEncoder;

use crate::model::{Snapshot, help_for};

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Groups samples into metric families.
pub fn families(snapshot: &Snapshot) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();

    for sample in &snapshot.samples {
        let idx = match families.iter().position(|f| f.get_name() == sample.name) {
            Some(idx) => idx,
            None => {
                let mut family = MetricFamily::default();
                family.set_name(sample.name.to_string());
                family.set_help(help_for(sample.name).to_string());
                family.set_field_type(MetricType::COUNTER);
                families.push(family);
                families.len() - 1
            }
        };

        let mut metric = Metric::default();
        for (key, value) in &sample.labels {
            let mut pair = LabelPair::default();
            pair.set_name(key.clone());
            pair.set_value(value.clone());
            metric.mut_label().push(pair);
        }
        let mut counter = Counter::default();
        counter.set_value(sample.value);
        metric.set_counter(counter);

        families[idx].mut_metric().push(metric);
    }

    families
}

/// Renders a snapshot in the Prometheus text format.
pub fn render(snapshot: &Snapshot) -> Result<String, prometheus::Error> {
    let mut buffer = String::new();
    TextEncoder::new().encode_utf8(&families(snapshot), &mut buffer)?;
    Ok(buffer)
}
