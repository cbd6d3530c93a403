//! Shared application state.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::{Arc, Mutex};

use axum::extract::State;

use mcstat_core::collector::{Collector, RealFs};

pub(crate) type ExporterCollector = Collector<RealFs>;

pub(crate) struct WebAppInner {
    pub(crate) collector: ExporterCollector,
    // Completed scrapes since startup.
    pub(crate) scrapes: u64,
}

impl WebAppInner {
    pub(crate) fn new(collector: ExporterCollector) -> Self {
        Self {
            collector,
            scrapes: 0,
        }
    }
}

pub(crate) type SharedState = Arc<Mutex<WebAppInner>>;

pub(crate) type AppState = State<SharedState>;
